//! Storage, file tree and editing core for browser-style static site projects.

pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod session;
pub mod workbench;

pub use config::Config;
pub use db::{
    models::{File, Project},
    SqliteStore, Store,
};
pub use error::{Error, ErrorKind, Result};
pub use session::{EditorSession, EditorView, SessionEvent, SessionState};
pub use workbench::{ProjectSeed, Workbench};
