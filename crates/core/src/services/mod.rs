pub mod archive;
pub mod files;
pub mod language;
pub mod preview;
pub mod projects;
pub mod templates;
pub mod tree;
