pub mod preview;
pub mod projects;
