use thiserror::Error;

use crate::services::files::ImportFailure;

/// Coarse error families surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Duplicate,
    NotFound,
    Constraint,
    StoreUnavailable,
    PartialBatch,
    UnsupportedContent,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Already exists: {0}")]
    DuplicatePath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A project must keep at least one file: {0}")]
    LastFileProtected(String),

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{} of the imported entries failed", .0.len())]
    PartialImportFailure(Vec<ImportFailure>),

    #[error("No valid files found ({} skipped)", .0.len())]
    NoValidFiles(Vec<ImportFailure>),

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Your project needs at least one HTML file for preview")]
    NoEntryPoint,

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Session is not ready")]
    SessionNotReady,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidName(_) | Error::SessionNotReady => ErrorKind::Validation,
            Error::DuplicatePath(_) => ErrorKind::Duplicate,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::LastFileProtected(_) | Error::SaveInProgress => ErrorKind::Constraint,
            Error::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
            Error::PartialImportFailure(_) | Error::NoValidFiles(_) => ErrorKind::PartialBatch,
            Error::UnsupportedContent(_) | Error::InvalidArchive(_) | Error::NoEntryPoint => {
                ErrorKind::UnsupportedContent
            }
        }
    }

    /// Adds entries dropped before the import ran to an empty-import error.
    pub(crate) fn with_skipped(self, skipped: Vec<ImportFailure>) -> Self {
        match self {
            Error::NoValidFiles(mut failures) => {
                failures.extend(skipped);
                Error::NoValidFiles(failures)
            }
            other => other,
        }
    }

    /// Store failures leave state untouched, so the same call can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::SaveInProgress)
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::StoreUnavailable(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Error::StoreUnavailable(format!("Failed to initialize store: {e}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::StoreUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
