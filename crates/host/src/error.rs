use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sitebench_core::{Error, ErrorKind};

#[derive(Debug)]
pub enum HostError {
    Core(Error),
    Internal(String),
}

impl From<Error> for HostError {
    fn from(e: Error) -> Self {
        HostError::Core(e)
    }
}

impl HostError {
    fn status(&self) -> StatusCode {
        match self {
            HostError::Core(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Duplicate => StatusCode::CONFLICT,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Constraint => StatusCode::CONFLICT,
                ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::PartialBatch => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::UnsupportedContent => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            },
            HostError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HostError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            HostError::Core(e) => e.to_string(),
            HostError::Internal(message) => {
                tracing::error!("Internal error: {message}");
                "Internal server error".to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
