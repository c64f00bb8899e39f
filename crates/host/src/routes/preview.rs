use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    routing::get,
    Router,
};

use crate::{
    error::{HostError, Result},
    AppState,
};

/// Strictest sandbox that still lets the document's own scripts run.
pub const SANDBOX_POLICY: &str = "sandbox allow-scripts";

pub fn router() -> Router<AppState> {
    Router::new().route("/:id", get(get_preview))
}

async fn get_preview(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response<Body>> {
    let document = state.workbench.preview_project(&id).await?;
    tracing::debug!(project_id = %id, "Serving preview");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format!("{}; charset=utf-8", document.mime))
        .header(header::CONTENT_SECURITY_POLICY, SANDBOX_POLICY)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(document.body))
        .map_err(|e| HostError::Internal(format!("Failed to build response: {e}")))
}
