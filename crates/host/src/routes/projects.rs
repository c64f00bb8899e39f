use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    routing::get,
    Json, Router,
};
use sitebench_core::{services::tree::FileTreeNode, Project};

use crate::{
    error::{HostError, Result},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects))
        .route("/:id", get(get_project))
        .route("/:id/tree", get(get_tree))
        .route("/:id/export", get(export_project))
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>> {
    Ok(Json(state.workbench.projects().list().await?))
}

async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    Ok(Json(state.workbench.projects().get(&id).await?))
}

async fn get_tree(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileTreeNode>> {
    Ok(Json(state.workbench.tree(&id).await?))
}

async fn export_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response<Body>> {
    let exported = state.workbench.export_project(&id).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", exported.file_name),
        )
        .body(Body::from(exported.bytes))
        .map_err(|e| HostError::Internal(format!("Failed to build response: {e}")))
}
