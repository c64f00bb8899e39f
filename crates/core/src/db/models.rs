use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// `{project_id}/{relative_path}`, unique across the whole store.
    pub path: String,
    pub project_id: String,
    pub content: String,
    pub last_modified: Timestamp,
}

impl File {
    pub fn new(project_id: &str, relative_path: &str, content: impl Into<String>) -> Self {
        Self {
            path: compose_path(project_id, relative_path),
            project_id: project_id.to_string(),
            content: content.into(),
            last_modified: now_millis(),
        }
    }

    /// Path with the owning project's prefix removed.
    pub fn relative_path(&self) -> &str {
        self.path
            .strip_prefix(self.project_id.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.path)
    }

    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn is_marker(&self) -> bool {
        self.name() == MARKER_FILE_NAME
    }
}

/// Placeholder that keeps an otherwise empty folder visible.
pub const MARKER_FILE_NAME: &str = ".keep";

pub fn compose_path(project_id: &str, relative_path: &str) -> String {
    format!("{project_id}/{relative_path}")
}
