use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{
        models::{now_millis, Project},
        Store,
    },
    error::{Error, Result},
};

/// CRUD over project metadata.
#[derive(Clone)]
pub struct ProjectRegistry {
    store: Arc<dyn Store>,
}

impl ProjectRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, name: &str, description: &str) -> Result<Project> {
        let name = validate_project_name(name)?;
        let now = now_millis();

        let project = Project {
            id: Uuid::new_v4().to_string(),
            name,
            description: normalize_description(description),
            created_at: now,
            updated_at: now,
        };
        self.store.put_project(&project).await?;

        tracing::info!(project_id = %project.id, name = %project.name, "Created project");
        Ok(project)
    }

    pub async fn list(&self) -> Result<Vec<Project>> {
        self.store.list_projects().await
    }

    pub async fn get(&self, id: &str) -> Result<Project> {
        self.store
            .get_project(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Project {id}")))
    }

    /// Refreshes `updated_at`; called after every successful bulk file save.
    pub async fn touch(&self, id: &str) -> Result<Project> {
        let mut project = self.get(id).await?;
        project.updated_at = now_millis().max(project.updated_at);
        self.store.put_project(&project).await?;
        Ok(project)
    }

    pub async fn update_details(&self, id: &str, name: &str, description: &str) -> Result<Project> {
        let name = validate_project_name(name)?;
        let mut project = self.get(id).await?;

        project.name = name;
        project.description = normalize_description(description);
        project.updated_at = now_millis().max(project.updated_at);
        self.store.put_project(&project).await?;

        tracing::info!(project_id = %id, "Updated project details");
        Ok(project)
    }

    /// Deletes the project record, then every file it owns.
    ///
    /// A failed cascade is reported as an error but the project record stays
    /// deleted.
    pub async fn remove(&self, id: &str) -> Result<()> {
        if !self.store.delete_project(id).await? {
            return Err(Error::NotFound(format!("Project {id}")));
        }

        match self.store.delete_files_by_project(id).await {
            Ok(count) => {
                tracing::info!(project_id = %id, files = count, "Deleted project");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(project_id = %id, error = %e, "Project deleted but its files were not");
                Err(e)
            }
        }
    }
}

fn validate_project_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidName("Project name is required".to_string()));
    }
    Ok(name.to_string())
}

fn normalize_description(description: &str) -> Option<String> {
    let description = description.trim();
    (!description.is_empty()).then(|| description.to_string())
}
