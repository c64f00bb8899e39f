pub mod models;

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::error::Result;
use models::{File, Project};

/// Durable storage for project records and path-keyed file records.
///
/// Every call is a single-record operation; there is no cross-key transaction.
#[async_trait]
pub trait Store: Send + Sync {
    async fn put_project(&self, project: &Project) -> Result<()>;
    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn get_project(&self, id: &str) -> Result<Option<Project>>;
    /// Returns whether a record was removed.
    async fn delete_project(&self, id: &str) -> Result<bool>;

    /// Upsert keyed by `file.path`.
    async fn put_file(&self, file: &File) -> Result<()>;
    async fn get_file(&self, path: &str) -> Result<Option<File>>;
    async fn list_files_by_project(&self, project_id: &str) -> Result<Vec<File>>;
    async fn delete_file(&self, path: &str) -> Result<bool>;
    async fn delete_files_by_project(&self, project_id: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pub pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        let in_memory = url.contains(":memory:");

        // Ensure the data directory exists
        if !in_memory {
            if let Some(path) = url
                .strip_prefix("sqlite://")
                .or_else(|| url.strip_prefix("sqlite:"))
            {
                let path = path.split('?').next().unwrap_or(path);
                if let Some(parent) = std::path::Path::new(path).parent() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let options = if in_memory {
            // Each connection to :memory: is its own database.
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = options.connect(url).await?;
        let store = Self { pool };
        store.run_migrations().await?;

        tracing::info!(url, "Opened store");
        Ok(store)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Closed store");
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn put_project(&self, project: &Project) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&project.id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.created_at)
        .bind(project.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT id, name, description, created_at, updated_at FROM projects ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            "SELECT id, name, description, created_at, updated_at FROM projects WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }

    async fn delete_project(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn put_file(&self, file: &File) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO files (path, project_id, content, last_modified)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                project_id = excluded.project_id,
                content = excluded.content,
                last_modified = excluded.last_modified
            "#,
        )
        .bind(&file.path)
        .bind(&file.project_id)
        .bind(&file.content)
        .bind(file.last_modified)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_file(&self, path: &str) -> Result<Option<File>> {
        let file = sqlx::query_as::<_, File>(
            "SELECT path, project_id, content, last_modified FROM files WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    async fn list_files_by_project(&self, project_id: &str) -> Result<Vec<File>> {
        let files = sqlx::query_as::<_, File>(
            "SELECT path, project_id, content, last_modified FROM files WHERE project_id = ? ORDER BY rowid ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    async fn delete_file(&self, path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_files_by_project(&self, project_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM files WHERE project_id = ?")
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    async fn memory_store() -> SqliteStore {
        SqliteStore::open("sqlite::memory:", 1)
            .await
            .expect("in-memory store")
    }

    fn project(id: &str, name: &str) -> Project {
        Project {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            created_at: 1,
            updated_at: 1,
        }
    }

    #[tokio::test]
    async fn projects_list_in_insertion_order() {
        let store = memory_store().await;
        store.put_project(&project("b", "Second")).await.unwrap();
        store.put_project(&project("a", "First")).await.unwrap();

        // Upsert keeps the original position.
        let mut renamed = project("b", "Second, renamed");
        renamed.updated_at = 2;
        store.put_project(&renamed).await.unwrap();

        let ids: Vec<_> = store
            .list_projects()
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("b".to_string(), "Second, renamed".to_string()),
                ("a".to_string(), "First".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn files_are_indexed_by_project() {
        let store = memory_store().await;
        store.put_file(&File::new("p1", "index.html", "<p>1</p>")).await.unwrap();
        store.put_file(&File::new("p1", "css/site.css", "")).await.unwrap();
        store.put_file(&File::new("p2", "index.html", "<p>2</p>")).await.unwrap();

        let p1 = store.list_files_by_project("p1").await.unwrap();
        assert_eq!(p1.len(), 2);
        assert!(p1.iter().all(|f| f.project_id == "p1"));

        let removed = store.delete_files_by_project("p1").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.list_files_by_project("p1").await.unwrap().is_empty());
        assert!(store.get_file("p2/index.html").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn put_file_overwrites_by_path() {
        let store = memory_store().await;
        let mut file = File::new("p1", "app.js", "let a = 1;");
        store.put_file(&file).await.unwrap();
        file.content = "let a = 2;".to_string();
        store.put_file(&file).await.unwrap();

        let stored = store.get_file("p1/app.js").await.unwrap().unwrap();
        assert_eq!(stored.content, "let a = 2;");
        assert_eq!(store.list_files_by_project("p1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_reports_missing_records() {
        let store = memory_store().await;
        assert!(!store.delete_file("p1/missing.js").await.unwrap());
        assert!(!store.delete_project("missing").await.unwrap());
    }

    #[tokio::test]
    async fn closed_store_is_unavailable() {
        let store = memory_store().await;
        store.close().await;

        let err = store.list_projects().await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }
}
