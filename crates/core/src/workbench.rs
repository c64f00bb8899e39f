use std::sync::Arc;

use crate::{
    config::Config,
    db::{models::Project, SqliteStore},
    error::{Error, Result},
    services::{
        archive::{self, Entry, ExportedArchive, FolderItem},
        files::{FileRepository, ImportFailure, ImportReport},
        preview::{self, RenderableDocument},
        projects::ProjectRegistry,
        templates,
        tree::{self, FileTreeNode},
    },
    session::EditorSession,
};

/// Initial contents of a new project.
#[derive(Debug)]
pub enum ProjectSeed {
    /// `index.html`, `styles.css` and `script.js`.
    Default,
    Template(String),
    Archive(Vec<u8>),
    Folder(Vec<FolderItem>),
}

/// Shared handles to the store and the services built on it.
#[derive(Clone)]
pub struct Workbench {
    store: Arc<SqliteStore>,
    projects: ProjectRegistry,
    files: FileRepository,
    config: Config,
}

impl Workbench {
    pub async fn open(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::open(&config.database_url, config.max_connections).await?);
        Ok(Self {
            projects: ProjectRegistry::new(store.clone()),
            files: FileRepository::new(store.clone()),
            store,
            config,
        })
    }

    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    pub fn files(&self) -> &FileRepository {
        &self.files
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a project and seeds its files. The project is removed again if
    /// seeding commits nothing.
    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
        seed: ProjectSeed,
    ) -> Result<(Project, ImportReport)> {
        let (entries, skipped) = seed_entries(name, seed)?;
        if entries.is_empty() {
            return Err(Error::NoValidFiles(skipped));
        }

        let project = self.projects.create(name, description).await?;
        match self.files.bulk_import(&project.id, entries).await {
            Ok(mut report) => {
                report.failures.extend(skipped);
                Ok((project, report))
            }
            Err(e) => {
                tracing::warn!(project_id = %project.id, error = %e, "Seeding failed, removing project");
                if let Err(undo) = self.projects.remove(&project.id).await {
                    tracing::warn!(project_id = %project.id, error = %undo, "Failed to remove unseeded project");
                }
                Err(e.with_skipped(skipped))
            }
        }
    }

    pub async fn delete_project(&self, id: &str) -> Result<()> {
        self.projects.remove(id).await
    }

    /// Exports the stored files of a project.
    pub async fn export_project(&self, id: &str) -> Result<ExportedArchive> {
        let project = self.projects.get(id).await?;
        let files = self.files.list_by_project(id).await?;
        archive::export_files(&project.name, &files)
    }

    /// Renders the stored files of a project, ignoring any unsaved session edits.
    pub async fn preview_project(&self, id: &str) -> Result<RenderableDocument> {
        self.projects.get(id).await?;
        let files = self.files.list_by_project(id).await?;
        preview::generate(&files)
    }

    pub async fn tree(&self, id: &str) -> Result<FileTreeNode> {
        self.projects.get(id).await?;
        let files = self.files.list_by_project(id).await?;
        Ok(tree::build_tree(&files))
    }

    /// A session for `id`; call [`EditorSession::load`] before use.
    pub fn session(&self, id: &str) -> EditorSession {
        EditorSession::new(id, self.projects.clone(), self.files.clone(), &self.config)
    }

    pub async fn open_session(&self, id: &str) -> Result<EditorSession> {
        let session = self.session(id);
        session.load().await?;
        Ok(session)
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}

fn seed_entries(project_name: &str, seed: ProjectSeed) -> Result<(Vec<Entry>, Vec<ImportFailure>)> {
    match seed {
        ProjectSeed::Default => Ok((templates::default_entries(project_name.trim()), Vec::new())),
        ProjectSeed::Template(id) => templates::find(&id)
            .map(|template| (template.entries(), Vec::new()))
            .ok_or_else(|| Error::NotFound(format!("Template {id}"))),
        ProjectSeed::Archive(bytes) => {
            let extracted = archive::archive_to_entries(&bytes)?;
            Ok((extracted.entries, extracted.skipped))
        }
        ProjectSeed::Folder(items) => {
            let extracted = archive::folder_file_list_to_entries(items);
            Ok((extracted.entries, extracted.skipped))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn workbench() -> Workbench {
        Workbench::open(Config::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn default_seed_creates_starter_files() {
        let bench = workbench().await;
        let (project, report) = bench
            .create_project("  Portfolio ", "", ProjectSeed::Default)
            .await
            .unwrap();

        assert_eq!(project.name, "Portfolio");
        assert!(report.is_complete());
        let names: Vec<_> = report.files.iter().map(|f| f.relative_path()).collect();
        assert_eq!(names, vec!["index.html", "styles.css", "script.js"]);
        assert!(report.files[0].content.contains("<title>Portfolio</title>"));
    }

    #[tokio::test]
    async fn unknown_template_creates_nothing() {
        let bench = workbench().await;
        let err = bench
            .create_project("X", "", ProjectSeed::Template("nope".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(bench.projects().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn archive_without_text_files_creates_nothing() {
        let bench = workbench().await;
        let bytes = archive::entries_to_archive(&[
            Entry::new("logo.png", vec![0x89, 0xff, 0xfe]),
            Entry::new("font.woff2", vec![0x77, 0xf0, 0x80]),
        ])
        .unwrap();

        let err = bench
            .create_project("X", "", ProjectSeed::Archive(bytes))
            .await
            .unwrap_err();

        match err {
            Error::NoValidFiles(skipped) => {
                let paths: Vec<_> = skipped.iter().map(|s| s.path.as_str()).collect();
                assert_eq!(paths, vec!["logo.png", "font.woff2"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(bench.projects().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn archive_seed_reports_skipped_entries() {
        let bench = workbench().await;
        let bytes = archive::entries_to_archive(&[
            Entry::text("index.html", "<p>hi</p>"),
            Entry::new("logo.png", vec![0x89, 0xff, 0xfe]),
        ])
        .unwrap();

        let (project, report) = bench
            .create_project("Site", "", ProjectSeed::Archive(bytes))
            .await
            .unwrap();

        assert_eq!(report.files.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(bench.preview_project(&project.id).await.unwrap().body, "<p>hi</p>");
    }

    #[tokio::test]
    async fn export_and_tree_read_stored_files() {
        let bench = workbench().await;
        let (project, _) = bench
            .create_project("Landing Page", "", ProjectSeed::Template("landing-page".into()))
            .await
            .unwrap();

        let exported = bench.export_project(&project.id).await.unwrap();
        assert_eq!(exported.file_name, "Landing-Page.zip");

        let tree = bench.tree(&project.id).await.unwrap();
        assert_eq!(tree.files().len(), 2);
        assert!(tree.children.iter().any(|node| node.name == "css" && node.is_folder()));
    }

    #[tokio::test]
    async fn delete_project_cascades() {
        let bench = workbench().await;
        let (project, _) = bench
            .create_project("Gone", "", ProjectSeed::Default)
            .await
            .unwrap();

        bench.delete_project(&project.id).await.unwrap();

        assert!(bench.files().list_by_project(&project.id).await.unwrap().is_empty());
        assert!(matches!(bench.tree(&project.id).await, Err(Error::NotFound(_))));
    }
}
