//! Editing state for one open project.
//!
//! The session owns the working set: an in-memory copy of the project's files
//! that edits mutate directly. Edits become durable only through [`EditorSession::save`].
//! Structural changes (create, delete, rename, import) go to the store right
//! away and are mirrored into the working set. Observers follow along through
//! [`EditorSession::subscribe`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    db::models::{File, Project, Timestamp},
    error::{Error, Result},
    services::{
        archive::{self, Entry, ExportedArchive, Extracted, FolderItem},
        files::{self, FileRepository, ImportReport},
        language::{self, Language},
        preview::{self, RenderableDocument, ROOT_DOCUMENT},
        projects::ProjectRegistry,
        tree::{self, FileTreeNode},
    },
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "camelCase")]
pub enum SessionState {
    Loading,
    Ready,
    /// The project does not exist. Terminal.
    NotFound,
    /// Loading failed; `load` may be called again.
    LoadError(String),
    Closed,
}

/// What the editor widget should display for the current file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EditorView {
    #[serde(rename_all = "camelCase")]
    Text {
        file_path: String,
        content: String,
        language: Language,
    },
    /// Binary assets never reach the text widget.
    #[serde(rename_all = "camelCase")]
    Binary { file_path: String },
}

impl EditorView {
    fn of(file: &File) -> Self {
        if language::is_binary(&file.path) {
            EditorView::Binary {
                file_path: file.path.clone(),
            }
        } else {
            EditorView::Text {
                file_path: file.path.clone(),
                content: file.content.clone(),
                language: language::detect(&file.path),
            }
        }
    }

    pub fn file_path(&self) -> &str {
        match self {
            EditorView::Text { file_path, .. } | EditorView::Binary { file_path } => file_path,
        }
    }
}

/// A generated preview document, live until superseded or the session closes.
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    pub generation: u64,
    pub document: Arc<RenderableDocument>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionState),
    /// The widget must bind `view` and dispose the model for `previous`.
    ModelBound {
        previous: Option<String>,
        view: EditorView,
    },
    FilesChanged,
    Saved {
        updated_at: Timestamp,
    },
    PreviewReady(PreviewHandle),
    PreviewRevoked {
        generation: u64,
    },
    PreviewFailed {
        generation: u64,
        message: String,
    },
    /// A non-fatal failure worth showing to the user.
    Notice {
        message: String,
        retryable: bool,
    },
}

#[derive(Debug)]
struct Working {
    state: SessionState,
    project: Option<Project>,
    files: Vec<File>,
    current: Option<String>,
}

impl Working {
    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            _ => Err(Error::SessionNotReady),
        }
    }

    fn view(&self) -> Option<EditorView> {
        let current = self.current.as_deref()?;
        self.files
            .iter()
            .find(|f| f.path == current)
            .map(EditorView::of)
    }

    /// Moves the current pointer, returning the rebind event if it changed.
    fn select(&mut self, path: Option<String>) -> Option<SessionEvent> {
        if self.current == path {
            return None;
        }
        let previous = std::mem::replace(&mut self.current, path);
        self.view()
            .map(|view| SessionEvent::ModelBound { previous, view })
    }

    /// Replaces same-path files in place and appends new ones.
    fn merge(&mut self, incoming: Vec<File>) {
        for file in incoming {
            match self.files.iter_mut().find(|f| f.path == file.path) {
                Some(existing) => *existing = file,
                None => self.files.push(file),
            }
        }
    }
}

fn initial_selection(files: &[File]) -> Option<&File> {
    files
        .iter()
        .find(|f| f.name() == ROOT_DOCUMENT)
        .or_else(|| files.iter().find(|f| !f.is_marker()))
        .or_else(|| files.first())
}

#[derive(Default)]
struct PreviewSlot {
    generation: AtomicU64,
    live: Mutex<Option<PreviewHandle>>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl PreviewSlot {
    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn revoke(&self) -> Option<u64> {
        lock(&self.live).take().map(|handle| handle.generation)
    }

    fn abort_pending(&self) {
        for task in lock(&self.pending).drain(..) {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct EditorSession {
    project_id: String,
    projects: ProjectRegistry,
    repo: FileRepository,
    working: Mutex<Working>,
    save_gate: tokio::sync::Mutex<()>,
    preview: Arc<PreviewSlot>,
    debounce: Duration,
    events: broadcast::Sender<SessionEvent>,
}

impl EditorSession {
    pub fn new(
        project_id: impl Into<String>,
        projects: ProjectRegistry,
        repo: FileRepository,
        config: &Config,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            project_id: project_id.into(),
            projects,
            repo,
            working: Mutex::new(Working {
                state: SessionState::Loading,
                project: None,
                files: Vec::new(),
                current: None,
            }),
            save_gate: tokio::sync::Mutex::new(()),
            preview: Arc::new(PreviewSlot::default()),
            debounce: config.preview_debounce(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn working(&self) -> MutexGuard<'_, Working> {
        lock(&self.working)
    }

    fn set_state(&self, state: SessionState) {
        self.working().state = state.clone();
        self.emit(SessionEvent::StateChanged(state));
    }

    /// Emits a user-visible notice for `err` and hands it back.
    fn report(&self, err: Error) -> Error {
        self.emit(SessionEvent::Notice {
            message: err.to_string(),
            retryable: err.is_retryable(),
        });
        err
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn state(&self) -> SessionState {
        self.working().state.clone()
    }

    pub fn project(&self) -> Option<Project> {
        self.working().project.clone()
    }

    /// Snapshot of the working set.
    pub fn files(&self) -> Vec<File> {
        self.working().files.clone()
    }

    pub fn current_file(&self) -> Option<File> {
        let working = self.working();
        let current = working.current.as_deref()?;
        working.files.iter().find(|f| f.path == current).cloned()
    }

    pub fn current_view(&self) -> Option<EditorView> {
        self.working().view()
    }

    pub fn tree(&self) -> FileTreeNode {
        tree::build_tree(&self.working().files)
    }

    pub fn current_preview(&self) -> Option<PreviewHandle> {
        lock(&self.preview.live).clone()
    }

    /// Loads the project and its files. Retrying after `LoadError` is allowed.
    pub async fn load(&self) -> Result<()> {
        match self.state() {
            SessionState::NotFound => {
                return Err(Error::NotFound(format!("Project {}", self.project_id)))
            }
            SessionState::Closed => return Err(Error::SessionNotReady),
            _ => self.set_state(SessionState::Loading),
        }

        let loaded = match self.projects.get(&self.project_id).await {
            Ok(project) => self
                .repo
                .list_by_project(&self.project_id)
                .await
                .map(|files| (project, files)),
            Err(e) => Err(e),
        };

        let (project, files) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::warn!(project_id = %self.project_id, error = %e, "Failed to load project");
                let state = match &e {
                    Error::NotFound(_) => SessionState::NotFound,
                    other => SessionState::LoadError(other.to_string()),
                };
                self.set_state(state);
                return Err(e);
            }
        };

        let bound = {
            let mut working = self.working();
            let initial = initial_selection(&files).map(|f| f.path.clone());
            working.project = Some(project);
            working.files = files;
            working.current = None;
            working.select(initial)
        };

        tracing::info!(project_id = %self.project_id, "Opened editor session");
        self.set_state(SessionState::Ready);
        if let Some(event) = bound {
            self.emit(event);
        }
        self.regenerate_preview();
        Ok(())
    }

    /// Points the editor at `path`. Unknown paths are ignored.
    pub fn select_file(&self, path: &str) {
        let bound = {
            let mut working = self.working();
            if working.ensure_ready().is_err() || !working.files.iter().any(|f| f.path == path) {
                return;
            }
            working.select(Some(path.to_string()))
        };
        if let Some(event) = bound {
            self.emit(event);
        }
    }

    /// Replaces the current file's text in the working set only.
    pub fn edit_current_file(&self, content: impl Into<String>) -> Result<()> {
        let mut working = self.working();
        working.ensure_ready()?;

        let Some(current) = working.current.clone() else {
            return Ok(());
        };
        if let Some(file) = working.files.iter_mut().find(|f| f.path == current) {
            file.content = content.into();
        }
        Ok(())
    }

    /// Persists the whole working set, refreshes the project's `updated_at`
    /// and schedules a preview. Only one save runs at a time.
    pub async fn save(&self) -> Result<Project> {
        let _in_flight = self.save_gate.try_lock().map_err(|_| Error::SaveInProgress)?;

        let snapshot = {
            let working = self.working();
            working.ensure_ready()?;
            working.files.clone()
        };

        let writes = snapshot
            .iter()
            .map(|file| self.repo.update(&file.path, &file.content));
        let mut saved = Vec::with_capacity(snapshot.len());
        for result in join_all(writes).await {
            match result {
                Ok(file) => saved.push(file),
                Err(e) => {
                    tracing::warn!(project_id = %self.project_id, error = %e, "Failed to save changes");
                    return Err(self.report(e));
                }
            }
        }

        let project = match self.projects.touch(&self.project_id).await {
            Ok(project) => project,
            Err(e) => return Err(self.report(e)),
        };

        {
            let mut working = self.working();
            for file in &saved {
                if let Some(existing) = working.files.iter_mut().find(|f| f.path == file.path) {
                    existing.last_modified = file.last_modified;
                }
            }
            working.project = Some(project.clone());
        }

        tracing::info!(project_id = %self.project_id, files = saved.len(), "Saved changes");
        self.emit(SessionEvent::Saved {
            updated_at: project.updated_at,
        });
        self.regenerate_preview();
        Ok(project)
    }

    /// Schedules a preview of the current working set after the debounce
    /// delay. A later call supersedes this one even if this one finishes
    /// first. Returns the generation number of the request.
    pub fn regenerate_preview(&self) -> u64 {
        let files = self.files();
        let slot = Arc::clone(&self.preview);
        let events = self.events.clone();
        let debounce = self.debounce;
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if !slot.is_latest(generation) {
                return;
            }

            let event = match preview::generate(&files) {
                Ok(document) => {
                    let handle = PreviewHandle {
                        generation,
                        document: Arc::new(document),
                    };
                    let revoked = {
                        let mut live = lock(&slot.live);
                        if !slot.is_latest(generation) {
                            return;
                        }
                        live.replace(handle.clone()).map(|old| old.generation)
                    };
                    if let Some(old) = revoked {
                        let _ = events.send(SessionEvent::PreviewRevoked { generation: old });
                    }
                    tracing::debug!(generation, "Preview ready");
                    SessionEvent::PreviewReady(handle)
                }
                Err(e) => SessionEvent::PreviewFailed {
                    generation,
                    message: e.to_string(),
                },
            };
            let _ = events.send(event);
        });

        let mut pending = lock(&self.preview.pending);
        pending.retain(|task| !task.is_finished());
        pending.push(task);
        generation
    }

    pub async fn create_file(&self, relative_path: &str) -> Result<File> {
        self.working().ensure_ready()?;
        let _gate = self.save_gate.lock().await;

        let created = match self.repo.create(&self.project_id, relative_path, "").await {
            Ok(created) => created,
            Err(e) => return Err(self.report(e)),
        };

        let bound = {
            let mut working = self.working();
            working.merge(created.marker.into_iter().collect());
            working.merge(vec![created.file.clone()]);
            working.select(Some(created.file.path.clone()))
        };

        self.emit(SessionEvent::FilesChanged);
        if let Some(event) = bound {
            self.emit(event);
        }
        Ok(created.file)
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        self.working().ensure_ready()?;
        let _gate = self.save_gate.lock().await;
        let guard = files::ensure_content_remains(&self.working().files, path);
        if let Err(e) = guard {
            return Err(self.report(e));
        }

        if let Err(e) = self.repo.remove(path).await {
            return Err(self.report(e));
        }

        let bound = {
            let mut working = self.working();
            working.files.retain(|f| f.path != path);
            if working.current.as_deref() == Some(path) {
                let next = working.files.first().map(|f| f.path.clone());
                working.select(next)
            } else {
                None
            }
        };

        self.emit(SessionEvent::FilesChanged);
        if let Some(event) = bound {
            self.emit(event);
        }
        self.regenerate_preview();
        Ok(())
    }

    /// Renames a file. Unsaved edits to it carry over to the new path.
    pub async fn rename_file(&self, old_path: &str, new_name: &str) -> Result<File> {
        self.working().ensure_ready()?;
        let _gate = self.save_gate.lock().await;

        let renamed = match self.repo.rename(old_path, new_name).await {
            Ok(renamed) => renamed,
            Err(e) => return Err(self.report(e)),
        };

        let (file, bound) = {
            let mut working = self.working();
            let mut file = renamed;
            if let Some(index) = working.files.iter().position(|f| f.path == old_path) {
                let old = working.files.remove(index);
                file.content = old.content;
            }
            working.files.push(file.clone());

            let bound = if working.current.as_deref() == Some(old_path) {
                working.select(Some(file.path.clone()))
            } else {
                None
            };
            (file, bound)
        };

        self.emit(SessionEvent::FilesChanged);
        if let Some(event) = bound {
            self.emit(event);
        }
        Ok(file)
    }

    pub async fn bulk_import(&self, entries: Vec<Entry>) -> Result<ImportReport> {
        self.working().ensure_ready()?;
        let _gate = self.save_gate.lock().await;

        let report = match self.repo.bulk_import(&self.project_id, entries).await {
            Ok(report) => report,
            Err(e) => return Err(self.report(e)),
        };

        let bound = {
            let mut working = self.working();
            working.merge(report.files.clone());
            if working.current.is_none() {
                let first = report.files.first().map(|f| f.path.clone());
                working.select(first)
            } else {
                None
            }
        };

        self.emit(SessionEvent::FilesChanged);
        if let Some(event) = bound {
            self.emit(event);
        }
        if !report.failures.is_empty() {
            self.emit(SessionEvent::Notice {
                message: format!("{} files could not be imported", report.failures.len()),
                retryable: false,
            });
        }
        self.regenerate_preview();
        Ok(report)
    }

    pub async fn import_archive(&self, bytes: &[u8]) -> Result<ImportReport> {
        let extracted = archive::archive_to_entries(bytes).map_err(|e| self.report(e))?;
        self.import_extracted(extracted).await
    }

    pub async fn import_folder(&self, items: Vec<FolderItem>) -> Result<ImportReport> {
        self.import_extracted(archive::folder_file_list_to_entries(items))
            .await
    }

    async fn import_extracted(&self, extracted: Extracted) -> Result<ImportReport> {
        if extracted.entries.is_empty() {
            return Err(self.report(Error::NoValidFiles(extracted.skipped)));
        }
        match self.bulk_import(extracted.entries).await {
            Ok(mut report) => {
                report.failures.extend(extracted.skipped);
                Ok(report)
            }
            Err(e) => Err(e.with_skipped(extracted.skipped)),
        }
    }

    /// Packs the working set, unsaved edits included.
    pub fn export_archive(&self) -> Result<ExportedArchive> {
        let (name, files) = {
            let working = self.working();
            working.ensure_ready()?;
            let name = working
                .project
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_default();
            (name, working.files.clone())
        };
        archive::export_files(&name, &files)
    }

    /// File name and working content for a single-file download.
    pub fn download_file(&self, path: &str) -> Option<(String, String)> {
        let working = self.working();
        let file = working.files.iter().find(|f| f.path == path)?;
        Some((file.name().to_string(), file.content.clone()))
    }

    /// Stops pending previews and revokes the live one.
    pub fn close(&self) {
        self.preview.generation.fetch_add(1, Ordering::SeqCst);
        self.preview.abort_pending();
        if let Some(generation) = self.preview.revoke() {
            self.emit(SessionEvent::PreviewRevoked { generation });
        }
        self.set_state(SessionState::Closed);
        tracing::info!(project_id = %self.project_id, "Closed editor session");
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.preview.abort_pending();
    }
}
