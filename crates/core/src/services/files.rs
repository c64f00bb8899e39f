use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use regex::Regex;
use serde::Serialize;

use crate::{
    db::{
        models::{compose_path, now_millis, File, MARKER_FILE_NAME},
        Store,
    },
    error::{Error, Result},
    services::archive::Entry,
};

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_\-./]+\.[a-zA-Z0-9]+$").expect("file name pattern compiles")
    })
}

/// Names accepted by create and rename: letters, digits, `_`, `-`, `.` and
/// `/`, non-empty segments, ending in an extension.
pub fn validate_file_name(name: &str) -> Result<()> {
    if !name_pattern().is_match(name) {
        return Err(Error::InvalidName(format!(
            "{name}: please enter a valid file name with extension"
        )));
    }
    validate_relative_path(name)
}

/// Structural checks shared by every way a path can enter the store.
pub fn validate_relative_path(path: &str) -> Result<()> {
    let bad_segment = path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if path.is_empty() || bad_segment {
        return Err(Error::InvalidName(format!("{path}: invalid path")));
    }
    Ok(())
}

/// Fails unless a non-marker file would still exist after removing `path`.
pub fn ensure_content_remains(files: &[File], path: &str) -> Result<()> {
    if files.iter().any(|f| f.path != path && !f.is_marker()) {
        Ok(())
    } else {
        Err(Error::LastFileProtected(
            "You must have at least one file in your project".to_string(),
        ))
    }
}

/// One entry of a bulk import that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub files: Vec<File>,
    pub failures: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Treats any skipped entry as an error.
    pub fn into_result(self) -> Result<Vec<File>> {
        if self.failures.is_empty() {
            Ok(self.files)
        } else {
            Err(Error::PartialImportFailure(self.failures))
        }
    }
}

/// Result of creating a file, including the folder marker synthesized for it.
#[derive(Debug, Clone)]
pub struct Created {
    pub file: File,
    pub marker: Option<File>,
}

/// Sole writer of durable file records.
#[derive(Clone)]
pub struct FileRepository {
    store: Arc<dyn Store>,
}

impl FileRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<File>> {
        self.store.list_files_by_project(project_id).await
    }

    pub async fn get(&self, path: &str) -> Result<File> {
        self.store
            .get_file(path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("File {path}")))
    }

    pub async fn create(
        &self,
        project_id: &str,
        relative_path: &str,
        content: &str,
    ) -> Result<Created> {
        validate_file_name(relative_path)?;

        let path = compose_path(project_id, relative_path);
        if self.store.get_file(&path).await?.is_some() {
            return Err(Error::DuplicatePath(format!(
                "A file named {relative_path} already exists"
            )));
        }

        let marker = match relative_path.rsplit_once('/') {
            Some((folder, _)) => self.ensure_folder(project_id, folder).await?,
            None => None,
        };

        let file = File::new(project_id, relative_path, content);
        self.store.put_file(&file).await?;

        tracing::info!(path = %file.path, "Created file");
        Ok(Created { file, marker })
    }

    /// Writes a `.keep` marker when nothing exists under `folder` yet.
    async fn ensure_folder(&self, project_id: &str, folder: &str) -> Result<Option<File>> {
        let prefix = format!("{folder}/");
        let occupied = self
            .store
            .list_files_by_project(project_id)
            .await?
            .iter()
            .any(|file| file.relative_path().starts_with(&prefix));
        if occupied {
            return Ok(None);
        }

        let marker = File::new(project_id, &format!("{prefix}{MARKER_FILE_NAME}"), "");
        self.store.put_file(&marker).await?;
        tracing::debug!(path = %marker.path, "Created folder marker");
        Ok(Some(marker))
    }

    /// Writes new content; `path` and `project_id` never change.
    pub async fn update(&self, path: &str, content: &str) -> Result<File> {
        let file = match self.store.get_file(path).await? {
            Some(mut existing) => {
                existing.content = content.to_string();
                existing.last_modified = now_millis().max(existing.last_modified);
                existing
            }
            None => {
                let (project_id, relative) = path
                    .split_once('/')
                    .ok_or_else(|| Error::InvalidName(format!("{path}: missing project prefix")))?;
                validate_relative_path(relative)?;
                File::new(project_id, relative, content)
            }
        };

        self.store.put_file(&file).await?;
        Ok(file)
    }

    /// Replaces the last segment of `old_path` with `new_name`, keeping content.
    pub async fn rename(&self, old_path: &str, new_name: &str) -> Result<File> {
        validate_file_name(new_name)?;

        let existing = self.get(old_path).await?;
        let new_path = match old_path.rsplit_once('/') {
            Some((parent, _)) => format!("{parent}/{new_name}"),
            None => new_name.to_string(),
        };
        if new_path == old_path {
            return Ok(existing);
        }
        if self.store.get_file(&new_path).await?.is_some() {
            return Err(Error::DuplicatePath(format!(
                "A file named {new_name} already exists"
            )));
        }

        let renamed = File {
            path: new_path,
            project_id: existing.project_id.clone(),
            content: existing.content,
            last_modified: now_millis(),
        };
        self.store.put_file(&renamed).await?;

        if let Err(e) = self.store.delete_file(old_path).await {
            // Undo the insert so the caller never sees both paths.
            if let Err(undo) = self.store.delete_file(&renamed.path).await {
                tracing::warn!(path = %renamed.path, error = %undo, "Failed to undo rename");
            }
            return Err(e);
        }

        tracing::info!(from = %old_path, to = %renamed.path, "Renamed file");
        Ok(renamed)
    }

    pub async fn remove(&self, path: &str) -> Result<()> {
        let file = self.get(path).await?;
        let siblings = self.store.list_files_by_project(&file.project_id).await?;
        ensure_content_remains(&siblings, path)?;

        self.store.delete_file(path).await?;
        tracing::info!(path, "Deleted file");
        Ok(())
    }

    /// Upserts every entry, committing the valid ones even when others fail.
    pub async fn bulk_import(&self, project_id: &str, entries: Vec<Entry>) -> Result<ImportReport> {
        let mut failures = Vec::new();
        let mut staged: Vec<File> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let timestamp = now_millis();

        for entry in entries {
            if let Err(e) = validate_relative_path(&entry.path) {
                failures.push(ImportFailure {
                    path: entry.path,
                    reason: e.to_string(),
                });
                continue;
            }
            let content = match String::from_utf8(entry.data) {
                Ok(content) => content,
                Err(_) => {
                    failures.push(ImportFailure {
                        reason: format!("{} is not a text file", entry.path),
                        path: entry.path,
                    });
                    continue;
                }
            };

            let mut file = File::new(project_id, &entry.path, content);
            file.last_modified = timestamp;
            // A repeated path in one batch keeps the later entry.
            match positions.get(&file.path) {
                Some(&index) => staged[index] = file,
                None => {
                    positions.insert(file.path.clone(), staged.len());
                    staged.push(file);
                }
            }
        }

        for failure in &failures {
            tracing::warn!(path = %failure.path, reason = %failure.reason, "Skipped import entry");
        }
        if staged.is_empty() {
            return Err(Error::NoValidFiles(failures));
        }

        let writes = staged.iter().map(|file| self.store.put_file(file));
        let results = join_all(writes).await;

        let mut files = Vec::with_capacity(staged.len());
        let mut store_error = None;
        for (file, result) in staged.into_iter().zip(results) {
            match result {
                Ok(()) => files.push(file),
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "Failed to import entry");
                    failures.push(ImportFailure {
                        path: file.relative_path().to_string(),
                        reason: e.to_string(),
                    });
                    store_error.get_or_insert(e);
                }
            }
        }

        if files.is_empty() {
            if let Some(e) = store_error {
                return Err(e);
            }
        }

        tracing::info!(
            project_id,
            imported = files.len(),
            skipped = failures.len(),
            "Imported files"
        );
        Ok(ImportReport { files, failures })
    }
}
