use std::io::{Cursor, Read, Write};

use serde::Serialize;
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{
    db::models::{File, MARKER_FILE_NAME},
    error::{Error, Result},
    services::files::ImportFailure,
};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const EMPTY_ZIP_MAGIC: &[u8] = b"PK\x05\x06";

/// A relative path with its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub data: Vec<u8>,
}

impl Entry {
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub fn text(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(path, content.into().into_bytes())
    }

    pub fn is_marker(&self) -> bool {
        self.path.rsplit('/').next() == Some(MARKER_FILE_NAME)
    }
}

/// Entries that could be read as text, plus the ones that were skipped.
#[derive(Debug, Default)]
pub struct Extracted {
    pub entries: Vec<Entry>,
    pub skipped: Vec<ImportFailure>,
}

/// One file picked through a folder selection.
#[derive(Debug)]
pub struct FolderItem {
    /// Path relative to the selection root, empty when the picker gave none.
    pub relative_path: String,
    pub name: String,
    pub contents: std::io::Result<Vec<u8>>,
}

/// Upload heuristic: a `.zip` name or zip content type, confirmed by the
/// leading magic bytes.
pub fn looks_like_archive(file_name: &str, content_type: Option<&str>, bytes: &[u8]) -> bool {
    let by_name = file_name.to_ascii_lowercase().ends_with(".zip");
    let by_type = matches!(
        content_type,
        Some("application/zip" | "application/x-zip-compressed")
    );
    (by_name || by_type) && (bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(EMPTY_ZIP_MAGIC))
}

pub fn archive_to_entries(bytes: &[u8]) -> Result<Extracted> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::InvalidArchive(format!("Failed to read ZIP archive: {e}")))?;
    let mut extracted = Extracted::default();

    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                extracted.skipped.push(ImportFailure {
                    path: format!("#{index}"),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        if file.enclosed_name().is_none() {
            extracted.skipped.push(ImportFailure {
                path: name,
                reason: "entry escapes the archive root".to_string(),
            });
            continue;
        }

        let mut data = Vec::new();
        if let Err(e) = file.read_to_end(&mut data) {
            extracted.skipped.push(ImportFailure {
                path: name,
                reason: e.to_string(),
            });
            continue;
        }
        if std::str::from_utf8(&data).is_err() {
            extracted.skipped.push(ImportFailure {
                path: name,
                reason: "not a text file".to_string(),
            });
            continue;
        }

        extracted.entries.push(Entry::new(name, data));
    }

    for skipped in &extracted.skipped {
        tracing::warn!(path = %skipped.path, reason = %skipped.reason, "Skipped archive entry");
    }
    Ok(extracted)
}

/// Packs entries into a ZIP archive, leaving out folder markers.
pub fn entries_to_archive(entries: &[Entry]) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in entries.iter().filter(|entry| !entry.is_marker()) {
            zip.start_file(entry.path.as_str(), options)
                .map_err(|e| Error::InvalidArchive(format!("Failed to add {}: {e}", entry.path)))?;
            zip.write_all(&entry.data)
                .map_err(|e| Error::InvalidArchive(format!("Failed to write {}: {e}", entry.path)))?;
        }

        zip.finish()
            .map_err(|e| Error::InvalidArchive(format!("Failed to finalize archive: {e}")))?;
    }
    Ok(cursor.into_inner())
}

pub fn folder_file_list_to_entries(items: impl IntoIterator<Item = FolderItem>) -> Extracted {
    let mut extracted = Extracted::default();

    for item in items {
        let path = if item.relative_path.is_empty() {
            item.name
        } else {
            item.relative_path
        };
        match item.contents {
            Ok(data) if std::str::from_utf8(&data).is_ok() => {
                extracted.entries.push(Entry::new(path, data));
            }
            Ok(_) => extracted.skipped.push(ImportFailure {
                path,
                reason: "not a text file".to_string(),
            }),
            Err(e) => extracted.skipped.push(ImportFailure {
                path,
                reason: e.to_string(),
            }),
        }
    }

    for skipped in &extracted.skipped {
        tracing::warn!(path = %skipped.path, reason = %skipped.reason, "Skipped folder entry");
    }
    extracted
}

/// A packed project ready to be offered as a download.
#[derive(Debug, Clone, Serialize)]
pub struct ExportedArchive {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

pub fn export_files(project_name: &str, files: &[File]) -> Result<ExportedArchive> {
    let entries: Vec<Entry> = files
        .iter()
        .map(|f| Entry::text(f.relative_path(), f.content.as_str()))
        .collect();
    let bytes = entries_to_archive(&entries)?;

    tracing::info!(project = project_name, bytes = bytes.len(), "Exported project");
    Ok(ExportedArchive {
        file_name: archive_file_name(project_name),
        bytes,
    })
}

/// Download name for an exported project.
pub fn archive_file_name(project_name: &str) -> String {
    let stem = project_name.split_whitespace().collect::<Vec<_>>().join("-");
    if stem.is_empty() {
        "project.zip".to_string()
    } else {
        format!("{stem}.zip")
    }
}
