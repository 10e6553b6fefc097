// src/source.rs
//! Where notes come from.

use crate::constants::NOTE_EXTENSIONS;
use crate::error::AppError;
use crate::model::Note;
use crate::types::NoteId;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A note file that exists but could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadableNote {
    pub id: NoteId,
    pub error: String,
}

/// The result of one pass over the note corpus.
#[derive(Debug, Default)]
pub struct NoteScan {
    pub notes: Vec<Note>,
    pub unreadable: Vec<UnreadableNote>,
    /// Directories that could not be listed; whatever notes they hold are unknown.
    pub unlisted_dirs: Vec<PathBuf>,
}

impl NoteScan {
    /// Every note known to exist, readable or not.
    pub fn present_ids(&self) -> HashSet<NoteId> {
        self.notes
            .iter()
            .map(|note| note.id.clone())
            .chain(self.unreadable.iter().map(|u| u.id.clone()))
            .collect()
    }

    /// Whether the absence of a note from this scan proves it was deleted.
    pub fn is_complete(&self) -> bool {
        self.unlisted_dirs.is_empty()
    }
}

/// Supplies the current note corpus. Only a missing or unlistable root is an
/// error; individual files that fail to read are reported in the scan.
pub trait NoteSource {
    fn scan(&self) -> Result<NoteScan, AppError>;
}

/// Notes stored as `.md`, `.markdown` or `.txt` files under a directory.
///
/// Hidden files and directories are skipped, as is any directory listed in
/// `exclude` (the engine's own state directory, when it lives inside the
/// notes tree). Symlinked note files are followed. Note ids are paths
/// relative to the root.
#[derive(Debug, Clone)]
pub struct DirectoryNoteSource {
    root: PathBuf,
    exclude: Vec<PathBuf>,
}

impl DirectoryNoteSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exclude: Vec::new(),
        }
    }

    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exclude.push(dir.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|dir| path.starts_with(dir))
    }

    fn walk(&self, dir: &Path, scan: &mut NoteScan) -> Result<(), AppError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if dir != self.root => {
                log::warn!("Could not list {}: {}", dir.display(), e);
                scan.unlisted_dirs.push(dir.to_path_buf());
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let (entry, file_type) = match entry.and_then(|e| e.file_type().map(|t| (e, t))) {
                Ok(found) => found,
                Err(e) => {
                    log::warn!("Could not read an entry of {}: {}", dir.display(), e);
                    scan.unlisted_dirs.push(dir.to_path_buf());
                    continue;
                }
            };
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden || self.is_excluded(&path) {
                continue;
            }

            if file_type.is_dir() {
                self.walk(&path, scan)?;
            } else if (file_type.is_file() || file_type.is_symlink()) && has_note_extension(&path) {
                let id = self.note_id(&path)?;
                match read_note(&path, id.clone()) {
                    Ok(note) => scan.notes.push(note),
                    Err(e) => {
                        log::warn!("Could not read note {}: {}", path.display(), e);
                        scan.unreadable.push(UnreadableNote {
                            id,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn note_id(&self, path: &Path) -> Result<NoteId, AppError> {
        let relative = pathdiff::diff_paths(path, &self.root).ok_or_else(|| {
            AppError::InvalidConfiguration(format!(
                "{} is not under {}",
                path.display(),
                self.root.display()
            ))
        })?;
        Ok(NoteId::new(relative.to_string_lossy())?)
    }
}

fn read_note(path: &Path, id: NoteId) -> io::Result<Note> {
    let raw = fs::read(path)?;
    let modified = fs::metadata(path)?
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Ok(Note::new(id, raw, modified))
}

fn has_note_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            NOTE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

impl NoteSource for DirectoryNoteSource {
    fn scan(&self) -> Result<NoteScan, AppError> {
        if !self.root.is_dir() {
            return Err(AppError::InvalidConfiguration(format!(
                "Notes directory {} does not exist",
                self.root.display()
            )));
        }
        let mut scan = NoteScan::default();
        self.walk(&self.root, &mut scan)?;
        scan.notes.sort_by(|a, b| a.id.cmp(&b.id));
        scan.unreadable.sort_by(|a, b| a.id.cmp(&b.id));
        log::info!(
            "Found {} notes under {} ({} unreadable)",
            scan.notes.len(),
            self.root.display(),
            scan.unreadable.len()
        );
        Ok(scan)
    }
}
