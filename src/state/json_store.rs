// src/state/json_store.rs
use super::{ResetScope, StateStore, SyncRecord};
use crate::error::StoreError;
use crate::types::NoteId;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    records: IndexMap<NoteId, SyncRecord>,
}

/// Sync state kept in a single JSON file.
///
/// Every write replaces the whole file: the new content goes to a temp file
/// that is fsynced and then renamed over the old one.
#[derive(Debug)]
pub struct JsonStateStore {
    path: PathBuf,
    records: Mutex<IndexMap<NoteId, SyncRecord>>,
}

impl JsonStateStore {
    /// Loads the store at `path`. A missing file is an empty store; a corrupt
    /// one is moved aside to `<path>.corrupt` and also treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<StateFile>(&bytes) {
                Ok(file) => file.records,
                Err(e) => {
                    let backup = corrupt_path(&path);
                    log::warn!(
                        "State file {} is corrupt ({}); moving it to {} and starting empty",
                        path.display(),
                        e,
                        backup.display()
                    );
                    if let Err(e) = fs::rename(&path, &backup) {
                        log::warn!("Could not preserve corrupt state file: {}", e);
                    }
                    IndexMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No state file at {}, starting empty", path.display());
                IndexMap::new()
            }
            Err(source) => return Err(StoreError::Read { path, source }),
        };

        log::debug!("Loaded {} sync records from {}", records.len(), path.display());
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &IndexMap<NoteId, SyncRecord>) -> Result<(), StoreError> {
        let file = StateFile {
            version: STATE_FORMAT_VERSION,
            records: records.clone(),
        };
        let data = serde_json::to_vec_pretty(&file)?;
        atomic_write(&self.path, &data).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl StateStore for JsonStateStore {
    fn get(&self, note_id: &NoteId) -> Option<SyncRecord> {
        self.records.lock().get(note_id).cloned()
    }

    fn put(&self, record: SyncRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock();
        let previous = records.insert(record.note_id.clone(), record.clone());
        if let Err(e) = self.persist(&records) {
            // keep memory in line with disk
            match previous {
                Some(previous) => {
                    records.insert(record.note_id, previous);
                }
                None => {
                    records.shift_remove(&record.note_id);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    fn reset(&self, scope: ResetScope) -> Result<usize, StoreError> {
        let mut records = self.records.lock();
        let snapshot = records.clone();
        let removed = match scope {
            ResetScope::Note(id) => usize::from(records.shift_remove(&id).is_some()),
            ResetScope::All => {
                let count = records.len();
                records.clear();
                count
            }
        };
        if removed > 0 {
            if let Err(e) = self.persist(&records) {
                *records = snapshot;
                return Err(e);
            }
        }
        Ok(removed)
    }

    fn records(&self) -> Vec<SyncRecord> {
        self.records.lock().values().cloned().collect()
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;
    sync_directory(&dir)
}

#[cfg(unix)]
fn sync_directory(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fingerprint, PageId};
    use tempfile::TempDir;

    fn record(id: &str) -> SyncRecord {
        let mut record = SyncRecord::new(NoteId::new(id).unwrap());
        record.fingerprint = Some(Fingerprint::of(id.as_bytes()));
        record.page_id = Some(PageId::new_v4());
        record
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync-state.json");

        let first = record("a.md");
        let store = JsonStateStore::open(&path).unwrap();
        store.put(first.clone()).unwrap();
        store.put(record("b.md")).unwrap();
        drop(store);

        let reopened = JsonStateStore::open(&path).unwrap();
        let ids: Vec<_> = reopened
            .records()
            .into_iter()
            .map(|r| r.note_id.to_string())
            .collect();
        assert_eq!(ids, vec!["a.md", "b.md"]);
        assert_eq!(reopened.get(&first.note_id), Some(first));
        assert!(!dir.path().join("sync-state.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_preserved_and_store_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync-state.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = JsonStateStore::open(&path).unwrap();
        assert!(store.records().is_empty());
        assert_eq!(
            fs::read(dir.path().join("sync-state.json.corrupt")).unwrap(),
            b"{ not json"
        );
    }

    #[test]
    fn reset_one_and_all() {
        let dir = TempDir::new().unwrap();
        let store = JsonStateStore::open(dir.path().join("state.json")).unwrap();
        store.put(record("a.md")).unwrap();
        store.put(record("b.md")).unwrap();

        let removed = store
            .reset(ResetScope::Note(NoteId::new("a.md").unwrap()))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.reset(ResetScope::All).unwrap(), 1);

        let reopened = JsonStateStore::open(store.path()).unwrap();
        assert!(reopened.records().is_empty());
    }

    #[test]
    fn put_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/state/sync-state.json");
        let store = JsonStateStore::open(&path).unwrap();
        store.put(record("a.md")).unwrap();
        assert!(path.exists());
    }
}
