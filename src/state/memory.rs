// src/state/memory.rs
use super::{ResetScope, StateStore, SyncRecord};
use crate::error::StoreError;
use crate::types::NoteId;
use indexmap::IndexMap;
use parking_lot::Mutex;

/// In-process store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    records: Mutex<IndexMap<NoteId, SyncRecord>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = SyncRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.note_id.clone(), record))
            .collect();
        Self {
            records: Mutex::new(records),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, note_id: &NoteId) -> Option<SyncRecord> {
        self.records.lock().get(note_id).cloned()
    }

    fn put(&self, record: SyncRecord) -> Result<(), StoreError> {
        self.records.lock().insert(record.note_id.clone(), record);
        Ok(())
    }

    fn reset(&self, scope: ResetScope) -> Result<usize, StoreError> {
        let mut records = self.records.lock();
        Ok(match scope {
            ResetScope::Note(id) => usize::from(records.shift_remove(&id).is_some()),
            ResetScope::All => {
                let count = records.len();
                records.clear();
                count
            }
        })
    }

    fn records(&self) -> Vec<SyncRecord> {
        self.records.lock().values().cloned().collect()
    }
}
