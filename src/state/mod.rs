// src/state/mod.rs
//! Per-note sync state: what was last pushed, and where it went.
//!
//! A record is the only thing that ties a local note to its remote page, so
//! stores write through on every `put` and never drop records on their own.

mod json_store;
mod memory;

pub use json_store::JsonStateStore;
pub use memory::MemoryStateStore;

use crate::error::StoreError;
use crate::types::{Fingerprint, NoteId, PageId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub note_id: NoteId,
    /// Fingerprint of the last content that was fully synced.
    #[serde(default)]
    pub fingerprint: Option<Fingerprint>,
    #[serde(default)]
    pub page_id: Option<PageId>,
    #[serde(default)]
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    /// Set before a page creation is attempted, cleared once the page id is known.
    #[serde(default)]
    pub create_started_at: Option<DateTime<Utc>>,
}

impl SyncRecord {
    pub fn new(note_id: NoteId) -> Self {
        Self {
            note_id,
            fingerprint: None,
            page_id: None,
            last_synced_at: None,
            last_error: None,
            create_started_at: None,
        }
    }

    /// The remote page holds exactly this content.
    pub fn is_synced(&self, fingerprint: &Fingerprint) -> bool {
        self.page_id.is_some() && self.fingerprint.as_ref() == Some(fingerprint)
    }

    /// A creation was started but its page id was never recorded.
    pub fn has_unconfirmed_create(&self) -> bool {
        self.page_id.is_none() && self.create_started_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetScope {
    Note(NoteId),
    All,
}

/// Durable storage of sync records.
///
/// Implementations must make each `put` atomic with respect to concurrent
/// readers: a `get` sees either the old record or the new one.
pub trait StateStore: Send + Sync {
    fn get(&self, note_id: &NoteId) -> Option<SyncRecord>;

    /// Inserts or replaces the record for `record.note_id`.
    fn put(&self, record: SyncRecord) -> Result<(), StoreError>;

    /// Removes records; returns how many were removed.
    fn reset(&self, scope: ResetScope) -> Result<usize, StoreError>;

    /// All records, in insertion order.
    fn records(&self) -> Vec<SyncRecord>;
}
