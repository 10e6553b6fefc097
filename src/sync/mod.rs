// src/sync/mod.rs
//! Sync orchestration: change detection, page creation and replacement,
//! recovery of interrupted runs, and handling of locally deleted notes.

mod engine;
mod locks;
mod report;

pub use engine::SyncEngine;
pub use locks::{CancellationFlag, KeyedLocks, NoteLocks, TitleLocks};
pub use report::{FailureStage, Orphan, SyncOutcome, SyncReport};

use serde::{Deserialize, Serialize};

/// What happens to the page of a note that disappeared locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DeletedNotePolicy {
    /// Report it, touch nothing.
    #[default]
    Keep,
    /// Archive the page and drop the record.
    Archive,
}
