// src/lib.rs
//! notes2notion library: keeps Notion pages in sync with a local folder of notes.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ApiError`, `FormatError`, `StoreError`
//! - **Configuration**: `SyncConfig`, `AppConfig`
//! - **Domain model**: `Note`, `BlockNode`, `TextRun`, `FormattedDocument`
//! - **Local pipeline**: `format`, `validate`, `chunk`, `prepare`
//! - **Remote writes**: `NotionWriter`, `NotionPageWriter`, `NotionHttpClient`
//! - **State**: `StateStore`, `JsonStateStore`, `MemoryStateStore`
//! - **Orchestration**: `SyncEngine`, `SyncReport`

pub mod api;
pub mod chunking;
pub mod config;
pub mod constants;
pub mod contract;
pub mod error;
pub mod error_recovery;
pub mod formatting;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod state;
pub mod sync;
pub mod types;

// --- Error Handling ---
pub use crate::error::{ApiError, AppError, ChunkOverflow, FormatError, NotionErrorCode, StoreError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{AppConfig, SyncConfig};

// --- Domain Model ---
pub use crate::model::{Annotations, BlockNode, FormattedDocument, Note, TextRun};

// --- Domain Types ---
pub use crate::types::{ApiKey, Fingerprint, NoteId, PageId, ValidatedUrl};

// --- Local Pipeline ---
pub use crate::chunking::{chunk, Chunk, ChunkLimits};
pub use crate::contract::{validate, ContractRules, ContractViolation};
pub use crate::formatting::{format, FormatOptions};
pub use crate::pipeline::{prepare, PrepareError, PrepareSettings, PreparedNote, TruncationPolicy};

// --- Remote Writes ---
pub use crate::api::{NotionHttpClient, NotionPageWriter, NotionWriter};
pub use crate::error_recovery::{RetryPolicy, Sleeper};

// --- State ---
pub use crate::state::{JsonStateStore, MemoryStateStore, ResetScope, StateStore, SyncRecord};

// --- Orchestration ---
pub use crate::source::{DirectoryNoteSource, NoteScan, NoteSource, UnreadableNote};
pub use crate::sync::{
    CancellationFlag, DeletedNotePolicy, FailureStage, Orphan, SyncEngine, SyncOutcome, SyncReport,
};
