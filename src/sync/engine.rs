// src/sync/engine.rs
//! The sync orchestrator.
//!
//! For every note: fingerprint, consult the state store, and only when the
//! content changed run the local pipeline and talk to Notion. State is
//! written as soon as each fact becomes known (creation started, page id,
//! synced fingerprint) so an interrupted run resumes instead of duplicating
//! pages.

use super::locks::{CancellationFlag, NoteLocks, TitleLocks};
use super::report::{FailureStage, Orphan, SyncOutcome, SyncReport};
use super::DeletedNotePolicy;
use crate::api::NotionWriter;
use crate::config::SyncConfig;
use crate::error::{ApiError, StoreError};
use crate::model::Note;
use crate::pipeline::{prepare, PreparedNote};
use crate::state::{ResetScope, StateStore, SyncRecord};
use crate::types::{NoteId, PageId};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;

/// Why a note's remote phase stopped.
#[derive(Error, Debug)]
enum NoteError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("state store: {0}")]
    Store(#[from] StoreError),
}

impl NoteError {
    fn stage(&self) -> FailureStage {
        match self {
            NoteError::Api(_) => FailureStage::Remote,
            NoteError::Store(_) => FailureStage::State,
        }
    }
}

/// Per-run bookkeeping shared by every note future.
struct RunContext<'a> {
    cancel: &'a CancellationFlag,
    deadline: Option<Instant>,
    abort: OnceCell<String>,
}

impl RunContext<'_> {
    /// The stage a note that has not started yet must be failed with, if any.
    fn refusal(&self) -> Option<(FailureStage, String)> {
        if let Some(reason) = self.abort.get() {
            return Some((FailureStage::Aborted, format!("run aborted: {}", reason)));
        }
        if self.cancel.is_cancelled() {
            return Some((FailureStage::Cancelled, "run cancelled".to_string()));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some((
                FailureStage::DeadlineExceeded,
                "run deadline passed before the note started".to_string(),
            ));
        }
        None
    }
}

pub struct SyncEngine {
    config: SyncConfig,
    writer: Arc<dyn NotionWriter>,
    store: Arc<dyn StateStore>,
    locks: NoteLocks,
    title_locks: TitleLocks,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        writer: Arc<dyn NotionWriter>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            config,
            writer,
            store,
            locks: NoteLocks::new(),
            title_locks: TitleLocks::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Syncs every note and reports one outcome per note.
    ///
    /// Per-note failures never stop the run. An authorization failure, the
    /// cancellation flag, or the run deadline stop new notes from starting;
    /// those are reported as failed with the matching stage.
    pub async fn run(&self, notes: Vec<Note>, cancel: &CancellationFlag) -> SyncReport {
        let ctx = RunContext {
            cancel,
            deadline: self.config.run_deadline.map(|d| Instant::now() + d),
            abort: OnceCell::new(),
        };
        log::info!(
            "Syncing {} notes with concurrency {}",
            notes.len(),
            self.config.concurrency
        );

        let ctx_ref = &ctx;
        let mut indexed: Vec<(usize, SyncOutcome)> = stream::iter(notes.into_iter().enumerate())
            .map(move |(index, note)| async move {
                if let Some((stage, message)) = ctx_ref.refusal() {
                    log::debug!("Skipping {}: {}", note.id, message);
                    return (index, SyncOutcome::failed(note.id, stage, message));
                }
                (index, self.sync_note(note, ctx_ref).await)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);
        let outcomes = indexed.into_iter().map(|(_, outcome)| outcome).collect();

        let aborted = ctx.abort.into_inner();
        if let Some(reason) = &aborted {
            log::error!("Run aborted: {}", reason);
        }
        SyncReport {
            outcomes,
            orphans: Vec::new(),
            aborted,
        }
    }

    async fn sync_note(&self, note: Note, ctx: &RunContext<'_>) -> SyncOutcome {
        let _guard = self.locks.acquire(&note.id).await;
        let fingerprint = note.fingerprint();
        let prior = self.store.get(&note.id);

        if prior.as_ref().is_some_and(|r| r.is_synced(&fingerprint)) {
            log::debug!("{} unchanged ({})", note.id, fingerprint.short());
            return SyncOutcome::Unchanged { note_id: note.id };
        }

        let prepared = match prepare(&note, &self.config.prepare) {
            Ok(prepared) => prepared,
            Err(e) => {
                log::warn!("{} failed locally: {}", note.id, e);
                return SyncOutcome::failed(note.id, FailureStage::from(&e), e.to_string());
            }
        };
        log::debug!(
            "{}: {} blocks in {} chunks",
            note.id,
            prepared.block_count(),
            prepared.chunks.len()
        );

        let result = match prior.as_ref().and_then(|r| r.page_id.clone()) {
            Some(page_id) => {
                let record = prior.clone().unwrap_or_else(|| SyncRecord::new(note.id.clone()));
                self.update(record, page_id, &prepared).await
            }
            None => self.create(&note.id, prior, &prepared).await,
        };

        match result {
            Ok(outcome) => {
                log::info!("{}", outcome);
                outcome
            }
            Err(e) => {
                if let NoteError::Api(api) = &e {
                    if api.is_auth() {
                        let _ = ctx.abort.set(format!("{} ({})", api, note.id));
                    }
                }
                log::warn!("{} failed: {}", note.id, e);
                SyncOutcome::failed(note.id, e.stage(), e.to_string())
            }
        }
    }

    /// Replaces the content of an existing page.
    async fn update(
        &self,
        mut record: SyncRecord,
        page_id: PageId,
        prepared: &PreparedNote,
    ) -> Result<SyncOutcome, NoteError> {
        match self.writer.update_page(&page_id, &prepared.chunks).await {
            Ok(()) => {
                let note_id = record.note_id.clone();
                self.mark_synced(record, prepared).await?;
                Ok(SyncOutcome::Updated { note_id, page_id })
            }
            Err(e) if e.is_not_found() => {
                log::warn!(
                    "Page {} for {} is gone remotely, creating a new one",
                    page_id,
                    record.note_id
                );
                let note_id = record.note_id.clone();
                record.page_id = None;
                record.fingerprint = None;
                record.create_started_at = None;
                self.create(&note_id, Some(record), prepared).await
            }
            Err(e) => {
                // The old content may already be partly deleted.
                self.mark_failed(record, &e).await?;
                Err(e.into())
            }
        }
    }

    /// Creates the page for a note that has none, resuming or reconciling an
    /// earlier creation whose result never reached the store.
    async fn create(
        &self,
        note_id: &NoteId,
        prior: Option<SyncRecord>,
        prepared: &PreparedNote,
    ) -> Result<SyncOutcome, NoteError> {
        let parent = &self.config.parent_page;
        let mut record = prior
            .clone()
            .unwrap_or_else(|| SyncRecord::new(note_id.clone()));
        // Held until the new page id is stored, so a note sharing the title
        // never mistakes this page for its own.
        let _title_guard = self.title_locks.acquire(&prepared.title).await;

        if record.has_unconfirmed_create() {
            log::info!("{}: earlier creation unconfirmed, checking Notion", note_id);
            if let Some(found) = self.find_own_page(note_id, &prepared.title).await? {
                return self.adopt(record, found, prepared).await;
            }
        }

        record.create_started_at = Some(Utc::now());
        self.save(record.clone()).await?;

        let (first, rest) = match prepared.chunks.split_first() {
            Some((first, rest)) => (Some(first), rest),
            None => (None, &[][..]),
        };

        let mut attempts = 0;
        let page_id = loop {
            attempts += 1;
            match self.writer.create_page(parent, &prepared.title, first).await {
                Ok(page_id) => break page_id,
                Err(e) if e.is_ambiguous() => {
                    log::warn!(
                        "{}: create outcome unknown ({}), checking Notion",
                        note_id,
                        e
                    );
                    match self.find_own_page(note_id, &prepared.title).await? {
                        Some(found) => return self.adopt(record, found, prepared).await,
                        None if attempts < self.config.retry.max_attempts => continue,
                        // create_started_at stays set so the next run checks again.
                        None => return Err(e.into()),
                    }
                }
                Err(e) => {
                    // Nothing was created: back to the prior record, or a
                    // fresh one carrying the error.
                    let restored = prior.unwrap_or_else(|| SyncRecord {
                        create_started_at: None,
                        last_error: Some(e.to_string()),
                        ..record
                    });
                    self.save(restored).await?;
                    return Err(e.into());
                }
            }
        };

        record.page_id = Some(page_id.clone());
        record.create_started_at = None;
        self.save(record.clone()).await?;

        for chunk in rest {
            if let Err(e) = self.writer.append_chunk(&page_id, chunk).await {
                self.mark_failed(record, &e).await?;
                return Err(e.into());
            }
        }

        self.mark_synced(record, prepared).await?;
        Ok(SyncOutcome::Created {
            note_id: note_id.clone(),
            page_id,
        })
    }

    /// The existence check: a live page under the parent with this title
    /// that no other note's record already owns.
    async fn find_own_page(&self, note_id: &NoteId, title: &str) -> Result<Option<PageId>, ApiError> {
        let owned: HashSet<PageId> = self
            .store
            .records()
            .into_iter()
            .filter(|record| &record.note_id != note_id)
            .filter_map(|record| record.page_id)
            .collect();
        self.writer
            .find_child_page(&self.config.parent_page, title, &owned)
            .await
    }

    /// Takes over a page found by the existence check. Its content is
    /// unknown, so it is replaced wholesale.
    async fn adopt(
        &self,
        mut record: SyncRecord,
        page_id: PageId,
        prepared: &PreparedNote,
    ) -> Result<SyncOutcome, NoteError> {
        log::info!("{}: adopting existing page {}", record.note_id, page_id);
        record.page_id = Some(page_id.clone());
        record.create_started_at = None;
        self.save(record.clone()).await?;

        if let Err(e) = self.writer.update_page(&page_id, &prepared.chunks).await {
            self.mark_failed(record, &e).await?;
            return Err(e.into());
        }
        let note_id = record.note_id.clone();
        self.mark_synced(record, prepared).await?;
        Ok(SyncOutcome::Created { note_id, page_id })
    }

    /// Writes a record on the blocking pool; a put may rewrite and fsync the
    /// whole state file.
    async fn save(&self, record: SyncRecord) -> Result<(), StoreError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || store.put(record))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn mark_synced(&self, mut record: SyncRecord, prepared: &PreparedNote) -> Result<(), StoreError> {
        record.fingerprint = Some(prepared.fingerprint.clone());
        record.last_synced_at = Some(Utc::now());
        record.last_error = None;
        record.create_started_at = None;
        self.save(record).await
    }

    /// Keeps the page id but forgets the fingerprint, so the next run
    /// replaces the content whatever it is.
    async fn mark_failed(&self, mut record: SyncRecord, error: &ApiError) -> Result<(), StoreError> {
        record.fingerprint = None;
        record.last_error = Some(error.to_string());
        self.save(record).await
    }

    /// Reports records whose note is no longer present, and under
    /// [`DeletedNotePolicy::Archive`] archives their pages.
    pub async fn reconcile_deleted(
        &self,
        present: &HashSet<NoteId>,
        policy: DeletedNotePolicy,
    ) -> Vec<Orphan> {
        let mut orphans = Vec::new();
        for record in self.store.records() {
            if present.contains(&record.note_id) {
                continue;
            }
            let archived = match policy {
                DeletedNotePolicy::Keep => false,
                DeletedNotePolicy::Archive => self.archive(&record).await,
            };
            orphans.push(Orphan {
                note_id: record.note_id,
                page_id: record.page_id,
                archived,
            });
        }
        if !orphans.is_empty() {
            log::info!("{} notes were deleted locally ({:?})", orphans.len(), policy);
        }
        orphans
    }

    async fn archive(&self, record: &SyncRecord) -> bool {
        if let Some(page_id) = &record.page_id {
            match self.writer.archive_page(page_id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {
                    log::debug!("Page {} of {} already gone", page_id, record.note_id)
                }
                Err(e) => {
                    log::warn!("Could not archive page of {}: {}", record.note_id, e);
                    return false;
                }
            }
        }
        let store = Arc::clone(&self.store);
        let scope = ResetScope::Note(record.note_id.clone());
        let reset = tokio::task::spawn_blocking(move || store.reset(scope))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))
            .and_then(|result| result);
        match reset {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Could not drop the record of {}: {}", record.note_id, e);
                false
            }
        }
    }
}
