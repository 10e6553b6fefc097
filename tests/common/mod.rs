// tests/common/mod.rs
//! Shared fixtures: an in-memory Notion and note builders.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use notes2notion::error::NotionErrorCode;
use notes2notion::{
    ApiError, BlockNode, Chunk, MemoryStateStore, Note, NoteId, NotionWriter, PageId, SyncConfig,
    SyncEngine,
};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

pub const PARENT: &str = "59833787-2cf9-4fdf-8782-e53db20768a5";

pub fn parent() -> PageId {
    PageId::parse(PARENT).unwrap()
}

pub fn note(id: &str, text: &str) -> Note {
    Note::new(NoteId::new(id).unwrap(), text, Utc::now())
}

pub fn note_id(id: &str) -> NoteId {
    NoteId::new(id).unwrap()
}

pub fn config() -> SyncConfig {
    let mut config = SyncConfig::new(parent());
    config.concurrency = 4;
    config
}

pub fn engine(
    fake: &Arc<FakeNotion>,
    store: &Arc<MemoryStateStore>,
    config: SyncConfig,
) -> SyncEngine {
    SyncEngine::new(config, fake.clone(), store.clone())
}

pub fn not_found() -> ApiError {
    ApiError::Notion {
        code: NotionErrorCode::ObjectNotFound,
        status: 404,
        message: "Could not find block".to_string(),
    }
}

pub fn unauthorized() -> ApiError {
    ApiError::Notion {
        code: NotionErrorCode::Unauthorized,
        status: 401,
        message: "API token is invalid.".to_string(),
    }
}

pub fn ambiguous() -> ApiError {
    ApiError::Ambiguous {
        message: "operation timed out".to_string(),
    }
}

pub fn transient() -> ApiError {
    ApiError::Transient {
        status: Some(503),
        message: "service unavailable".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Append,
    Update,
    Find,
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { title: String, blocks: usize },
    Append { page_id: PageId, blocks: usize },
    Update { page_id: PageId, chunks: usize },
    Find { title: String },
    Archive { page_id: PageId },
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Create { .. } => Op::Create,
            Call::Append { .. } => Op::Append,
            Call::Update { .. } => Op::Update,
            Call::Find { .. } => Op::Find,
            Call::Archive { .. } => Op::Archive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakePage {
    pub parent: PageId,
    pub title: String,
    pub blocks: Vec<BlockNode>,
    pub archived: bool,
}

struct Failure {
    op: Op,
    error: ApiError,
    /// The write happens before the error is returned, like a lost response.
    applied: bool,
}

#[derive(Default)]
struct FakeState {
    pages: IndexMap<PageId, FakePage>,
    calls: Vec<Call>,
    failures: VecDeque<Failure>,
}

/// Records every call and keeps pages in memory. Injected failures are
/// consumed in order by the first matching operation.
#[derive(Default)]
pub struct FakeNotion {
    state: Mutex<FakeState>,
}

impl FakeNotion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, op: Op, error: ApiError) {
        self.push_failure(op, error, false);
    }

    /// The operation takes effect, then reports `error`.
    pub fn fail_next_after_applying(&self, op: Op, error: ApiError) {
        self.push_failure(op, error, true);
    }

    fn push_failure(&self, op: Op, error: ApiError, applied: bool) {
        self.state
            .lock()
            .failures
            .push_back(Failure { op, error, applied });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn count(&self, op: Op) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn pages(&self) -> Vec<(PageId, FakePage)> {
        self.state
            .lock()
            .pages
            .iter()
            .map(|(id, page)| (id.clone(), page.clone()))
            .collect()
    }

    pub fn live_pages(&self) -> Vec<FakePage> {
        self.pages()
            .into_iter()
            .map(|(_, page)| page)
            .filter(|page| !page.archived)
            .collect()
    }

    pub fn page(&self, page_id: &PageId) -> Option<FakePage> {
        self.state.lock().pages.get(page_id).cloned()
    }

    /// Deletes a page behind the engine's back.
    pub fn remove_page(&self, page_id: &PageId) {
        self.state.lock().pages.shift_remove(page_id);
    }

    /// Takes the first injected failure for `op`, if any.
    fn take_failure(state: &mut FakeState, op: Op) -> Option<Failure> {
        let position = state.failures.iter().position(|f| f.op == op)?;
        state.failures.remove(position)
    }
}

fn live<'a>(state: &'a mut FakeState, page_id: &PageId) -> Result<&'a mut FakePage, ApiError> {
    state
        .pages
        .get_mut(page_id)
        .filter(|page| !page.archived)
        .ok_or_else(not_found)
}

#[async_trait]
impl NotionWriter for FakeNotion {
    async fn create_page(
        &self,
        parent: &PageId,
        title: &str,
        initial: Option<&Chunk>,
    ) -> Result<PageId, ApiError> {
        let mut state = self.state.lock();
        let blocks = initial.map(|c| c.blocks.clone()).unwrap_or_default();
        state.calls.push(Call::Create {
            title: title.to_string(),
            blocks: blocks.len(),
        });
        let failure = Self::take_failure(&mut state, Op::Create);
        if let Some(Failure { applied: false, error, .. }) = failure {
            return Err(error);
        }

        let page_id = PageId::new_v4();
        state.pages.insert(
            page_id.clone(),
            FakePage {
                parent: parent.clone(),
                title: title.to_string(),
                blocks,
                archived: false,
            },
        );
        match failure {
            Some(Failure { error, .. }) => Err(error),
            None => Ok(page_id),
        }
    }

    async fn append_chunk(&self, page_id: &PageId, chunk: &Chunk) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Append {
            page_id: page_id.clone(),
            blocks: chunk.blocks.len(),
        });
        let failure = Self::take_failure(&mut state, Op::Append);
        if let Some(Failure { applied: false, error, .. }) = failure {
            return Err(error);
        }
        live(&mut state, page_id)?
            .blocks
            .extend(chunk.blocks.iter().cloned());
        match failure {
            Some(Failure { error, .. }) => Err(error),
            None => Ok(()),
        }
    }

    async fn update_page(&self, page_id: &PageId, chunks: &[Chunk]) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Update {
            page_id: page_id.clone(),
            chunks: chunks.len(),
        });
        let failure = Self::take_failure(&mut state, Op::Update);
        if let Some(Failure { applied: false, error, .. }) = failure {
            return Err(error);
        }
        let page = live(&mut state, page_id)?;
        page.blocks = chunks.iter().flat_map(|c| c.blocks.iter().cloned()).collect();
        match failure {
            Some(Failure { error, .. }) => Err(error),
            None => Ok(()),
        }
    }

    async fn find_child_page(
        &self,
        parent: &PageId,
        title: &str,
        skip: &HashSet<PageId>,
    ) -> Result<Option<PageId>, ApiError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Find {
            title: title.to_string(),
        });
        if let Some(failure) = Self::take_failure(&mut state, Op::Find) {
            return Err(failure.error);
        }
        Ok(state
            .pages
            .iter()
            .find(|(id, page)| {
                !page.archived && &page.parent == parent && page.title == title && !skip.contains(*id)
            })
            .map(|(id, _)| id.clone()))
    }

    async fn archive_page(&self, page_id: &PageId) -> Result<(), ApiError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Archive {
            page_id: page_id.clone(),
        });
        if let Some(failure) = Self::take_failure(&mut state, Op::Archive) {
            return Err(failure.error);
        }
        live(&mut state, page_id)?.archived = true;
        Ok(())
    }
}
