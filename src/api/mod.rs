// src/api/mod.rs
//! Notion API interaction: the writes the sync engine needs and nothing more.
//!
//! The engine depends on [`NotionWriter`], never on HTTP details, so tests
//! can drive it with an in-memory fake.

pub mod client;
mod page_writer;
mod pagination;
mod responses;

use crate::chunking::Chunk;
use crate::error::ApiError;
use crate::types::PageId;
use std::collections::HashSet;

pub use client::NotionHttpClient;
pub use page_writer::NotionPageWriter;

/// The ability to write pages under a parent in a Notion workspace.
#[async_trait::async_trait]
pub trait NotionWriter: Send + Sync {
    /// Creates a sub-page of `parent` holding the blocks of `initial`.
    /// An ambiguous failure is returned as-is, never retried.
    async fn create_page(
        &self,
        parent: &PageId,
        title: &str,
        initial: Option<&Chunk>,
    ) -> Result<PageId, ApiError>;

    async fn append_chunk(&self, page_id: &PageId, chunk: &Chunk) -> Result<(), ApiError>;

    /// Replaces the page's content: existing children are deleted, then the
    /// chunks are appended in order.
    async fn update_page(&self, page_id: &PageId, chunks: &[Chunk]) -> Result<(), ApiError>;

    /// A live sub-page of `parent` with exactly this title, ignoring the
    /// pages in `skip`.
    async fn find_child_page(
        &self,
        parent: &PageId,
        title: &str,
        skip: &HashSet<PageId>,
    ) -> Result<Option<PageId>, ApiError>;

    async fn archive_page(&self, page_id: &PageId) -> Result<(), ApiError>;
}
