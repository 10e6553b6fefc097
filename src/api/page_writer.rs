// src/api/page_writer.rs
//! [`NotionWriter`] over HTTP, with retries.

use super::client::NotionHttpClient;
use super::pagination::fetch_all_pages;
use super::responses::{ChildBlock, CreatedPage, PaginatedResponse};
use super::NotionWriter;
use crate::chunking::Chunk;
use crate::error::ApiError;
use crate::error_recovery::{retry_with_backoff, Replay, RetryPolicy, Sleeper, TokioSleeper};
use crate::types::PageId;
use async_trait::async_trait;
use futures::FutureExt;
use serde::de::IgnoredAny;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Writes pages under a parent through the public Notion API.
#[derive(Clone)]
pub struct NotionPageWriter {
    http: NotionHttpClient,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl NotionPageWriter {
    pub fn new(http: NotionHttpClient, retry: RetryPolicy) -> Self {
        Self {
            http,
            retry,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    async fn list_children(&self, block_id: &PageId) -> Result<Vec<ChildBlock>, ApiError> {
        let endpoint = format!("blocks/{}/children", block_id.to_dashed());
        fetch_all_pages(|page_size, cursor| {
            let endpoint = endpoint.clone();
            async move {
                let mut query = vec![("page_size", page_size.to_string())];
                if let Some(cursor) = cursor {
                    query.push(("start_cursor", cursor));
                }
                retry_with_backoff(
                    &self.retry,
                    self.sleeper.as_ref(),
                    "list children",
                    Replay::Safe,
                    || self.http.get::<PaginatedResponse<ChildBlock>>(&endpoint, &query),
                )
                .await
            }
        })
        .await
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), ApiError> {
        let endpoint = format!("blocks/{}", block_id);
        retry_with_backoff(
            &self.retry,
            self.sleeper.as_ref(),
            "delete block",
            Replay::Unsafe,
            || self.http.delete::<IgnoredAny>(&endpoint),
        )
        .await?;
        Ok(())
    }
}

fn title_property(title: &str) -> Value {
    json!({
        "title": {
            "title": [{ "type": "text", "text": { "content": title } }]
        }
    })
}

#[async_trait]
impl NotionWriter for NotionPageWriter {
    async fn create_page(
        &self,
        parent: &PageId,
        title: &str,
        initial: Option<&Chunk>,
    ) -> Result<PageId, ApiError> {
        let mut body = json!({
            "parent": { "page_id": parent.to_dashed() },
            "properties": title_property(title),
        });
        if let Some(chunk) = initial {
            body["children"] = chunk.to_notion_json();
        }

        let created: CreatedPage = retry_with_backoff(
            &self.retry,
            self.sleeper.as_ref(),
            "create page",
            Replay::Unsafe,
            || {
                self.http
                    .post::<_, CreatedPage>("pages", &body)
                    .map(|result| result.map_err(ApiError::into_unconfirmed_write))
            },
        )
        .await?;

        let page_id = PageId::parse(&created.id)
            .map_err(|e| ApiError::MalformedResponse(format!("created page id: {}", e)))?;
        log::info!("Created page '{}' ({})", title, page_id);
        Ok(page_id)
    }

    async fn append_chunk(&self, page_id: &PageId, chunk: &Chunk) -> Result<(), ApiError> {
        let endpoint = format!("blocks/{}/children", page_id.to_dashed());
        let body = json!({ "children": chunk.to_notion_json() });
        retry_with_backoff(
            &self.retry,
            self.sleeper.as_ref(),
            "append chunk",
            Replay::Unsafe,
            || {
                self.http
                    .patch::<_, IgnoredAny>(&endpoint, &body)
                    .map(|result| result.map_err(ApiError::into_unconfirmed_write))
            },
        )
        .await?;
        log::debug!(
            "Appended chunk {} ({} blocks) to {}",
            chunk.index,
            chunk.blocks.len(),
            page_id
        );
        Ok(())
    }

    async fn update_page(&self, page_id: &PageId, chunks: &[Chunk]) -> Result<(), ApiError> {
        let existing = self.list_children(page_id).await?;
        log::debug!(
            "Replacing {} existing blocks on {} with {} chunks",
            existing.len(),
            page_id,
            chunks.len()
        );
        for child in existing.iter().filter(|child| !child.archived) {
            self.delete_block(&child.id).await?;
        }
        for chunk in chunks {
            self.append_chunk(page_id, chunk).await?;
        }
        Ok(())
    }

    async fn find_child_page(
        &self,
        parent: &PageId,
        title: &str,
        skip: &HashSet<PageId>,
    ) -> Result<Option<PageId>, ApiError> {
        let children = self.list_children(parent).await?;
        for child in children
            .iter()
            .filter(|child| !child.archived && child.page_title() == Some(title))
        {
            let page_id = PageId::parse(&child.id)
                .map_err(|e| ApiError::MalformedResponse(format!("child page id: {}", e)))?;
            if !skip.contains(&page_id) {
                return Ok(Some(page_id));
            }
        }
        Ok(None)
    }

    async fn archive_page(&self, page_id: &PageId) -> Result<(), ApiError> {
        let endpoint = format!("pages/{}", page_id.to_dashed());
        let body = json!({ "archived": true });
        retry_with_backoff(
            &self.retry,
            self.sleeper.as_ref(),
            "archive page",
            Replay::Unsafe,
            || self.http.patch::<_, IgnoredAny>(&endpoint, &body),
        )
        .await?;
        log::info!("Archived page {}", page_id);
        Ok(())
    }
}
