// src/api/pagination.rs
//! Cursor pagination over list endpoints.

use super::responses::PaginatedResponse;
use crate::constants::NOTION_API_PAGE_SIZE;
use crate::error::ApiError;
use std::future::Future;

/// Collects every item of a paginated listing, following `next_cursor`
/// until `has_more` is false.
pub async fn fetch_all_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(usize, Option<String>) -> Fut,
    Fut: Future<Output = Result<PaginatedResponse<T>, ApiError>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut pages_fetched = 0u32;

    loop {
        let response = fetch_page(NOTION_API_PAGE_SIZE, cursor).await?;
        pages_fetched += 1;

        let has_more = response.has_more;
        cursor = response.next_cursor;
        items.extend(response.results);

        if !has_more || cursor.is_none() {
            break;
        }
    }

    log::debug!("Fetched {} items over {} pages", items.len(), pages_fetched);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn follows_cursors_until_exhausted() {
        let items = fetch_all_pages(|_, cursor| async move {
            Ok(match cursor.as_deref() {
                None => PaginatedResponse {
                    results: vec![1, 2],
                    next_cursor: Some("c1".to_string()),
                    has_more: true,
                },
                Some("c1") => PaginatedResponse {
                    results: vec![3],
                    next_cursor: None,
                    has_more: false,
                },
                Some(other) => panic!("unexpected cursor {other}"),
            })
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3]);
    }
}
