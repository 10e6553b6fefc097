// src/api/responses.rs
//! Shapes of the Notion responses the writer reads. Only the fields in use
//! are declared; everything else in a response is ignored.

use serde::Deserialize;

/// Error body Notion returns with any non-2xx status.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Generic paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// A child block as listed under a page.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildBlock {
    pub id: String,
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default)]
    pub child_page: Option<ChildPage>,
    #[serde(default)]
    pub archived: bool,
}

impl ChildBlock {
    /// Title of the block when it is a sub-page.
    pub fn page_title(&self) -> Option<&str> {
        match (&self.child_page, self.block_type.as_str()) {
            (Some(page), "child_page") => Some(page.title.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChildPage {
    #[serde(default)]
    pub title: String,
}

/// The part of a page object needed after creation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPage {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_page_titles() {
        let json = r#"{
            "object": "list",
            "results": [
                {"object":"block","id":"a","type":"child_page","child_page":{"title":"Standup"}},
                {"object":"block","id":"b","type":"paragraph","paragraph":{"rich_text":[]}}
            ],
            "next_cursor": null,
            "has_more": false
        }"#;
        let list: PaginatedResponse<ChildBlock> = serde_json::from_str(json).unwrap();
        assert_eq!(list.results[0].page_title(), Some("Standup"));
        assert_eq!(list.results[1].page_title(), None);
        assert!(!list.has_more);
    }
}
