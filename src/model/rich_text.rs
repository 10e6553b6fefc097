// src/model/rich_text.rs
//! Text runs: the inline unit of Notion content.

use crate::types::Color;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Inline styling of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: Color,
}

impl Annotations {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn italic() -> Self {
        Self {
            italic: true,
            ..Self::default()
        }
    }
}

/// A contiguous piece of text with one set of annotations and an optional link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextRun {
    pub content: String,
    #[serde(default, skip_serializing_if = "Annotations::is_plain")]
    pub annotations: Annotations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl TextRun {
    /// Create a plain text run
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            annotations: Annotations::default(),
            link: None,
        }
    }

    pub fn styled(content: impl Into<String>, annotations: Annotations) -> Self {
        Self {
            content: content.into(),
            annotations,
            link: None,
        }
    }

    pub fn linked(content: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            annotations: Annotations::default(),
            link: Some(url.into()),
        }
    }

    /// Content length in characters, the unit Notion limits are expressed in.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Same annotations and link, different content.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            annotations: self.annotations,
            link: self.link.clone(),
        }
    }

    /// Notion wire form of this run.
    pub fn to_notion_json(&self) -> Value {
        let link = match &self.link {
            Some(url) => json!({ "url": url }),
            None => Value::Null,
        };
        let mut value = json!({
            "type": "text",
            "text": { "content": self.content, "link": link },
        });
        if !self.annotations.is_plain() {
            value["annotations"] = json!({
                "bold": self.annotations.bold,
                "italic": self.annotations.italic,
                "strikethrough": self.annotations.strikethrough,
                "underline": self.annotations.underline,
                "code": self.annotations.code,
                "color": self.annotations.color.as_str(),
            });
        }
        value
    }
}

/// Concatenated plain text of a run sequence.
pub fn plain_text(runs: &[TextRun]) -> String {
    runs.iter().map(|run| run.content.as_str()).collect()
}

pub(crate) fn runs_to_notion_json(runs: &[TextRun]) -> Value {
    Value::Array(runs.iter().map(TextRun::to_notion_json).collect())
}
