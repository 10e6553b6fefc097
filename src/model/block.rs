// src/model/block.rs
use super::rich_text::{runs_to_notion_json, TextRun};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A typed unit of Notion content.
///
/// The set of kinds is closed: the contract validator enumerates every legal
/// shape, so adding a kind means adding its rules there too. Kinds that
/// Notion does not allow to nest (headings, code, divider, image) have no
/// `children` field at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum BlockNode {
    #[serde(rename = "paragraph")]
    Paragraph {
        rich_text: Vec<TextRun>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<BlockNode>,
    },
    #[serde(rename = "heading_1")]
    Heading1 { rich_text: Vec<TextRun> },
    #[serde(rename = "heading_2")]
    Heading2 { rich_text: Vec<TextRun> },
    #[serde(rename = "heading_3")]
    Heading3 { rich_text: Vec<TextRun> },
    #[serde(rename = "bulleted_list_item")]
    BulletedListItem {
        rich_text: Vec<TextRun>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<BlockNode>,
    },
    #[serde(rename = "numbered_list_item")]
    NumberedListItem {
        rich_text: Vec<TextRun>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<BlockNode>,
    },
    #[serde(rename = "to_do")]
    ToDo {
        rich_text: Vec<TextRun>,
        #[serde(default)]
        checked: bool,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<BlockNode>,
    },
    #[serde(rename = "quote")]
    Quote {
        rich_text: Vec<TextRun>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<BlockNode>,
    },
    #[serde(rename = "code")]
    Code {
        rich_text: Vec<TextRun>,
        language: String,
    },
    #[serde(rename = "divider")]
    Divider,
    #[serde(rename = "image")]
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        caption: Vec<TextRun>,
    },
}

const NO_CHILDREN: &[BlockNode] = &[];

impl BlockNode {
    pub fn paragraph(rich_text: Vec<TextRun>) -> Self {
        Self::Paragraph {
            rich_text,
            children: Vec::new(),
        }
    }

    pub fn heading(level: u8, rich_text: Vec<TextRun>) -> Self {
        match level {
            0 | 1 => Self::Heading1 { rich_text },
            2 => Self::Heading2 { rich_text },
            _ => Self::Heading3 { rich_text },
        }
    }

    pub fn bulleted(rich_text: Vec<TextRun>) -> Self {
        Self::BulletedListItem {
            rich_text,
            children: Vec::new(),
        }
    }

    pub fn numbered(rich_text: Vec<TextRun>) -> Self {
        Self::NumberedListItem {
            rich_text,
            children: Vec::new(),
        }
    }

    pub fn to_do(rich_text: Vec<TextRun>, checked: bool) -> Self {
        Self::ToDo {
            rich_text,
            checked,
            children: Vec::new(),
        }
    }

    pub fn quote(rich_text: Vec<TextRun>) -> Self {
        Self::Quote {
            rich_text,
            children: Vec::new(),
        }
    }

    pub fn code(language: impl Into<String>, rich_text: Vec<TextRun>) -> Self {
        Self::Code {
            rich_text,
            language: language.into(),
        }
    }

    /// Notion's name for this kind of block.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Paragraph { .. } => "paragraph",
            Self::Heading1 { .. } => "heading_1",
            Self::Heading2 { .. } => "heading_2",
            Self::Heading3 { .. } => "heading_3",
            Self::BulletedListItem { .. } => "bulleted_list_item",
            Self::NumberedListItem { .. } => "numbered_list_item",
            Self::ToDo { .. } => "to_do",
            Self::Quote { .. } => "quote",
            Self::Code { .. } => "code",
            Self::Divider => "divider",
            Self::Image { .. } => "image",
        }
    }

    /// The block's main text. Image captions are exposed separately.
    pub fn rich_text(&self) -> &[TextRun] {
        match self {
            Self::Paragraph { rich_text, .. }
            | Self::Heading1 { rich_text }
            | Self::Heading2 { rich_text }
            | Self::Heading3 { rich_text }
            | Self::BulletedListItem { rich_text, .. }
            | Self::NumberedListItem { rich_text, .. }
            | Self::ToDo { rich_text, .. }
            | Self::Quote { rich_text, .. }
            | Self::Code { rich_text, .. } => rich_text,
            Self::Divider | Self::Image { .. } => &[],
        }
    }

    pub fn rich_text_mut(&mut self) -> Option<&mut Vec<TextRun>> {
        match self {
            Self::Paragraph { rich_text, .. }
            | Self::Heading1 { rich_text }
            | Self::Heading2 { rich_text }
            | Self::Heading3 { rich_text }
            | Self::BulletedListItem { rich_text, .. }
            | Self::NumberedListItem { rich_text, .. }
            | Self::ToDo { rich_text, .. }
            | Self::Quote { rich_text, .. }
            | Self::Code { rich_text, .. } => Some(rich_text),
            Self::Image { caption, .. } => Some(caption),
            Self::Divider => None,
        }
    }

    pub fn children(&self) -> &[BlockNode] {
        match self {
            Self::Paragraph { children, .. }
            | Self::BulletedListItem { children, .. }
            | Self::NumberedListItem { children, .. }
            | Self::ToDo { children, .. }
            | Self::Quote { children, .. } => children,
            _ => NO_CHILDREN,
        }
    }

    /// Mutable children, or `None` for kinds that cannot nest.
    pub fn children_mut(&mut self) -> Option<&mut Vec<BlockNode>> {
        match self {
            Self::Paragraph { children, .. }
            | Self::BulletedListItem { children, .. }
            | Self::NumberedListItem { children, .. }
            | Self::ToDo { children, .. }
            | Self::Quote { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn can_have_children(&self) -> bool {
        matches!(
            self,
            Self::Paragraph { .. }
                | Self::BulletedListItem { .. }
                | Self::NumberedListItem { .. }
                | Self::ToDo { .. }
                | Self::Quote { .. }
        )
    }

    /// This node plus all of its descendants.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(BlockNode::node_count).sum::<usize>()
    }

    /// Levels of children beneath this node (0 for a leaf).
    pub fn depth(&self) -> usize {
        self.children()
            .iter()
            .map(|child| 1 + child.depth())
            .max()
            .unwrap_or(0)
    }

    /// Notion wire form, as sent in a `children` array.
    pub fn to_notion_json(&self) -> Value {
        let mut body = Map::new();
        match self {
            Self::Divider => {}
            Self::Image { url, caption } => {
                body.insert("type".into(), json!("external"));
                body.insert("external".into(), json!({ "url": url }));
                body.insert("caption".into(), runs_to_notion_json(caption));
            }
            Self::Code {
                rich_text,
                language,
            } => {
                body.insert("rich_text".into(), runs_to_notion_json(rich_text));
                body.insert("language".into(), json!(language));
            }
            other => {
                body.insert("rich_text".into(), runs_to_notion_json(other.rich_text()));
                if let Self::ToDo { checked, .. } = other {
                    body.insert("checked".into(), json!(checked));
                }
                let children = other.children();
                if !children.is_empty() {
                    body.insert(
                        "children".into(),
                        Value::Array(children.iter().map(BlockNode::to_notion_json).collect()),
                    );
                }
            }
        }

        let mut block = Map::new();
        block.insert("object".into(), json!("block"));
        block.insert("type".into(), json!(self.kind()));
        block.insert(self.kind().into(), Value::Object(body));
        Value::Object(block)
    }

    /// Size in bytes of the compact wire JSON.
    pub fn serialized_len(&self) -> usize {
        self.to_notion_json().to_string().len()
    }
}
