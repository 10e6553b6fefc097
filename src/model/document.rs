// src/model/document.rs
use super::block::BlockNode;
use crate::types::{Fingerprint, NoteId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A locally captured note, as handed to the engine by a note source.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    /// Explicit page title; falls back to the id's file stem.
    pub title: Option<String>,
    pub raw: Vec<u8>,
    pub modified: DateTime<Utc>,
}

impl Note {
    pub fn new(id: NoteId, raw: impl Into<Vec<u8>>, modified: DateTime<Utc>) -> Self {
        Self {
            id,
            title: None,
            raw: raw.into(),
            modified,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.raw)
    }

    /// Title used for the remote page.
    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => self.id.file_stem().to_string(),
        }
    }
}

/// The full ordered block tree derived from one note.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormattedDocument {
    pub blocks: Vec<BlockNode>,
}

impl FormattedDocument {
    pub fn new(blocks: Vec<BlockNode>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every block in the tree, nested ones included.
    pub fn node_count(&self) -> usize {
        self.blocks.iter().map(BlockNode::node_count).sum()
    }

    /// Bytes of the wire JSON `children` array for the whole document.
    pub fn serialized_size(&self) -> usize {
        let commas = self.blocks.len().saturating_sub(1);
        2 + commas
            + self
                .blocks
                .iter()
                .map(BlockNode::serialized_len)
                .sum::<usize>()
    }

    pub fn into_blocks(self) -> Vec<BlockNode> {
        self.blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextRun;

    #[test]
    fn display_title_falls_back_to_file_stem() {
        let id = NoteId::new("inbox/standup.md").unwrap();
        let note = Note::new(id.clone(), "x", Utc::now());
        assert_eq!(note.display_title(), "standup");
        assert_eq!(note.with_title(" Daily ").display_title(), "Daily");
    }

    #[test]
    fn serialized_size_matches_the_wire_array() {
        let doc = FormattedDocument::new(vec![
            BlockNode::paragraph(vec![TextRun::plain("one")]),
            BlockNode::Divider,
        ]);
        let wire = serde_json::Value::Array(
            doc.blocks.iter().map(BlockNode::to_notion_json).collect(),
        );
        assert_eq!(doc.serialized_size(), wire.to_string().len());
        assert_eq!(doc.node_count(), 2);
    }
}
