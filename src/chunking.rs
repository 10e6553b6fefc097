// src/chunking.rs
//! Splits a formatted document into request-sized chunks.
//!
//! Chunking works on top-level nodes only, so a nested list always travels
//! with its parent. The sizes used here are those of the Notion wire JSON
//! `children` array each chunk becomes.

use crate::constants::{DEFAULT_MAX_NODES_PER_REQUEST, DEFAULT_MAX_PAYLOAD_BYTES, TRUNCATION_MARKER};
use crate::model::{Annotations, BlockNode, FormattedDocument, TextRun};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkLimits {
    /// Nodes per request, nested ones included.
    pub max_nodes: usize,
    /// Bytes of the serialized `children` array per request.
    pub max_payload_bytes: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES_PER_REQUEST,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

/// An ordered run of top-level nodes sent in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub blocks: Vec<BlockNode>,
    pub node_count: usize,
    pub payload_bytes: usize,
    /// A single node that does not fit the limits on its own.
    pub oversized: bool,
}

impl Chunk {
    fn new(index: usize) -> Self {
        Self {
            index,
            blocks: Vec::new(),
            node_count: 0,
            payload_bytes: 2,
            oversized: false,
        }
    }

    fn push(&mut self, node: BlockNode, nodes: usize, bytes: usize) {
        if !self.blocks.is_empty() {
            self.payload_bytes += 1;
        }
        self.payload_bytes += bytes;
        self.node_count += nodes;
        self.blocks.push(node);
    }

    /// Size of the array if `bytes` more were appended.
    fn size_with(&self, bytes: usize) -> usize {
        let comma = usize::from(!self.blocks.is_empty());
        self.payload_bytes + comma + bytes
    }

    /// The `children` array as sent to Notion.
    pub fn to_notion_json(&self) -> serde_json::Value {
        serde_json::Value::Array(self.blocks.iter().map(BlockNode::to_notion_json).collect())
    }
}

/// Greedily packs top-level nodes into chunks, in document order.
///
/// A node that exceeds either limit by itself is emitted alone and flagged
/// `oversized`; nothing is ever truncated here.
pub fn chunk(document: FormattedDocument, limits: &ChunkLimits) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = Chunk::new(0);

    for node in document.into_blocks() {
        let nodes = node.node_count();
        let bytes = node.serialized_len();
        let fits_alone = nodes <= limits.max_nodes && bytes + 2 <= limits.max_payload_bytes;

        let overflows = current.node_count + nodes > limits.max_nodes
            || current.size_with(bytes) > limits.max_payload_bytes;
        if !current.blocks.is_empty() && (overflows || !fits_alone) {
            let next = Chunk::new(current.index + 1);
            chunks.push(std::mem::replace(&mut current, next));
        }

        current.push(node, nodes, bytes);
        if !fits_alone {
            log::warn!(
                "Block of {} nodes / {} bytes exceeds chunk limits ({} nodes / {} bytes)",
                nodes,
                bytes,
                limits.max_nodes,
                limits.max_payload_bytes
            );
            current.oversized = true;
            let next = Chunk::new(current.index + 1);
            chunks.push(std::mem::replace(&mut current, next));
        }
    }

    if !current.blocks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Shrinks a node until its wire form fits in `max_payload_bytes`: trailing
/// children go first, then trailing text, which is replaced by a truncation
/// marker. The marker never pushes the node past `max_runs` text runs.
/// Returns the node as small as it can get, which may still not fit.
pub fn truncate_to_fit(mut node: BlockNode, max_payload_bytes: usize, max_runs: usize) -> BlockNode {
    let marker = TextRun::styled(TRUNCATION_MARKER, Annotations::italic());
    let marker_bytes = marker.to_notion_json().to_string().len() + 1;

    loop {
        let size = node.serialized_len() + 2;
        if size <= max_payload_bytes {
            break;
        }
        if let Some(children) = node.children_mut() {
            if children.pop().is_some() {
                continue;
            }
        }
        let Some(runs) = node.rich_text_mut() else {
            break;
        };
        if runs.last() == Some(&marker) {
            runs.pop();
        }
        if runs.is_empty() {
            runs.push(marker);
            break;
        }

        let mut excess = size - max_payload_bytes + marker_bytes;
        while excess > 0 {
            let Some(last) = runs.last_mut() else {
                break;
            };
            let len = last.content.len();
            if len <= excess {
                excess -= len;
                runs.pop();
                continue;
            }
            let mut cut = len - excess;
            while !last.content.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                runs.pop();
            } else {
                last.content.truncate(cut);
            }
            excess = 0;
        }
        while runs.len() >= max_runs.max(1) {
            runs.pop();
        }
        runs.push(marker.clone());
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::plain_text;

    fn para(text: &str) -> BlockNode {
        BlockNode::paragraph(vec![TextRun::plain(text)])
    }

    #[test]
    fn respects_node_limit() {
        let doc = FormattedDocument::new((0..5).map(|i| para(&i.to_string())).collect());
        let limits = ChunkLimits {
            max_nodes: 2,
            ..ChunkLimits::default()
        };
        let chunks = chunk(doc, &limits);
        let sizes: Vec<_> = chunks.iter().map(|c| c.blocks.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(chunks.iter().map(|c| c.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn nested_nodes_count_toward_the_limit() {
        let mut parent = BlockNode::bulleted(vec![TextRun::plain("p")]);
        parent.children_mut().unwrap().push(para("c"));
        let doc = FormattedDocument::new(vec![para("a"), parent, para("b")]);
        let limits = ChunkLimits {
            max_nodes: 3,
            ..ChunkLimits::default()
        };
        let chunks = chunk(doc, &limits);
        assert_eq!(chunks[0].node_count, 3);
        assert_eq!(chunks[1].node_count, 1);
    }

    #[test]
    fn payload_bytes_match_the_wire_array() {
        let doc = FormattedDocument::new(vec![para("one"), para("two"), BlockNode::Divider]);
        let chunks = chunk(doc, &ChunkLimits::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].payload_bytes, chunks[0].to_notion_json().to_string().len());
    }

    #[test]
    fn oversized_node_is_isolated_and_flagged() {
        let big = para(&"x".repeat(400));
        let doc = FormattedDocument::new(vec![para("a"), big.clone(), para("b")]);
        let limits = ChunkLimits {
            max_nodes: 100,
            max_payload_bytes: 300,
        };
        let chunks = chunk(doc, &limits);
        assert_eq!(chunks.len(), 3);
        assert!(!chunks[0].oversized);
        assert!(chunks[1].oversized);
        assert_eq!(chunks[1].blocks, vec![big]);
        assert!(!chunks[2].oversized);
    }

    #[test]
    fn empty_document_has_no_chunks() {
        assert!(chunk(FormattedDocument::default(), &ChunkLimits::default()).is_empty());
    }

    #[test]
    fn truncation_drops_children_then_text() {
        let mut item = BlockNode::bulleted(vec![TextRun::plain("head ".repeat(100))]);
        item.children_mut().unwrap().push(para("child"));

        let truncated = truncate_to_fit(item, 300, 100);
        assert!(truncated.children().is_empty());
        assert!(truncated.serialized_len() + 2 <= 300);
        assert!(plain_text(truncated.rich_text()).ends_with(TRUNCATION_MARKER));
        assert!(truncated.rich_text().iter().all(|run| !run.content.is_empty()));
    }

    #[test]
    fn truncation_marker_respects_the_run_limit() {
        let runs = (0..3).map(|_| TextRun::plain("x".repeat(300))).collect();
        let truncated = truncate_to_fit(BlockNode::paragraph(runs), 1_000, 3);

        assert!(truncated.rich_text().len() <= 3);
        assert!(truncated.serialized_len() + 2 <= 1_000);
        assert_eq!(truncated.rich_text().last().unwrap().content, TRUNCATION_MARKER);
    }

    #[test]
    fn fitting_nodes_are_left_alone() {
        let node = para("short");
        assert_eq!(truncate_to_fit(node.clone(), 10_000, 100), node);
    }
}
