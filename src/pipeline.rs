// src/pipeline.rs
//! The local half of a sync: format → validate → chunk.
//!
//! Everything here is pure; nothing touches the network or the state store.
//! A note that comes out of [`prepare`] is safe to send.

use crate::chunking::{chunk, truncate_to_fit, Chunk, ChunkLimits};
use crate::contract::{validate, ContractRules, ContractViolation};
use crate::error::{ChunkOverflow, FormatError};
use crate::formatting::{format, FormatOptions};
use crate::model::{BlockNode, FormattedDocument, Note};
use crate::types::Fingerprint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do with a single block too large for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TruncationPolicy {
    /// Fail the note with a chunk overflow.
    #[default]
    Reject,
    /// Cut the block down and mark it truncated.
    Truncate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrepareSettings {
    pub format: FormatOptions,
    pub limits: ChunkLimits,
    pub truncation: TruncationPolicy,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    ChunkOverflow(#[from] ChunkOverflow),
}

/// A note ready to be written remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedNote {
    pub title: String,
    pub fingerprint: Fingerprint,
    pub chunks: Vec<Chunk>,
}

impl PreparedNote {
    pub fn block_count(&self) -> usize {
        self.chunks.iter().map(|c| c.blocks.len()).sum()
    }
}

pub fn prepare(note: &Note, settings: &PrepareSettings) -> Result<PreparedNote, PrepareError> {
    let mut document = format(note, &settings.format)?;
    validate(&document, &settings.format.rules)?;

    if settings.truncation == TruncationPolicy::Truncate {
        document = fit_to_limits(document, &settings.limits, &settings.format.rules);
        validate(&document, &settings.format.rules)?;
    }

    let chunks = chunk(document, &settings.limits);
    if let Some(oversized) = chunks.iter().find(|c| c.oversized) {
        let kind = oversized.blocks.first().map_or("unknown", BlockNode::kind);
        return Err(ChunkOverflow {
            chunk_index: oversized.index,
            kind,
            node_count: oversized.node_count,
            payload_bytes: oversized.payload_bytes,
            max_nodes: settings.limits.max_nodes,
            max_payload_bytes: settings.limits.max_payload_bytes,
        }
        .into());
    }

    Ok(PreparedNote {
        title: note.display_title(),
        fingerprint: note.fingerprint(),
        chunks,
    })
}

/// Shrinks every top-level block that could not travel in a request of its own.
fn fit_to_limits(
    document: FormattedDocument,
    limits: &ChunkLimits,
    rules: &ContractRules,
) -> FormattedDocument {
    let blocks = document
        .into_blocks()
        .into_iter()
        .map(|mut node| {
            while node.node_count() > limits.max_nodes {
                match node.children_mut() {
                    Some(children) if !children.is_empty() => {
                        children.pop();
                    }
                    _ => break,
                }
            }
            if node.serialized_len() + 2 > limits.max_payload_bytes {
                log::info!("Truncating {} block to fit the payload limit", node.kind());
                truncate_to_fit(node, limits.max_payload_bytes, rules.max_rich_text_runs)
            } else {
                node
            }
        })
        .collect();
    FormattedDocument::new(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NoteId;
    use chrono::Utc;

    fn note(text: &str) -> Note {
        Note::new(NoteId::new("daily/2026-02-16.md").unwrap(), text, Utc::now())
    }

    fn small_limits() -> PrepareSettings {
        PrepareSettings {
            limits: ChunkLimits {
                max_nodes: 100,
                max_payload_bytes: 1_000,
            },
            ..PrepareSettings::default()
        }
    }

    #[test]
    fn prepared_note_carries_title_and_fingerprint() {
        let prepared = prepare(&note("# Hi\n- a"), &PrepareSettings::default()).unwrap();
        assert_eq!(prepared.title, "2026-02-16");
        assert_eq!(prepared.fingerprint, Fingerprint::of(b"# Hi\n- a"));
        assert_eq!(prepared.block_count(), 2);
    }

    #[test]
    fn oversized_code_block_is_a_chunk_overflow() {
        let text = format!("```rust\n{}\n```", "x".repeat(3_000));
        let err = prepare(&note(&text), &small_limits()).unwrap_err();
        match err {
            PrepareError::ChunkOverflow(overflow) => {
                assert_eq!(overflow.kind, "code");
                assert!(overflow.payload_bytes > 1_000);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn truncation_policy_makes_it_fit() {
        let text = format!("```rust\n{}\n```", "x".repeat(3_000));
        let settings = PrepareSettings {
            truncation: TruncationPolicy::Truncate,
            ..small_limits()
        };
        let prepared = prepare(&note(&text), &settings).unwrap();
        assert_eq!(prepared.chunks.len(), 1);
        assert!(prepared.chunks[0].payload_bytes <= 1_000);
    }

    #[test]
    fn truncation_keeps_within_the_run_limit() {
        let mut settings = PrepareSettings {
            truncation: TruncationPolicy::Truncate,
            ..PrepareSettings::default()
        };
        settings.format.rules.max_text_run_chars = 300;
        settings.format.rules.max_rich_text_runs = 3;
        let text = "x".repeat(900);

        for max_payload_bytes in (1_000..=1_090).step_by(10) {
            settings.limits.max_payload_bytes = max_payload_bytes;
            let prepared = prepare(&note(&text), &settings).unwrap();
            let block = &prepared.chunks[0].blocks[0];
            assert!(block.rich_text().len() <= 3, "at {max_payload_bytes} bytes");
            assert!(prepared.chunks[0].payload_bytes <= max_payload_bytes);
        }
    }

    #[test]
    fn undecodable_notes_fail_formatting() {
        let bad = Note::new(NoteId::new("bad.md").unwrap(), vec![0xff, 0xfe], Utc::now());
        assert!(matches!(
            prepare(&bad, &PrepareSettings::default()),
            Err(PrepareError::Format(FormatError::InvalidEncoding { offset: 0 }))
        ));
    }
}
