// src/formatting/mod.rs
//! Converts a note's raw text into a Notion block tree.
//!
//! Formatting is line based. Each line is classified by its leading cue
//! (heading marks, list markers, to-do prefixes, quotes, fences, dividers,
//! standalone images), inline spans are parsed inside the text, and list
//! items are nested by indentation. Cues that do not parse degrade to
//! paragraph text, so the only failures are undecodable or oversized input.
//!
//! The output is deterministic for a given input and options.

mod builder;
mod inline;
mod lines;
mod split;

use crate::constants::DEFAULT_MAX_NOTE_BYTES;
use crate::contract::ContractRules;
use crate::error::FormatError;
use crate::model::{FormattedDocument, Note};
use builder::DocumentBuilder;

/// Limits the formatter shapes its output to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Hard ceiling on raw note size.
    pub max_note_bytes: usize,
    /// The same limits the contract validator enforces.
    pub rules: ContractRules,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            max_note_bytes: DEFAULT_MAX_NOTE_BYTES,
            rules: ContractRules::default(),
        }
    }
}

impl FormatOptions {
    pub fn with_rules(rules: ContractRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }
}

/// Formats a note into its block tree.
pub fn format(note: &Note, options: &FormatOptions) -> Result<FormattedDocument, FormatError> {
    if note.raw.len() > options.max_note_bytes {
        return Err(FormatError::TooLarge {
            size: note.raw.len(),
            limit: options.max_note_bytes,
        });
    }

    let text = std::str::from_utf8(&note.raw).map_err(|e| FormatError::InvalidEncoding {
        offset: e.valid_up_to(),
    })?;

    let document = format_text(text, options);
    log::debug!(
        "Formatted note {} into {} blocks ({} nodes)",
        note.id,
        document.blocks.len(),
        document.node_count()
    );
    Ok(document)
}

/// Formats already decoded text. The size ceiling is not applied here.
pub fn format_text(text: &str, options: &FormatOptions) -> FormattedDocument {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    FormattedDocument::new(DocumentBuilder::new(options.rules).build(text))
}
