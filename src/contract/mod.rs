// src/contract/mod.rs
//! The output contract: which block trees are legal to send to Notion.
//!
//! Validation is a pure check over a [`FormattedDocument`]. It never repairs
//! anything; the first broken rule is reported together with the path of the
//! offending node so the formatter bug behind it can be found.

pub mod languages;

use crate::constants::{
    DEFAULT_MAX_NESTING_DEPTH, DEFAULT_MAX_RICH_TEXT_RUNS, DEFAULT_MAX_TEXT_RUN_CHARS,
};
use crate::model::{BlockNode, FormattedDocument, TextRun};
use crate::types::ValidatedUrl;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tunable limits of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractRules {
    /// Child levels allowed beneath a top-level block.
    pub max_nesting_depth: usize,
    /// Longest allowed text run, in characters.
    pub max_text_run_chars: usize,
    /// Most runs allowed in one `rich_text` (or caption) array.
    pub max_rich_text_runs: usize,
}

impl Default for ContractRules {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_text_run_chars: DEFAULT_MAX_TEXT_RUN_CHARS,
            max_rich_text_runs: DEFAULT_MAX_RICH_TEXT_RUNS,
        }
    }
}

/// Location of a node or run inside a document, e.g. `[3].children[1].rich_text[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodePath(String);

impl NodePath {
    fn root(index: usize) -> Self {
        Self(format!("[{}]", index))
    }

    fn child(&self, index: usize) -> Self {
        Self(format!("{}.children[{}]", self.0, index))
    }

    fn field(&self, field: &str, index: usize) -> Self {
        Self(format!("{}.{}[{}]", self.0, field, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<document>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// The specific rule a node broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractRule {
    /// The tree could not be read as known block kinds with known attributes.
    Malformed { reason: String },
    EmptyTextRun,
    TextRunTooLong { chars: usize, max: usize },
    TooManyRuns { runs: usize, max: usize },
    MissingText { kind: &'static str },
    UnknownLanguage { language: String },
    InvalidUrl { url: String },
    NestingTooDeep { depth: usize, max: usize },
}

impl fmt::Display for ContractRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { reason } => write!(f, "malformed block tree: {}", reason),
            Self::EmptyTextRun => write!(f, "text run has empty content"),
            Self::TextRunTooLong { chars, max } => {
                write!(f, "text run is {} chars, limit is {}", chars, max)
            }
            Self::TooManyRuns { runs, max } => {
                write!(f, "{} text runs in one block, limit is {}", runs, max)
            }
            Self::MissingText { kind } => write!(f, "{} block has no text", kind),
            Self::UnknownLanguage { language } => {
                write!(f, "code language '{}' is not supported by Notion", language)
            }
            Self::InvalidUrl { url } => write!(f, "'{}' is not an http(s) URL", url),
            Self::NestingTooDeep { depth, max } => {
                write!(f, "nested {} levels deep, limit is {}", depth, max)
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("contract violation at {path}: {rule}")]
pub struct ContractViolation {
    pub path: NodePath,
    pub rule: ContractRule,
}

impl ContractViolation {
    fn at(path: &NodePath, rule: ContractRule) -> Self {
        Self {
            path: path.clone(),
            rule,
        }
    }
}

/// Checks a document against the contract.
pub fn validate(document: &FormattedDocument, rules: &ContractRules) -> Result<(), ContractViolation> {
    for (index, node) in document.blocks.iter().enumerate() {
        validate_node(node, &NodePath::root(index), 0, rules)?;
    }
    Ok(())
}

/// Reads a document from its serde form and validates it. Unknown block kinds
/// and unknown attributes are violations, not silently dropped fields.
pub fn parse_and_validate(
    json: &str,
    rules: &ContractRules,
) -> Result<FormattedDocument, ContractViolation> {
    let document: FormattedDocument =
        serde_json::from_str(json).map_err(|e| ContractViolation {
            path: NodePath::default(),
            rule: ContractRule::Malformed {
                reason: e.to_string(),
            },
        })?;
    validate(&document, rules)?;
    Ok(document)
}

fn validate_node(
    node: &BlockNode,
    path: &NodePath,
    depth: usize,
    rules: &ContractRules,
) -> Result<(), ContractViolation> {
    if depth > rules.max_nesting_depth {
        return Err(ContractViolation::at(
            path,
            ContractRule::NestingTooDeep {
                depth,
                max: rules.max_nesting_depth,
            },
        ));
    }

    match node {
        BlockNode::Divider => {}
        BlockNode::Image { url, caption } => {
            check_url(url, path)?;
            check_runs(caption, "caption", path, rules)?;
        }
        BlockNode::Code {
            rich_text,
            language,
        } => {
            if !languages::is_known_language(language) {
                return Err(ContractViolation::at(
                    path,
                    ContractRule::UnknownLanguage {
                        language: language.clone(),
                    },
                ));
            }
            require_text(node, rich_text, path)?;
            check_runs(rich_text, "rich_text", path, rules)?;
        }
        BlockNode::Paragraph { rich_text, children } if rich_text.is_empty() => {
            if children.is_empty() {
                return Err(ContractViolation::at(
                    path,
                    ContractRule::MissingText { kind: node.kind() },
                ));
            }
        }
        _ => {
            let rich_text = node.rich_text();
            require_text(node, rich_text, path)?;
            check_runs(rich_text, "rich_text", path, rules)?;
        }
    }

    for (index, child) in node.children().iter().enumerate() {
        validate_node(child, &path.child(index), depth + 1, rules)?;
    }
    Ok(())
}

fn require_text(
    node: &BlockNode,
    rich_text: &[TextRun],
    path: &NodePath,
) -> Result<(), ContractViolation> {
    if rich_text.is_empty() {
        return Err(ContractViolation::at(
            path,
            ContractRule::MissingText { kind: node.kind() },
        ));
    }
    Ok(())
}

fn check_runs(
    runs: &[TextRun],
    field: &str,
    path: &NodePath,
    rules: &ContractRules,
) -> Result<(), ContractViolation> {
    if runs.len() > rules.max_rich_text_runs {
        return Err(ContractViolation::at(
            path,
            ContractRule::TooManyRuns {
                runs: runs.len(),
                max: rules.max_rich_text_runs,
            },
        ));
    }

    for (index, run) in runs.iter().enumerate() {
        let run_path = path.field(field, index);
        if run.content.is_empty() {
            return Err(ContractViolation::at(&run_path, ContractRule::EmptyTextRun));
        }
        let chars = run.char_len();
        if chars > rules.max_text_run_chars {
            return Err(ContractViolation::at(
                &run_path,
                ContractRule::TextRunTooLong {
                    chars,
                    max: rules.max_text_run_chars,
                },
            ));
        }
        if let Some(url) = &run.link {
            check_url(url, &run_path)?;
        }
    }
    Ok(())
}

fn check_url(url: &str, path: &NodePath) -> Result<(), ContractViolation> {
    ValidatedUrl::parse(url).map(|_| ()).map_err(|_| {
        ContractViolation::at(path, ContractRule::InvalidUrl { url: url.to_string() })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(blocks: Vec<BlockNode>) -> FormattedDocument {
        FormattedDocument::new(blocks)
    }

    #[test]
    fn empty_document_is_valid() {
        assert!(validate(&FormattedDocument::default(), &ContractRules::default()).is_ok());
    }

    #[test]
    fn violation_reports_the_run_path() {
        let mut parent = BlockNode::bulleted(vec![TextRun::plain("ok")]);
        parent
            .children_mut()
            .unwrap()
            .push(BlockNode::bulleted(vec![TextRun::plain("fine"), TextRun::plain("")]));

        let err = validate(&doc(vec![BlockNode::Divider, parent]), &ContractRules::default())
            .unwrap_err();
        assert_eq!(err.path.as_str(), "[1].children[0].rich_text[1]");
        assert_eq!(err.rule, ContractRule::EmptyTextRun);
    }

    #[test]
    fn nesting_limit_is_configurable() {
        let mut top = BlockNode::bulleted(vec![TextRun::plain("a")]);
        let mut mid = BlockNode::bulleted(vec![TextRun::plain("b")]);
        mid.children_mut()
            .unwrap()
            .push(BlockNode::bulleted(vec![TextRun::plain("c")]));
        top.children_mut().unwrap().push(mid);
        let document = doc(vec![top]);

        assert!(validate(&document, &ContractRules::default()).is_ok());

        let shallow = ContractRules {
            max_nesting_depth: 1,
            ..ContractRules::default()
        };
        let err = validate(&document, &shallow).unwrap_err();
        assert_eq!(err.rule, ContractRule::NestingTooDeep { depth: 2, max: 1 });
        assert_eq!(err.path.as_str(), "[0].children[0].children[0]");
    }

    #[test]
    fn long_runs_and_unknown_languages_are_rejected() {
        let rules = ContractRules {
            max_text_run_chars: 5,
            ..ContractRules::default()
        };
        let err = validate(
            &doc(vec![BlockNode::paragraph(vec![TextRun::plain("toolong")])]),
            &rules,
        )
        .unwrap_err();
        assert_eq!(err.rule, ContractRule::TextRunTooLong { chars: 7, max: 5 });

        let err = validate(
            &doc(vec![BlockNode::code("cobol", vec![TextRun::plain("x")])]),
            &ContractRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err.rule, ContractRule::UnknownLanguage { .. }));
    }

    #[test]
    fn links_and_images_need_http_urls() {
        let err = validate(
            &doc(vec![BlockNode::paragraph(vec![TextRun::linked(
                "x",
                "javascript:alert(1)",
            )])]),
            &ContractRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err.rule, ContractRule::InvalidUrl { .. }));

        let image = BlockNode::Image {
            url: "file:///tmp/a.png".to_string(),
            caption: vec![],
        };
        assert!(validate(&doc(vec![image]), &ContractRules::default()).is_err());
    }

    #[test]
    fn text_blocks_need_text() {
        let err = validate(&doc(vec![BlockNode::heading(2, vec![])]), &ContractRules::default())
            .unwrap_err();
        assert_eq!(err.rule, ContractRule::MissingText { kind: "heading_2" });
    }

    #[test]
    fn parse_rejects_unknown_kinds() {
        let json = r#"{"blocks":[{"type":"callout","rich_text":[{"content":"hi"}]}]}"#;
        let err = parse_and_validate(json, &ContractRules::default()).unwrap_err();
        assert!(matches!(err.rule, ContractRule::Malformed { .. }));

        let json = r#"{"blocks":[{"type":"quote","rich_text":[{"content":"hi"}]}]}"#;
        let document = parse_and_validate(json, &ContractRules::default()).unwrap();
        assert_eq!(document.blocks[0].kind(), "quote");
    }
}
