// src/formatting/builder.rs
//! Assembles classified lines into a nested block tree.

use super::inline::parse_inline;
use super::lines::{classify, is_fence_close, ItemKind, Line};
use super::split::{group_runs, split_long_runs};
use crate::constants::QUESTION_PREFIX;
use crate::contract::languages::normalize_language;
use crate::contract::ContractRules;
use crate::model::{BlockNode, TextRun};
use crate::types::ValidatedUrl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingKind {
    Paragraph,
    Quote,
}

pub(crate) struct DocumentBuilder<'a> {
    rules: ContractRules,
    blocks: Vec<BlockNode>,
    pending: Option<(PendingKind, Vec<&'a str>)>,
    /// Levels a list item may currently nest at: the last item's level + 1,
    /// or 0 when the previous block was not a list item.
    list_depth: usize,
}

impl<'a> DocumentBuilder<'a> {
    pub(crate) fn new(rules: ContractRules) -> Self {
        Self {
            rules,
            blocks: Vec::new(),
            pending: None,
            list_depth: 0,
        }
    }

    pub(crate) fn build(mut self, text: &'a str) -> Vec<BlockNode> {
        let lines: Vec<&str> = text.lines().collect();
        let mut i = 0;

        while i < lines.len() {
            match classify(lines[i]) {
                Line::Blank => self.flush_pending(),
                Line::Heading { level, text } => {
                    let nodes = self.text_blocks(text, |runs| BlockNode::heading(level, runs));
                    self.push_blocks(nodes);
                }
                Line::Entry { text } => {
                    let next = lines[i + 1..]
                        .iter()
                        .map(|line| classify(line))
                        .find(|line| *line != Line::Blank);
                    let empty_entry = next.map_or(true, |line| line.is_heading_like());
                    if empty_entry {
                        log::debug!("Dropping empty entry '{}'", text);
                        self.flush_pending();
                    } else {
                        let nodes = self.text_blocks(text, |runs| BlockNode::heading(2, runs));
                        self.push_blocks(nodes);
                    }
                }
                Line::Item { indent, kind, text } => self.push_item(indent, kind, text),
                Line::Quote { text } => self.push_pending(PendingKind::Quote, text),
                Line::Divider => self.push_blocks(vec![BlockNode::Divider]),
                Line::FenceOpen { info } => {
                    match lines[i + 1..].iter().position(|line| is_fence_close(line)) {
                        Some(offset) => {
                            let body = lines[i + 1..i + 1 + offset].join("\n");
                            let nodes = self.code_blocks(normalize_language(info), body);
                            self.push_blocks(nodes);
                            i += offset + 2;
                            continue;
                        }
                        None => self.push_pending(PendingKind::Paragraph, lines[i].trim()),
                    }
                }
                Line::Image { alt, url } => match ValidatedUrl::parse(url) {
                    Ok(url) => {
                        let caption = self.caption(alt);
                        self.push_blocks(vec![BlockNode::Image {
                            url: url.as_str().to_string(),
                            caption,
                        }]);
                    }
                    Err(_) => self.push_pending(PendingKind::Paragraph, lines[i].trim()),
                },
                Line::Text(text) => self.push_pending(PendingKind::Paragraph, text),
            }
            i += 1;
        }

        self.flush_pending();
        self.blocks
    }

    fn push_pending(&mut self, kind: PendingKind, text: &'a str) {
        match &mut self.pending {
            Some((pending_kind, lines)) if *pending_kind == kind => lines.push(text),
            _ => {
                self.flush_pending();
                self.list_depth = 0;
                self.pending = Some((kind, vec![text]));
            }
        }
    }

    fn flush_pending(&mut self) {
        let Some((kind, lines)) = self.pending.take() else {
            return;
        };
        let text = lines.join("\n");
        if text.trim().is_empty() {
            return;
        }
        let nodes = match kind {
            PendingKind::Paragraph => self.text_blocks(&text, BlockNode::paragraph),
            PendingKind::Quote => self.text_blocks(&text, BlockNode::quote),
        };
        self.blocks.extend(nodes);
    }

    fn push_blocks(&mut self, nodes: Vec<BlockNode>) {
        self.flush_pending();
        self.list_depth = 0;
        self.blocks.extend(nodes);
    }

    fn push_item(&mut self, indent: usize, kind: ItemKind, text: &str) {
        self.flush_pending();

        let level = indent
            .min(self.list_depth)
            .min(self.rules.max_nesting_depth);

        let nodes = match kind {
            ItemKind::Bulleted => self.text_blocks(text, BlockNode::bulleted),
            ItemKind::Numbered => self.text_blocks(text, BlockNode::numbered),
            ItemKind::ToDo { checked } => {
                self.text_blocks(text, |runs| BlockNode::to_do(runs, checked))
            }
            ItemKind::Question => {
                let prefixed = format!("{}{}", QUESTION_PREFIX, text);
                self.text_blocks(&prefixed, BlockNode::bulleted)
            }
        };

        match container_at(&mut self.blocks, level) {
            Some(container) => container.extend(nodes),
            None => self.blocks.extend(nodes),
        }
        self.list_depth = level + 1;
    }

    /// Inline-parsed blocks of one kind, split to respect the run limits.
    fn text_blocks<F>(&self, text: &str, make: F) -> Vec<BlockNode>
    where
        F: Fn(Vec<TextRun>) -> BlockNode,
    {
        let runs = split_long_runs(parse_inline(text), self.rules.max_text_run_chars);
        group_runs(runs, self.rules.max_rich_text_runs)
            .into_iter()
            .map(make)
            .collect()
    }

    fn code_blocks(&self, language: &str, body: String) -> Vec<BlockNode> {
        if body.is_empty() {
            return Vec::new();
        }
        let runs = split_long_runs(vec![TextRun::plain(body)], self.rules.max_text_run_chars);
        group_runs(runs, self.rules.max_rich_text_runs)
            .into_iter()
            .map(|runs| BlockNode::code(language, runs))
            .collect()
    }

    fn caption(&self, alt: &str) -> Vec<TextRun> {
        if alt.is_empty() {
            return Vec::new();
        }
        let mut runs = split_long_runs(vec![TextRun::plain(alt)], self.rules.max_text_run_chars);
        runs.truncate(self.rules.max_rich_text_runs.max(1));
        runs
    }
}

/// The children list `level` steps down the trailing edge of the tree.
fn container_at(blocks: &mut Vec<BlockNode>, level: usize) -> Option<&mut Vec<BlockNode>> {
    let mut container = blocks;
    for _ in 0..level {
        let parent = container.last_mut()?;
        container = parent.children_mut()?;
    }
    Some(container)
}
