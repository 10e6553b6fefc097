// src/formatting/lines.rs
//! Line-level classification of note text.

use crate::constants::INDENT_SPACES;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,9})[.)] (.*)$").expect("numbered item regex is valid"));

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,9}[.)]\s+").expect("leading number regex is valid"));

static IMAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^!\[([^\]]*)\]\(([^()\s]+)\)$").expect("image line regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ItemKind {
    Bulleted,
    Numbered,
    ToDo { checked: bool },
    /// Rendered as a bulleted item behind the question prefix.
    Question,
}

/// One classified source line. Text slices are already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Line<'a> {
    Blank,
    Heading { level: u8, text: &'a str },
    /// `#Title` without a space: the start of a note entry.
    Entry { text: &'a str },
    Item {
        indent: usize,
        kind: ItemKind,
        text: &'a str,
    },
    Quote { text: &'a str },
    Divider,
    FenceOpen { info: &'a str },
    Image { alt: &'a str, url: &'a str },
    Text(&'a str),
}

impl Line<'_> {
    pub(crate) fn is_heading_like(&self) -> bool {
        matches!(self, Line::Heading { .. } | Line::Entry { .. })
    }
}

/// Indentation level: one tab or two spaces per level.
fn indent_level(line: &str) -> usize {
    let mut spaces = 0;
    let mut tabs = 0;
    for ch in line.chars() {
        match ch {
            ' ' => spaces += 1,
            '\t' => tabs += 1,
            _ => break,
        }
    }
    tabs + spaces / INDENT_SPACES
}

pub(crate) fn is_fence_close(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '`')
}

fn is_divider(trimmed: &str) -> bool {
    let mut chars = trimmed.chars().filter(|c| !c.is_whitespace());
    let first = match chars.next() {
        Some(c @ ('-' | '*' | '_')) => c,
        _ => return false,
    };
    let rest: Vec<char> = chars.collect();
    rest.len() >= 2 && rest.iter().all(|c| *c == first)
}

/// Strips a leading `2. ` style number from question text.
pub(crate) fn strip_leading_number(text: &str) -> &str {
    match LEADING_NUMBER.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

pub(crate) fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    let indent = indent_level(line);

    if let Some(info) = trimmed.strip_prefix("```") {
        if !info.contains('`') {
            return Line::FenceOpen { info: info.trim() };
        }
    }

    if is_divider(trimmed) {
        return Line::Divider;
    }

    if trimmed.starts_with('#') {
        return classify_heading(trimmed);
    }

    if let Some(line) = classify_item(trimmed, indent) {
        return line;
    }

    if let Some(rest) = trimmed.strip_prefix('>') {
        return Line::Quote {
            text: rest.strip_prefix(' ').unwrap_or(rest).trim_end(),
        };
    }

    if let Some(caps) = IMAGE_LINE.captures(trimmed) {
        if let (Some(alt), Some(url)) = (caps.get(1), caps.get(2)) {
            return Line::Image {
                alt: alt.as_str().trim(),
                url: url.as_str(),
            };
        }
    }

    Line::Text(trimmed)
}

fn classify_heading(trimmed: &str) -> Line<'_> {
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    let rest = &trimmed[hashes..];

    if let Some(text) = rest.strip_prefix(|c: char| c == ' ' || c == '\t') {
        let text = text.trim();
        if text.is_empty() {
            return Line::Text(trimmed);
        }
        let level = hashes.min(3) as u8;
        return Line::Heading { level, text };
    }

    if hashes == 1 && !rest.is_empty() {
        return Line::Entry { text: rest.trim() };
    }
    Line::Text(trimmed)
}

fn classify_item(trimmed: &str, indent: usize) -> Option<Line<'_>> {
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            let rest = rest.trim_start();
            if rest.is_empty() {
                return None;
            }
            if let Some((checked, text)) = checkbox(rest) {
                return Some(Line::Item {
                    indent,
                    kind: ItemKind::ToDo { checked },
                    text,
                });
            }
            return Some(Line::Item {
                indent,
                kind: ItemKind::Bulleted,
                text: rest,
            });
        }
    }

    if let Some(rest) = trimmed.strip_prefix(". ") {
        return non_empty_item(indent, ItemKind::ToDo { checked: false }, rest);
    }
    if let Some(rest) = trimmed
        .strip_prefix("x ")
        .or_else(|| trimmed.strip_prefix("X "))
    {
        return non_empty_item(indent, ItemKind::ToDo { checked: true }, rest);
    }
    if let Some(rest) = trimmed.strip_prefix("? ") {
        return non_empty_item(indent, ItemKind::Question, strip_leading_number(rest.trim()));
    }

    let caps = NUMBERED_ITEM.captures(trimmed)?;
    let text = caps.get(2)?.as_str();
    non_empty_item(indent, ItemKind::Numbered, text)
}

fn non_empty_item(indent: usize, kind: ItemKind, text: &str) -> Option<Line<'_>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(Line::Item { indent, kind, text })
}

/// `[ ] rest` or `[x] rest` after a list marker.
fn checkbox(rest: &str) -> Option<(bool, &str)> {
    let (checked, text) = if let Some(text) = rest.strip_prefix("[ ]") {
        (false, text)
    } else if let Some(text) = rest
        .strip_prefix("[x]")
        .or_else(|| rest.strip_prefix("[X]"))
    {
        (true, text)
    } else {
        return None;
    };
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some((checked, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_entries() {
        assert_eq!(classify("# Title"), Line::Heading { level: 1, text: "Title" });
        assert_eq!(classify("#### Deep"), Line::Heading { level: 3, text: "Deep" });
        assert_eq!(classify("#Monday"), Line::Entry { text: "Monday" });
        assert_eq!(classify("##tight"), Line::Text("##tight"));
        assert_eq!(classify("# "), Line::Text("#"));
        assert_eq!(classify("##"), Line::Text("##"));
    }

    #[test]
    fn list_items_carry_indent() {
        assert_eq!(
            classify("    - nested"),
            Line::Item {
                indent: 2,
                kind: ItemKind::Bulleted,
                text: "nested"
            }
        );
        assert_eq!(
            classify("\t3) third"),
            Line::Item {
                indent: 1,
                kind: ItemKind::Numbered,
                text: "third"
            }
        );
    }

    #[test]
    fn todo_prefixes() {
        assert_eq!(
            classify("- [x] ship it"),
            Line::Item {
                indent: 0,
                kind: ItemKind::ToDo { checked: true },
                text: "ship it"
            }
        );
        assert_eq!(
            classify(". call Bob"),
            Line::Item {
                indent: 0,
                kind: ItemKind::ToDo { checked: false },
                text: "call Bob"
            }
        );
        assert_eq!(
            classify("x paid rent"),
            Line::Item {
                indent: 0,
                kind: ItemKind::ToDo { checked: true },
                text: "paid rent"
            }
        );
    }

    #[test]
    fn question_strips_leading_number() {
        assert_eq!(
            classify("? 2. why is the build slow"),
            Line::Item {
                indent: 0,
                kind: ItemKind::Question,
                text: "why is the build slow"
            }
        );
    }

    #[test]
    fn dividers_fences_quotes_images() {
        assert_eq!(classify("---"), Line::Divider);
        assert_eq!(classify("* * *"), Line::Divider);
        assert_eq!(classify("```rs"), Line::FenceOpen { info: "rs" });
        assert_eq!(classify("> quoted"), Line::Quote { text: "quoted" });
        assert_eq!(
            classify("![board](https://example.com/b.png)"),
            Line::Image {
                alt: "board",
                url: "https://example.com/b.png"
            }
        );
        assert_eq!(classify("-"), Line::Text("-"));
    }
}
