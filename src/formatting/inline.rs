// src/formatting/inline.rs
//! Inline span parsing: `**bold**`, `*italic*`, `_italic_`, `~~strike~~`,
//! `` `code` `` and `[text](url)`.
//!
//! Anything that does not close, or a link whose URL is not http(s), is kept
//! as literal text.

use crate::model::{Annotations, TextRun};
use crate::types::ValidatedUrl;
use once_cell::sync::Lazy;
use regex::Regex;

static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([^\[\]]+)\]\(([^()\s]+)\)").expect("link regex is valid"));

/// Parses inline markup into merged text runs. Never returns an empty run.
pub(crate) fn parse_inline(text: &str) -> Vec<TextRun> {
    let mut runs = Vec::new();
    parse_spans(text, Annotations::default(), None, &mut runs);
    merge_adjacent(runs)
}

struct Literal<'a> {
    buffer: String,
    annotations: Annotations,
    link: Option<&'a str>,
}

impl<'a> Literal<'a> {
    fn flush(&mut self, out: &mut Vec<TextRun>) {
        if self.buffer.is_empty() {
            return;
        }
        out.push(TextRun {
            content: std::mem::take(&mut self.buffer),
            annotations: self.annotations,
            link: self.link.map(str::to_string),
        });
    }
}

fn parse_spans(text: &str, annotations: Annotations, link: Option<&str>, out: &mut Vec<TextRun>) {
    let mut literal = Literal {
        buffer: String::new(),
        annotations,
        link,
    };
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let prev = text[..i].chars().next_back();

        if let Some(inner) = rest.strip_prefix('`').and_then(|r| delimited(r, "`")) {
            literal.flush(out);
            let mut style = annotations;
            style.code = true;
            out.push(TextRun {
                content: inner.to_string(),
                annotations: style,
                link: link.map(str::to_string),
            });
            i += inner.len() + 2;
            continue;
        }

        if link.is_none() {
            if let Some(caps) = LINK.captures(rest) {
                let whole = caps.get(0).map_or(0, |m| m.end());
                let label = caps.get(1).map_or("", |m| m.as_str());
                let url = caps.get(2).map_or("", |m| m.as_str());
                if ValidatedUrl::parse(url).is_ok() {
                    literal.flush(out);
                    parse_spans(label, annotations, Some(url), out);
                    i += whole;
                    continue;
                }
            }
        }

        if let Some((delimiter, inner)) = styled_span(rest, prev) {
            literal.flush(out);
            let mut style = annotations;
            match delimiter {
                "**" => style.bold = true,
                "~~" => style.strikethrough = true,
                _ => style.italic = true,
            }
            parse_spans(inner, style, link, out);
            i += inner.len() + delimiter.len() * 2;
            continue;
        }

        let ch = rest.chars().next().unwrap_or_default();
        literal.buffer.push(ch);
        i += ch.len_utf8().max(1);
    }

    literal.flush(out);
}

/// Matches `**x**`, `~~x~~`, `*x*` or `_x_` at the start of `rest`.
fn styled_span<'t>(rest: &'t str, prev: Option<char>) -> Option<(&'static str, &'t str)> {
    for delimiter in ["**", "~~", "*", "_"] {
        let Some(after) = rest.strip_prefix(delimiter) else {
            continue;
        };
        let Some(inner) = delimited(after, delimiter) else {
            continue;
        };
        if delimiter == "_" {
            let follows = after[inner.len() + 1..].chars().next();
            if prev.is_some_and(char::is_alphanumeric) || follows.is_some_and(char::is_alphanumeric)
            {
                continue;
            }
        }
        return Some((delimiter, inner));
    }
    None
}

/// Text up to the next `delimiter`, if it is non-empty and not padded with
/// whitespace on either side.
fn delimited<'t>(after: &'t str, delimiter: &str) -> Option<&'t str> {
    let end = after.find(delimiter)?;
    let inner = &after[..end];
    if inner.is_empty()
        || inner.starts_with(char::is_whitespace)
        || inner.ends_with(char::is_whitespace)
    {
        return None;
    }
    Some(inner)
}

fn merge_adjacent(runs: Vec<TextRun>) -> Vec<TextRun> {
    let mut merged: Vec<TextRun> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(last) if last.annotations == run.annotations && last.link == run.link => {
                last.content.push_str(&run.content);
            }
            _ => merged.push(run),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn contents(runs: &[TextRun]) -> Vec<&str> {
        runs.iter().map(|r| r.content.as_str()).collect()
    }

    #[test]
    fn plain_text_is_one_run() {
        let runs = parse_inline("just words");
        assert_eq!(runs, vec![TextRun::plain("just words")]);
    }

    #[test]
    fn styles_nest() {
        let runs = parse_inline("a **bold _and italic_** b");
        assert_eq!(contents(&runs), vec!["a ", "bold ", "and italic", " b"]);
        assert!(runs[1].annotations.bold && !runs[1].annotations.italic);
        assert!(runs[2].annotations.bold && runs[2].annotations.italic);
    }

    #[test]
    fn code_and_strike() {
        let runs = parse_inline("run `cargo **x**` ~~not~~");
        assert_eq!(runs[1].content, "cargo **x**");
        assert!(runs[1].annotations.code);
        assert!(runs[3].annotations.strikethrough);
    }

    #[test]
    fn links_need_http_urls() {
        let runs = parse_inline("see [docs](https://example.com/a) now");
        assert_eq!(runs[1].link.as_deref(), Some("https://example.com/a"));
        assert_eq!(runs[1].content, "docs");

        let runs = parse_inline("[bad](ftp://example.com)");
        assert_eq!(runs, vec![TextRun::plain("[bad](ftp://example.com)")]);
    }

    #[test]
    fn unbalanced_delimiters_stay_literal() {
        assert_eq!(parse_inline("**open"), vec![TextRun::plain("**open")]);
        assert_eq!(parse_inline("snake_case_name"), vec![TextRun::plain("snake_case_name")]);
        assert_eq!(parse_inline("2 * 3 * 4"), vec![TextRun::plain("2 * 3 * 4")]);
        assert_eq!(parse_inline("``"), vec![TextRun::plain("``")]);
    }
}
