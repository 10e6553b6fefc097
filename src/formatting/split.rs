// src/formatting/split.rs
//! Splitting of text that exceeds Notion's per-run and per-block limits.

use crate::model::TextRun;

/// Splits every run longer than `max_chars` into consecutive runs with the
/// same annotations and link.
pub(crate) fn split_long_runs(runs: Vec<TextRun>, max_chars: usize) -> Vec<TextRun> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        if run.char_len() <= max_chars {
            out.push(run);
            continue;
        }
        let chars: Vec<char> = run.content.chars().collect();
        for piece in chars.chunks(max_chars) {
            out.push(run.with_content(piece.iter().collect::<String>()));
        }
    }
    out
}

/// Groups runs into per-block run lists of at most `max_runs` each.
pub(crate) fn group_runs(runs: Vec<TextRun>, max_runs: usize) -> Vec<Vec<TextRun>> {
    let max_runs = max_runs.max(1);
    let mut groups = Vec::new();
    let mut current = Vec::with_capacity(max_runs.min(runs.len()));
    for run in runs {
        if current.len() == max_runs {
            groups.push(std::mem::take(&mut current));
        }
        current.push(run);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
