// src/sync/report.rs
//! Per-note outcomes and the aggregate report of a run.

use crate::pipeline::PrepareError;
use crate::source::UnreadableNote;
use crate::types::{NoteId, PageId};
use std::fmt;

/// The pipeline stage a note failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    /// The note file exists but could not be read.
    Read,
    Format,
    Contract,
    ChunkOverflow,
    Remote,
    State,
    DeadlineExceeded,
    Cancelled,
    Aborted,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Read => "read",
            FailureStage::Format => "format",
            FailureStage::Contract => "contract",
            FailureStage::ChunkOverflow => "chunk-overflow",
            FailureStage::Remote => "remote",
            FailureStage::State => "state",
            FailureStage::DeadlineExceeded => "deadline-exceeded",
            FailureStage::Cancelled => "cancelled",
            FailureStage::Aborted => "aborted",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&PrepareError> for FailureStage {
    fn from(error: &PrepareError) -> Self {
        match error {
            PrepareError::Format(_) => FailureStage::Format,
            PrepareError::Contract(_) => FailureStage::Contract,
            PrepareError::ChunkOverflow(_) => FailureStage::ChunkOverflow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created {
        note_id: NoteId,
        page_id: PageId,
    },
    Updated {
        note_id: NoteId,
        page_id: PageId,
    },
    Unchanged {
        note_id: NoteId,
    },
    Failed {
        note_id: NoteId,
        stage: FailureStage,
        message: String,
    },
}

impl SyncOutcome {
    pub fn failed(note_id: NoteId, stage: FailureStage, message: impl Into<String>) -> Self {
        SyncOutcome::Failed {
            note_id,
            stage,
            message: message.into(),
        }
    }

    pub fn note_id(&self) -> &NoteId {
        match self {
            SyncOutcome::Created { note_id, .. }
            | SyncOutcome::Updated { note_id, .. }
            | SyncOutcome::Unchanged { note_id }
            | SyncOutcome::Failed { note_id, .. } => note_id,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }

    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            SyncOutcome::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Created { note_id, page_id } => {
                write!(f, "created   {} -> {}", note_id, page_id)
            }
            SyncOutcome::Updated { note_id, page_id } => {
                write!(f, "updated   {} -> {}", note_id, page_id)
            }
            SyncOutcome::Unchanged { note_id } => write!(f, "unchanged {}", note_id),
            SyncOutcome::Failed {
                note_id,
                stage,
                message,
            } => write!(f, "failed    {} [{}]: {}", note_id, stage, message),
        }
    }
}

/// A state record whose note no longer exists locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub note_id: NoteId,
    pub page_id: Option<PageId>,
    /// The remote page was archived and the record dropped.
    pub archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// One outcome per input note, in input order.
    pub outcomes: Vec<SyncOutcome>,
    pub orphans: Vec<Orphan>,
    /// Why the run stopped early, when it did.
    pub aborted: Option<String>,
}

impl SyncReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, SyncOutcome::Unchanged { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(SyncOutcome::is_failure)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.aborted.is_some()
    }

    pub fn failures(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn outcome_for(&self, note_id: &NoteId) -> Option<&SyncOutcome> {
        self.outcomes.iter().find(|o| o.note_id() == note_id)
    }

    /// Records notes the source found but could not read as failures.
    pub fn add_unreadable(&mut self, unreadable: impl IntoIterator<Item = UnreadableNote>) {
        self.outcomes.extend(
            unreadable
                .into_iter()
                .map(|u| SyncOutcome::failed(u.id, FailureStage::Read, u.error)),
        );
    }

    fn count(&self, predicate: impl Fn(&SyncOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} created, {} updated, {} unchanged, {} failed",
            self.created(),
            self.updated(),
            self.unchanged(),
            self.failed()
        )?;
        for failure in self.failures() {
            writeln!(f, "  {}", failure)?;
        }
        for orphan in &self.orphans {
            let page = orphan
                .page_id
                .as_ref()
                .map_or_else(|| "no page".to_string(), ToString::to_string);
            let action = if orphan.archived { "archived" } else { "kept" };
            writeln!(f, "  orphan    {} ({}, {})", orphan.note_id, page, action)?;
        }
        if let Some(reason) = &self.aborted {
            writeln!(f, "Run aborted: {}", reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NoteId {
        NoteId::new(s).unwrap()
    }

    #[test]
    fn counts_and_rendering() {
        let page = PageId::parse("59833787-2cf9-4fdf-8782-e53db20768a5").unwrap();
        let report = SyncReport {
            outcomes: vec![
                SyncOutcome::Created {
                    note_id: id("a.md"),
                    page_id: page.clone(),
                },
                SyncOutcome::Unchanged { note_id: id("b.md") },
                SyncOutcome::failed(id("c.md"), FailureStage::ChunkOverflow, "too big"),
            ],
            orphans: vec![],
            aborted: None,
        };

        assert_eq!(report.created(), 1);
        assert_eq!(report.unchanged(), 1);
        assert_eq!(report.failed(), 1);
        assert!(report.has_failures());

        let rendered = report.to_string();
        assert!(rendered.starts_with("1 created, 0 updated, 1 unchanged, 1 failed"));
        assert!(rendered.contains("c.md [chunk-overflow]: too big"));
    }

    #[test]
    fn unreadable_notes_count_as_failures() {
        let mut report = SyncReport::default();
        report.add_unreadable([UnreadableNote {
            id: id("locked.md"),
            error: "Permission denied".to_string(),
        }]);

        assert!(report.has_failures());
        assert_eq!(report.outcomes[0].stage(), Some(FailureStage::Read));
        assert!(report.to_string().contains("locked.md [read]: Permission denied"));
    }
}
