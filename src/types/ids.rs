// src/types/ids.rs
use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Strong typing for remote IDs with phantom types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker type for page ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageMarker;

/// Type aliases for specific ID types
pub type PageId = Id<PageMarker>;

static URL_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[/-])([a-fA-F0-9]{32}|[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})(?:[/?#]|$)",
    )
    .expect("Notion ID regex is valid")
});

impl<T> Id<T> {
    /// Parse a raw ID, a dashed UUID, or a Notion URL into a normalized ID.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = normalize_notion_id(input)?;
        Ok(Self {
            value: normalized,
            _phantom: PhantomData,
        })
    }

    /// Create a new random v4 UUID ID
    pub fn new_v4() -> Self {
        Self {
            value: Uuid::new_v4().as_simple().to_string(),
            _phantom: PhantomData,
        }
    }

    /// Get the ID as a string reference (32 lowercase hex chars, no dashes)
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Get the ID with dashes for API calls
    pub fn to_dashed(&self) -> String {
        if self.value.len() == 32 {
            format!(
                "{}-{}-{}-{}-{}",
                &self.value[0..8],
                &self.value[8..12],
                &self.value[12..16],
                &self.value[16..20],
                &self.value[20..32]
            )
        } else {
            self.value.clone()
        }
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// Normalize the accepted Notion ID spellings into 32 lowercase hex chars.
fn normalize_notion_id(input: &str) -> Result<String, ValidationError> {
    let input = input.trim().trim_end_matches('/');
    if input.is_empty() {
        return Err(ValidationError::EmptyField("notion id"));
    }

    if let Ok(uuid) = Uuid::parse_str(input) {
        return Ok(uuid.as_simple().to_string());
    }

    if input.len() == 32 && input.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(input.to_lowercase());
    }

    // URLs: strip the query first, since `?v=` view ids are also 32 hex chars
    let path = input.split(['?', '#']).next().unwrap_or(input);
    if let Some(id) = URL_ID_REGEX
        .captures(path)
        .and_then(|captures| captures.get(1))
    {
        return Ok(id.as_str().replace('-', "").to_lowercase());
    }

    Err(ValidationError::InvalidId(format!(
        "Could not find a Notion ID in: {}",
        input
    )))
}

/// Stable identifier of a local note.
///
/// Derived from the note's path relative to the notes root (always with
/// forward slashes) or supplied explicitly by the note source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into().replace('\\', "/");
        let id = id.trim().trim_start_matches("./").to_string();
        if id.is_empty() {
            return Err(ValidationError::EmptyField("note id"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last path segment without its extension, e.g. `2026-02-16` for
    /// `meetings/2026-02-16.md`.
    pub fn file_stem(&self) -> &str {
        let name = self.0.rsplit('/').next().unwrap_or(&self.0);
        match name.rfind('.') {
            Some(0) | None => name,
            Some(dot) => &name[..dot],
        }
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::borrow::Borrow<str> for NoteId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        let id = PageId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");

        let id = PageId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");

        let id = PageId::parse("https://www.notion.so/Test-Page-550e8400e29b41d4a716446655440000")
            .unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");
    }

    #[test]
    fn test_url_query_is_ignored() {
        let id = PageId::parse(
            "https://www.notion.so/team/Inbox-550E8400E29B41D4A716446655440000?pvs=4",
        )
        .unwrap();
        assert_eq!(id.as_str(), "550e8400e29b41d4a716446655440000");
    }

    #[test]
    fn test_invalid_ids() {
        assert!(PageId::parse("too-short").is_err());
        assert!(PageId::parse("not-hex-chars-00000000000000000").is_err());
        assert!(PageId::parse("").is_err());
    }

    #[test]
    fn test_to_dashed() {
        let id = PageId::parse("550e8400e29b41d4a716446655440000").unwrap();
        assert_eq!(id.to_dashed(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_note_id_normalization() {
        let id = NoteId::new("./meetings\\2026-02-16.md").unwrap();
        assert_eq!(id.as_str(), "meetings/2026-02-16.md");
        assert_eq!(id.file_stem(), "2026-02-16");
        assert_eq!(NoteId::new(".hidden").unwrap().file_stem(), ".hidden");
        assert!(NoteId::new("  ").is_err());
    }
}
