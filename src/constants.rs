// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! The Notion limits below are versioned, external facts about the API.
//! They are defaults only: every one of them can be overridden through
//! configuration, and the engine never reads them except to build that
//! configuration. Check them against the published limits when the
//! Notion-Version header changes.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// Notion-Version header sent with every request.
pub const NOTION_API_VERSION: &str = "2022-06-28";

/// Base URL of the public Notion API.
pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

/// Maximum number of blocks, counted recursively, sent in one append or
/// create request. Notion caps each `children` array at 100 elements; counting
/// nested blocks against the same budget keeps every array under the cap.
pub const DEFAULT_MAX_NODES_PER_REQUEST: usize = 100;

/// Maximum serialized size of the blocks sent in one request.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 500_000;

/// Maximum characters in a single rich text `content` string.
pub const DEFAULT_MAX_TEXT_RUN_CHARS: usize = 2000;

/// Maximum rich text elements in one block's `rich_text` array.
pub const DEFAULT_MAX_RICH_TEXT_RUNS: usize = 100;

/// Child levels allowed beneath a top-level block in one request.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 2;

/// How many objects the Notion API returns per page of results.
pub const NOTION_API_PAGE_SIZE: usize = 100;

// ---------------------------------------------------------------------------
// Formatting boundaries
// ---------------------------------------------------------------------------

/// Notes larger than this are rejected instead of formatted.
pub const DEFAULT_MAX_NOTE_BYTES: usize = 4 * 1024 * 1024;

/// Columns of leading whitespace per list nesting level. A tab counts as one level.
pub const INDENT_SPACES: usize = 2;

/// Prefix the handwritten-note format gives to questions.
pub const QUESTION_PREFIX: &str = "❓ ";

/// Run appended when a node is truncated to fit the payload limit.
pub const TRUNCATION_MARKER: &str = "… [truncated]";

// ---------------------------------------------------------------------------
// Retry and timing
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on how long a server-supplied `Retry-After` is honored.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Persisted state
// ---------------------------------------------------------------------------

pub const STATE_FILE_NAME: &str = "sync-state.json";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = "notes2notion.log";

/// File extensions picked up by the directory note source.
pub const NOTE_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
