// src/config.rs
use crate::chunking::ChunkLimits;
use crate::constants::{CONFIG_FILE_NAME, DEFAULT_REQUEST_TIMEOUT};
use crate::contract::ContractRules;
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::formatting::FormatOptions;
use crate::pipeline::{PrepareSettings, TruncationPolicy};
use crate::sync::DeletedNotePolicy;
use crate::types::{ApiKey, NoteId, PageId};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Directory holding sync state, config.json and the log (defaults to ~/.notes2notion)
    #[arg(short = 's', long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sync the notes directory into Notion
    Sync(SyncArgs),
    /// Forget sync state so notes are pushed again
    Reset(ResetArgs),
    /// List the recorded sync state of every note
    Status,
}

#[derive(Args, Debug, Default, Clone)]
pub struct SyncArgs {
    /// Notion parent page URL or ID under which note pages are created
    #[arg(short, long)]
    pub parent: Option<String>,

    /// Directory containing the notes
    #[arg(short, long)]
    pub notes_dir: Option<PathBuf>,

    /// Notes synced concurrently (default: CPU count, at most 8)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Blocks per request, nested ones included
    #[arg(long)]
    pub max_nodes: Option<usize>,

    /// Serialized bytes per request
    #[arg(long)]
    pub max_payload_bytes: Option<usize>,

    /// Attempts per API call before giving up
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Stop starting new notes after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// What to do with a block too large for one request
    #[arg(long, value_enum)]
    pub truncation: Option<TruncationPolicy>,

    /// What to do with pages whose note was deleted locally
    #[arg(long, value_enum)]
    pub on_deleted: Option<DeletedNotePolicy>,
}

#[derive(Args, Debug, Clone)]
pub struct ResetArgs {
    /// Note id (path relative to the notes directory) to reset
    #[arg(conflicts_with = "all", required_unless_present = "all")]
    pub note: Option<String>,

    /// Reset every note
    #[arg(long, default_value_t = false)]
    pub all: bool,
}

impl ResetArgs {
    pub fn note_id(&self) -> Result<Option<NoteId>, AppError> {
        Ok(self.note.as_deref().map(NoteId::new).transpose()?)
    }
}

/// Optional `config.json` in the state directory. Every field is optional;
/// command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub parent_page: Option<String>,
    pub notes_dir: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub max_nodes: Option<usize>,
    pub max_payload_bytes: Option<usize>,
    pub max_text_run_chars: Option<usize>,
    pub max_rich_text_runs: Option<usize>,
    pub max_nesting_depth: Option<usize>,
    pub max_note_bytes: Option<usize>,
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub run_deadline_secs: Option<u64>,
    pub truncation: Option<TruncationPolicy>,
    pub on_deleted: Option<DeletedNotePolicy>,
}

impl ConfigFile {
    /// Reads `<state_dir>/config.json`; a missing file is an empty config.
    pub fn load(state_dir: &Path) -> Result<Self, AppError> {
        let path = state_dir.join(CONFIG_FILE_NAME);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|source| AppError::JsonParseError { path, source })
    }
}

/// Everything the sync engine needs, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub parent_page: PageId,
    pub concurrency: usize,
    pub prepare: PrepareSettings,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub run_deadline: Option<Duration>,
    pub deleted_notes: DeletedNotePolicy,
}

impl SyncConfig {
    /// Defaults for everything but the parent page.
    pub fn new(parent_page: PageId) -> Self {
        Self {
            parent_page,
            concurrency: default_concurrency(),
            prepare: PrepareSettings::default(),
            retry: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            run_deadline: None,
            deleted_notes: DeletedNotePolicy::default(),
        }
    }
}

pub fn default_concurrency() -> usize {
    num_cpus::get().clamp(1, 8)
}

/// Resolved configuration of a `sync` invocation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: ApiKey,
    pub notes_dir: PathBuf,
    pub state_dir: PathBuf,
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Resolves from CLI flags, `config.json`, and the `NOTION_API_KEY` environment variable.
    pub fn resolve(state_dir: PathBuf, args: &SyncArgs) -> Result<Self, AppError> {
        let api_key_str = std::env::var("NOTION_API_KEY").map_err(|_| {
            AppError::MissingConfiguration(
                "NOTION_API_KEY environment variable not set".to_string(),
            )
        })?;
        let api_key = ApiKey::new(api_key_str)?;
        let file = ConfigFile::load(&state_dir)?;
        Self::from_sources(api_key, state_dir, args, file)
    }

    /// Merges flags over file values over defaults, then validates.
    pub fn from_sources(
        api_key: ApiKey,
        state_dir: PathBuf,
        args: &SyncArgs,
        file: ConfigFile,
    ) -> Result<Self, AppError> {
        let parent = args
            .parent
            .clone()
            .or(file.parent_page)
            .ok_or_else(|| {
                AppError::MissingConfiguration(
                    "parent page not set (use --parent or parent_page in config.json)".to_string(),
                )
            })?;
        let notes_dir = args.notes_dir.clone().or(file.notes_dir).ok_or_else(|| {
            AppError::MissingConfiguration(
                "notes directory not set (use --notes-dir or notes_dir in config.json)".to_string(),
            )
        })?;

        let defaults = PrepareSettings::default();
        let rules = ContractRules {
            max_nesting_depth: file
                .max_nesting_depth
                .unwrap_or(defaults.format.rules.max_nesting_depth),
            max_text_run_chars: file
                .max_text_run_chars
                .unwrap_or(defaults.format.rules.max_text_run_chars),
            max_rich_text_runs: file
                .max_rich_text_runs
                .unwrap_or(defaults.format.rules.max_rich_text_runs),
        };
        let format = FormatOptions {
            max_note_bytes: file
                .max_note_bytes
                .unwrap_or(defaults.format.max_note_bytes),
            rules,
        };
        let limits = ChunkLimits {
            max_nodes: args
                .max_nodes
                .or(file.max_nodes)
                .unwrap_or(defaults.limits.max_nodes),
            max_payload_bytes: args
                .max_payload_bytes
                .or(file.max_payload_bytes)
                .unwrap_or(defaults.limits.max_payload_bytes),
        };
        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: args
                .max_attempts
                .or(file.max_attempts)
                .unwrap_or(retry_defaults.max_attempts),
            initial_backoff: file
                .initial_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(retry_defaults.initial_backoff),
            max_backoff: file
                .max_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(retry_defaults.max_backoff),
        };

        let sync = SyncConfig {
            parent_page: PageId::parse(&parent)?,
            concurrency: args
                .concurrency
                .or(file.concurrency)
                .unwrap_or_else(default_concurrency),
            prepare: PrepareSettings {
                format,
                limits,
                truncation: args.truncation.or(file.truncation).unwrap_or_default(),
            },
            retry,
            request_timeout: args
                .timeout_secs
                .or(file.request_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            run_deadline: args
                .deadline_secs
                .or(file.run_deadline_secs)
                .map(Duration::from_secs),
            deleted_notes: args.on_deleted.or(file.on_deleted).unwrap_or_default(),
        };
        validate(&sync)?;

        Ok(Self {
            api_key,
            notes_dir,
            state_dir,
            sync,
        })
    }
}

fn validate(config: &SyncConfig) -> Result<(), AppError> {
    let invalid = |message: &str| Err(AppError::InvalidConfiguration(message.to_string()));
    let rules = &config.prepare.format.rules;
    let limits = &config.prepare.limits;

    if config.concurrency == 0 {
        return invalid("concurrency must be at least 1");
    }
    if limits.max_nodes == 0 {
        return invalid("max_nodes must be at least 1");
    }
    // Room for one block carrying a full text run.
    if limits.max_payload_bytes < 1024 {
        return invalid("max_payload_bytes must be at least 1024");
    }
    if rules.max_text_run_chars == 0 || rules.max_rich_text_runs == 0 {
        return invalid("text run limits must be at least 1");
    }
    if config.retry.max_attempts == 0 {
        return invalid("max_attempts must be at least 1");
    }
    if config.request_timeout.is_zero() {
        return invalid("request timeout must be positive");
    }
    Ok(())
}

/// State directory from the flag, else `~/.notes2notion`.
pub fn resolve_state_dir(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".notes2notion"))
        .ok_or_else(|| {
            AppError::MissingConfiguration(
                "HOME is not set; pass --state-dir".to_string(),
            )
        })
}
