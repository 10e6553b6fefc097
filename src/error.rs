// src/error.rs
//! Error types, one enum per concern.
//!
//! Per-note failures (`FormatError`, `ContractViolation`, `ChunkOverflow`,
//! `ApiError`) are reported in the sync report and never abort a run.
//! `AppError` is what the shell surfaces when a run cannot start or must stop.

use crate::types::ValidationError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded; back off and retry
    RateLimited,
    /// The requested object does not exist or is not shared with the integration
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    InvalidJson,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    Conflict,
    InternalError,
    ServiceUnavailable,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::RestrictedResource,
            404 => Self::ObjectNotFound,
            429 => Self::RateLimited,
            other => Self::HttpStatus(other),
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServiceUnavailable | Self::InternalError | Self::Conflict
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound)
    }

    /// The credential is bad or lacks access; nothing else in the run will work.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::RestrictedResource)
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Failure of a single Notion API operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("rate limited by Notion{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// The request did not reach Notion, or Notion reported a server-side failure.
    #[error("transient failure{}: {message}", status_suffix(.status))]
    Transient { status: Option<u16>, message: String },

    /// The request may have been applied but its response was lost.
    #[error("no response to a sent request: {message}")]
    Ambiguous { message: String },

    #[error("Notion API returned an error ({code}, HTTP {status}): {message}")]
    Notion {
        code: NotionErrorCode,
        status: u16,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ApiError {
    /// Retryable regardless of the operation. Ambiguity is decided per operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transient { .. } => true,
            Self::Notion { code, .. } => code.is_retryable(),
            Self::Ambiguous { .. } | Self::MalformedResponse(_) => false,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Notion { code, .. } if code.is_not_found())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Notion { code, .. } if code.is_auth())
    }

    /// A gateway or internal error on a non-idempotent write does not prove
    /// the write was rejected, so it is treated like a lost response.
    pub fn into_unconfirmed_write(self) -> Self {
        match self {
            Self::Transient {
                status: Some(status @ (500 | 502 | 504)),
                message,
            } => Self::Ambiguous {
                message: format!("HTTP {} after the request was sent: {}", status, message),
            },
            other => other,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Maps a transport failure. Only a failed connect proves the request was
    /// never sent; anything later is ambiguous.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_connect() || err.is_builder() {
            Self::Transient {
                status: None,
                message: err.to_string(),
            }
        } else {
            Self::Ambiguous {
                message: err.to_string(),
            }
        }
    }
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|delay| format!(" (retry after {:?})", delay))
        .unwrap_or_default()
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|status| format!(" (HTTP {})", status))
        .unwrap_or_default()
}

/// Why a note's raw content could not be formatted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("note is not valid UTF-8 (invalid byte at offset {offset})")]
    InvalidEncoding { offset: usize },

    #[error("note is {size} bytes, the limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// A single block too large for any request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "{kind} block in chunk {chunk_index} is {payload_bytes} bytes / {node_count} nodes, \
     limits are {max_payload_bytes} bytes / {max_nodes} nodes"
)]
pub struct ChunkOverflow {
    pub chunk_index: usize,
    pub kind: &'static str,
    pub node_count: usize,
    pub payload_bytes: usize,
    pub max_nodes: usize,
    pub max_payload_bytes: usize,
}

/// Persistence failures of the sync state store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write state file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize sync state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("State store task failed: {0}")]
    Task(String),
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Filesystem IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error for {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    ValidationError(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type alias for convenience
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_display() {
        for code in [
            "rate_limited",
            "object_not_found",
            "unauthorized",
            "validation_error",
            "service_unavailable",
        ] {
            assert_eq!(NotionErrorCode::from_api_response(code).to_string(), code);
        }
        assert_eq!(
            NotionErrorCode::from_api_response("brand_new"),
            NotionErrorCode::Unknown("brand_new".to_string())
        );
    }

    #[test]
    fn classification() {
        let auth = ApiError::Notion {
            code: NotionErrorCode::Unauthorized,
            status: 401,
            message: "API token is invalid.".to_string(),
        };
        assert!(auth.is_auth());
        assert!(!auth.is_retryable());

        let missing = ApiError::Notion {
            code: NotionErrorCode::from_http_status(404),
            status: 404,
            message: String::new(),
        };
        assert!(missing.is_not_found());

        let limited = ApiError::RateLimited {
            retry_after: Some(Duration::from_secs(2)),
        };
        assert!(limited.is_retryable());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(2)));

        let lost = ApiError::Ambiguous {
            message: "timed out".to_string(),
        };
        assert!(lost.is_ambiguous() && !lost.is_retryable());
    }

    #[test]
    fn only_server_errors_become_unconfirmed_writes() {
        let transient = |status| ApiError::Transient {
            status: Some(status),
            message: "upstream".to_string(),
        };
        for status in [500, 502, 504] {
            assert!(transient(status).into_unconfirmed_write().is_ambiguous());
        }
        assert_eq!(transient(503).into_unconfirmed_write(), transient(503));
        let refused = ApiError::Transient {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(refused.clone().into_unconfirmed_write(), refused);
    }
}
