//! Error types for export runs

use std::io;

use thiserror::Error;

use crate::cursor::Cursor;

fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "error".to_string(), |s| s.to_string())
}

/// Failure talking to the search backend (count or search).
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP error with optional status code (`None` = connect/timeout)
    #[error("HTTP {}: {message}", status_label(.status))]
    Http {
        status: Option<u16>,
        message: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Response body that does not have the expected shape
    #[error("malformed response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Create HTTP error from reqwest error (URL stripped)
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            // No status = connect error or timeout; 408/429/5xx are transient
            Self::Http { status, .. } => {
                matches!(status, None | Some(408) | Some(429) | Some(500..=599))
            }
            Self::Io(e) => e.kind() != io::ErrorKind::StorageFull,
            Self::Decode(_) => false,
        }
    }
}

/// Fatal failure of an export run. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("search backend: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to write batch {name}: {source}")]
    SinkWrite {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("cursor did not advance on page {page} (still at {cursor})")]
    CursorStall { page: usize, cursor: Cursor },

    #[error("cursor field '{field}' missing from last document of page {page}")]
    CursorField { page: usize, field: String },

    #[error("cancelled after {fetched} documents")]
    Cancelled { fetched: u64 },

    #[error("failed to record run: {0}")]
    RunLog(String),
}
