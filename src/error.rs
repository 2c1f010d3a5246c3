use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Failure while fetching a single repository. Everything except
/// `RateLimited` is recoverable: the repository is skipped.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("repository not found")]
    NotFound,

    #[error("access denied (HTTP {status})")]
    Forbidden { status: u16 },

    #[error("rate limit exceeded{}", reset_suffix(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    /// The search API quota only; the core quota may still have room.
    #[error("search rate limit exceeded{}", reset_suffix(.reset_at))]
    SearchRateLimited { reset_at: Option<DateTime<Utc>> },

    #[error("GitHub API error: HTTP {status}")]
    Api { status: u16 },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors that abort the run.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("repository list not found: {} (run with --init to create one)", .path.display())]
    ConfigMissing { path: PathBuf },

    #[error("no valid repositories in {} (expected one owner/name per line)", .path.display())]
    ConfigEmpty { path: PathBuf },

    #[error(
        "GitHub rate limit exceeded{}; not updated: {}",
        reset_suffix(.reset_at),
        .pending.join(", ")
    )]
    RateLimited {
        reset_at: Option<DateTime<Utc>>,
        pending: Vec<String>,
    },

    #[error("no repository could be fetched; existing data left untouched")]
    NothingFetched,

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read or write {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("GitHub token contains invalid characters")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error("failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl DashboardError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DashboardError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DashboardError::Csv {
            path: path.into(),
            source,
        }
    }
}

fn reset_suffix(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(at) => format!(" (resets at {})", at.format("%Y-%m-%d %H:%M:%S UTC")),
        None => String::new(),
    }
}
