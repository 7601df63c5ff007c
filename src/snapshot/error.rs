//! Snapshot error types

use thiserror::Error;

/// Errors that can occur when fetching a snapshot
///
/// None of these are fatal to a session: the fetcher turns them into an
/// empty, loaded team list.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Leaderboard server unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Result type for snapshot operations
pub type SnapshotResult<T> = Result<T, SnapshotError>;
