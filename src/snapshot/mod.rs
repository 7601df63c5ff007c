//! Snapshot calls
//!
//! Request/response access to the leaderboard server:
//!
//! - **client**: `reqwest` client for `/api/teams` and `/api/leaderboard`
//! - **fetcher**: initial team load and navigation target resolution
//! - **error**: error types
//!
//! # Example
//!
//! ```rust,no_run
//! use podium::model::NavTarget;
//! use podium::snapshot::{SnapshotClient, SnapshotFetcher};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SnapshotClient::new("http://localhost:8003", Duration::from_secs(10))?;
//!     let snapshot = SnapshotFetcher::new(client).fetch(&NavTarget::parse("2")).await;
//!     println!("{:?}", snapshot.resolution);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod fetcher;

pub use client::SnapshotClient;
pub use error::{SnapshotError, SnapshotResult};
pub use fetcher::{resolve_target, Resolution, SnapshotFetcher, TeamSnapshot};
