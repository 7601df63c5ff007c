//! Leaderboard data model
//!
//! Plain values shared by the snapshot client, the push channel and the views.
//! Nothing here is persisted; the server is the source of truth.

pub mod types;

pub use types::{ConnectionState, Interest, NavTarget, RankedEntity, Team, ViewMode};
