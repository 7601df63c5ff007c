//! Snapshot Fetcher
//!
//! Loads the team list once per session and resolves the navigation target
//! into an initial selection. Failures never escape: a session that cannot
//! load its teams still starts, with an empty list.

use super::client::SnapshotClient;
use super::error::SnapshotError;
use crate::model::{NavTarget, Team};

/// Where a navigation target lands once the team list is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Interactive overview; selection seeded to the first team when there is one
    Overview { selection: Option<String> },
    /// Pinned to one team's member ranking
    Team(Team),
    /// The requested index does not name a team
    NotFound { requested: String },
}

impl Resolution {
    /// Selected team id implied by this resolution
    pub fn selection(&self) -> Option<&str> {
        match self {
            Resolution::Overview { selection } => selection.as_deref(),
            Resolution::Team(team) => Some(&team.id),
            Resolution::NotFound { .. } => None,
        }
    }
}

/// Result of the initial load
#[derive(Debug, Clone)]
pub struct TeamSnapshot {
    pub teams: Vec<Team>,
    pub resolution: Resolution,
    /// Why the list is empty, when the request failed
    pub error: Option<String>,
}

impl TeamSnapshot {
    /// Build a snapshot from a fetch outcome
    ///
    /// A failed fetch is recovered as an empty list; the target is still
    /// resolved against it so an indexed target lands on `NotFound`.
    pub fn from_result(result: Result<Vec<Team>, SnapshotError>, target: &NavTarget) -> Self {
        let (teams, error) = match result {
            Ok(teams) => (teams, None),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch teams");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let resolution = resolve_target(&teams, target);
        Self {
            teams,
            resolution,
            error,
        }
    }
}

/// Resolve a navigation target against the fetched team list
///
/// Indices are 1-based. Anything that is not a positive integer within the
/// list resolves to `NotFound`.
pub fn resolve_target(teams: &[Team], target: &NavTarget) -> Resolution {
    match target {
        NavTarget::All => Resolution::Overview {
            selection: teams.first().map(|t| t.id.clone()),
        },
        NavTarget::Index(raw) => {
            let team = raw
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|index| teams.get(index));

            match team {
                Some(team) => Resolution::Team(team.clone()),
                None => Resolution::NotFound {
                    requested: raw.clone(),
                },
            }
        }
    }
}

/// Fetches the initial team snapshot for a session
pub struct SnapshotFetcher {
    client: SnapshotClient,
}

impl SnapshotFetcher {
    pub fn new(client: SnapshotClient) -> Self {
        Self { client }
    }

    /// Issue one `GET /api/teams` and resolve `target` against it. Never retries.
    pub async fn fetch(&self, target: &NavTarget) -> TeamSnapshot {
        let result = self.client.teams().await;
        if let Ok(teams) = &result {
            tracing::info!(count = teams.len(), target = %target, "Loaded teams");
        }
        TeamSnapshot::from_result(result, target)
    }
}
