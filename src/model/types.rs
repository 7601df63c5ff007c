//! Core data types for the leaderboard client
//!
//! This module defines the values that flow between the snapshot call, the
//! push channel and the views:
//! - `RankedEntity` / `Team`: a ranked row as sent by the server
//! - `ViewMode`: which ranking is displayed
//! - `NavTarget`: the navigation context a session was opened with
//! - `Interest`: the scope declared to the server
//! - `ConnectionState`: whether the push channel is live

use serde::{Deserialize, Serialize};

/// A ranked row as delivered by the server
///
/// Order is owned by the server. The client never re-sorts or merges these;
/// each update replaces the previous list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedEntity {
    /// Stable identifier, unique within one list
    pub id: String,
    /// Display label
    pub name: String,
    /// Score, displayed verbatim
    pub score: u64,
}

impl RankedEntity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, score: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            score,
        }
    }
}

/// A team is a ranked entity that can also be selected as a scope
pub type Team = RankedEntity;

/// Which ranking is on display
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Teams ranked against each other
    #[default]
    Teams,
    /// Members of the selected team
    Users,
}

impl ViewMode {
    /// Plural noun used in empty-state hints ("Add some teams ...")
    pub fn noun(&self) -> &'static str {
        match self {
            ViewMode::Teams => "teams",
            ViewMode::Users => "users",
        }
    }
}

impl std::fmt::Display for ViewMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.noun())
    }
}

impl std::str::FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "teams" | "team" | "t" => Ok(ViewMode::Teams),
            "users" | "user" | "members" | "u" => Ok(ViewMode::Users),
            other => Err(format!("unknown view mode: {}", other)),
        }
    }
}

/// Navigation context a session is opened with
///
/// `All` is the interactive overview. `Index` pins the session to the member
/// ranking of one team, addressed by its 1-based position in the team list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NavTarget {
    #[default]
    All,
    Index(String),
}

impl NavTarget {
    /// Parse a navigation segment. `"all"` is the sentinel, anything else is
    /// kept raw and validated once the team list is known.
    pub fn parse(segment: &str) -> Self {
        let segment = segment.trim();
        if segment.eq_ignore_ascii_case("all") {
            NavTarget::All
        } else {
            NavTarget::Index(segment.to_string())
        }
    }

    /// Whether this target pins the session to a single team
    pub fn is_pinned(&self) -> bool {
        matches!(self, NavTarget::Index(_))
    }
}

impl std::fmt::Display for NavTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavTarget::All => write!(f, "all"),
            NavTarget::Index(raw) => write!(f, "{}", raw),
        }
    }
}

/// Scope of a `request_leaderboard` declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Interest {
    /// Team-scope ranking
    All,
    /// Member ranking of one team
    Team(String),
}

impl Interest {
    /// Team id carried by the declaration, if any
    pub fn team_id(&self) -> Option<&str> {
        match self {
            Interest::All => None,
            Interest::Team(id) => Some(id),
        }
    }
}

/// Push channel connectivity as shown to the user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}
