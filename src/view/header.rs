//! Status header: connectivity and the time of the last update

use std::fmt;

use chrono::{DateTime, Local};

use super::format::clock;
use crate::model::ConnectionState;

pub const APP_TITLE: &str = "Podium · Live Leaderboard";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusHeader {
    pub connection: ConnectionState,
    pub last_update: Option<DateTime<Local>>,
}

impl StatusHeader {
    pub fn new(connection: ConnectionState, last_update: Option<DateTime<Local>>) -> Self {
        Self {
            connection,
            last_update,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.connection.is_connected() {
            "Live"
        } else {
            "Offline"
        }
    }

    /// Update time, shown only while connected
    pub fn updated_label(&self) -> Option<String> {
        if !self.connection.is_connected() {
            return None;
        }
        self.last_update
            .as_ref()
            .map(|time| format!("Updated: {}", clock(time)))
    }
}

impl fmt::Display for StatusHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dot = if self.connection.is_connected() { '●' } else { '○' };
        write!(f, "{}  {} {}", APP_TITLE, dot, self.status_label())?;
        if let Some(updated) = self.updated_label() {
            write!(f, "  {}", updated)?;
        }
        writeln!(f)
    }
}
