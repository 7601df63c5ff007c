//! Full-screen composition of a session

use std::fmt;

use super::header::StatusHeader;
use super::ranking::RankingView;
use super::selector::TeamSelector;
use crate::model::ViewMode;
use crate::session::{LoadState, SessionState};

/// Main area below the header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Loading,
    /// Terminal state for an index that names no team
    NotFound { requested: String },
    Board {
        /// Present in users mode when there are teams to pick from
        selector: Option<TeamSelector>,
        /// Team name shown instead of the selector when pinned
        pinned_team: Option<String>,
        ranking: RankingView,
        interactive: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub header: StatusHeader,
    pub body: Body,
}

impl Screen {
    pub fn from_state(state: &SessionState) -> Self {
        let header = StatusHeader::new(state.connection_state(), state.last_update());

        let body = match state.load() {
            LoadState::Loading => Body::Loading,
            LoadState::NotFound { requested } => Body::NotFound {
                requested: requested.clone(),
            },
            LoadState::Ready => {
                let users = state.view_mode() == ViewMode::Users;
                let selector = if users && !state.is_pinned() {
                    TeamSelector::build(state.teams(), state.selection())
                } else {
                    None
                };
                let pinned_team = if state.is_pinned() {
                    state.selected_team().map(|t| t.name.clone())
                } else {
                    None
                };

                Body::Board {
                    selector,
                    pinned_team,
                    ranking: RankingView::build(state.ranking(), state.view_mode()),
                    interactive: !state.is_pinned(),
                }
            }
        };

        Self { header, body }
    }

    pub fn display<'a>(&'a self, separator: &'a str) -> ScreenDisplay<'a> {
        ScreenDisplay {
            screen: self,
            separator,
        }
    }
}

pub struct ScreenDisplay<'a> {
    screen: &'a Screen,
    separator: &'a str,
}

impl fmt::Display for ScreenDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.screen.header)?;
        writeln!(f)?;

        match &self.screen.body {
            Body::Loading => writeln!(f, "Loading teams..."),
            Body::NotFound { requested } => {
                writeln!(f, "Team Not Found")?;
                writeln!(f, "No team at position {}.", requested)?;
                writeln!(f, "Run with `--team all` to see every team.")
            }
            Body::Board {
                selector,
                pinned_team,
                ranking,
                interactive,
            } => {
                if let Some(name) = pinned_team {
                    writeln!(f, "Team: {}", name)?;
                    writeln!(f)?;
                }
                if let Some(selector) = selector {
                    write!(f, "{}", selector)?;
                    writeln!(f)?;
                }
                write!(f, "{}", ranking.display(self.separator))?;
                if *interactive {
                    writeln!(f)?;
                    writeln!(f, "[t] teams  [u] users  [N] select team  [q] quit")?;
                }
                Ok(())
            }
        }
    }
}
