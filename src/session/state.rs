//! Session state machine
//!
//! [`SessionState`] holds everything one leaderboard session displays and
//! decides when interest must be (re-)declared. It performs no I/O: every
//! mutator returns the [`Command`]s the owner must carry out on the channel.

use chrono::{DateTime, Local};

use crate::live::ChannelEvent;
use crate::model::{ConnectionState, Interest, NavTarget, RankedEntity, Team, ViewMode};
use crate::snapshot::{Resolution, TeamSnapshot};

/// Progress of the initial team snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// Terminal: the navigation index names no team
    NotFound { requested: String },
}

/// Push channel lifecycle as seen by the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkPhase {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Closed,
}

/// Side effects requested by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Emit `request_leaderboard` for this scope
    Declare(Interest),
    /// Close the channel
    Close,
}

/// State of one leaderboard session
#[derive(Debug, Clone)]
pub struct SessionState {
    target: NavTarget,
    teams: Vec<Team>,
    load: LoadState,
    load_error: Option<String>,
    view_mode: ViewMode,
    selection: Option<String>,
    ranking: Vec<RankedEntity>,
    last_update: Option<DateTime<Local>>,
    phase: LinkPhase,
}

impl SessionState {
    pub fn new(target: NavTarget) -> Self {
        let view_mode = if target.is_pinned() {
            ViewMode::Users
        } else {
            ViewMode::Teams
        };

        Self {
            target,
            teams: Vec::new(),
            load: LoadState::Loading,
            load_error: None,
            view_mode,
            selection: None,
            ranking: Vec::new(),
            last_update: None,
            phase: LinkPhase::Idle,
        }
    }

    pub fn target(&self) -> &NavTarget {
        &self.target
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn load(&self) -> &LoadState {
        &self.load
    }

    /// Why the team list is empty, if the snapshot failed
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    /// The selected team, when it is part of the loaded list
    pub fn selected_team(&self) -> Option<&Team> {
        let id = self.selection.as_deref()?;
        self.teams.iter().find(|t| t.id == id)
    }

    /// Ranking from the last update, in server order
    pub fn ranking(&self) -> &[RankedEntity] {
        &self.ranking
    }

    pub fn last_update(&self) -> Option<DateTime<Local>> {
        self.last_update
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    pub fn is_pinned(&self) -> bool {
        self.target.is_pinned()
    }

    pub fn is_closed(&self) -> bool {
        self.phase == LinkPhase::Closed
    }

    pub fn connection_state(&self) -> ConnectionState {
        match self.phase {
            LinkPhase::Connected => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Scope the server should currently push, if any
    pub fn interest(&self) -> Option<Interest> {
        if matches!(self.load, LoadState::NotFound { .. }) {
            return None;
        }
        match self.view_mode {
            ViewMode::Teams => Some(Interest::All),
            ViewMode::Users => self.selection.clone().map(Interest::Team),
        }
    }

    /// Seed the session from the team snapshot
    pub fn load_snapshot(&mut self, snapshot: TeamSnapshot) -> Vec<Command> {
        if self.is_closed() {
            return Vec::new();
        }

        let prev = self.scope();
        self.teams = snapshot.teams;
        self.load_error = snapshot.error;

        match snapshot.resolution {
            Resolution::Overview { selection } => {
                self.selection = selection;
                self.load = LoadState::Ready;
            }
            Resolution::Team(team) => {
                self.selection = Some(team.id);
                self.view_mode = ViewMode::Users;
                self.load = LoadState::Ready;
            }
            Resolution::NotFound { requested } => {
                tracing::info!(requested = %requested, "Navigation target names no team");
                self.selection = None;
                self.load = LoadState::NotFound { requested };
            }
        }

        self.redeclare_if_changed(prev)
    }

    /// Switch between team and member rankings
    ///
    /// Entering users mode with nothing selected picks the first team.
    /// Ignored for pinned sessions.
    pub fn set_view_mode(&mut self, mode: ViewMode) -> Vec<Command> {
        if self.is_pinned() || self.is_closed() {
            return Vec::new();
        }

        let prev = self.scope();
        self.view_mode = mode;
        if mode == ViewMode::Users && self.selection.is_none() {
            self.selection = self.teams.first().map(|t| t.id.clone());
        }
        self.redeclare_if_changed(prev)
    }

    /// Select a team by id. Unknown ids are ignored.
    pub fn select_team(&mut self, id: &str) -> Vec<Command> {
        if self.is_pinned() || self.is_closed() {
            return Vec::new();
        }
        if !self.teams.iter().any(|t| t.id == id) {
            tracing::debug!(team_id = %id, "Ignoring selection of unknown team");
            return Vec::new();
        }

        let prev = self.scope();
        self.selection = Some(id.to_string());
        self.redeclare_if_changed(prev)
    }

    /// Select the team at a 1-based position in the team list
    pub fn select_team_at(&mut self, position: usize) -> Vec<Command> {
        let id = match position
            .checked_sub(1)
            .and_then(|index| self.teams.get(index))
        {
            Some(team) => team.id.clone(),
            None => return Vec::new(),
        };
        self.select_team(&id)
    }

    /// Apply one event from the channel task
    ///
    /// Once the session is closed every event is dropped.
    pub fn apply(&mut self, event: &ChannelEvent, now: DateTime<Local>) -> Vec<Command> {
        if self.is_closed() {
            tracing::debug!("Dropping channel event after teardown");
            return Vec::new();
        }

        match event {
            ChannelEvent::Connecting { .. } => {
                if self.phase == LinkPhase::Idle {
                    self.phase = LinkPhase::Connecting;
                }
                Vec::new()
            }
            ChannelEvent::Connected { .. } => {
                self.phase = LinkPhase::Connected;
                self.interest().map(Command::Declare).into_iter().collect()
            }
            ChannelEvent::Disconnected { .. } | ChannelEvent::Closed => {
                self.phase = LinkPhase::Disconnected;
                Vec::new()
            }
            ChannelEvent::ConnectionResponse(data) => {
                tracing::debug!(response = %data, "Connection response");
                Vec::new()
            }
            ChannelEvent::LeaderboardUpdate(rows) => {
                self.ranking = rows.clone();
                self.last_update = Some(now);
                Vec::new()
            }
        }
    }

    /// Begin teardown. Takes effect immediately for every later call.
    pub fn close(&mut self) -> Vec<Command> {
        if self.is_closed() {
            return Vec::new();
        }
        self.phase = LinkPhase::Closed;
        vec![Command::Close]
    }

    fn scope(&self) -> (ViewMode, Option<String>) {
        (self.view_mode, self.selection.clone())
    }

    /// Declare the current interest if the scope moved while connected
    fn redeclare_if_changed(&self, prev: (ViewMode, Option<String>)) -> Vec<Command> {
        if self.phase != LinkPhase::Connected || prev == self.scope() {
            return Vec::new();
        }
        self.interest().map(Command::Declare).into_iter().collect()
    }
}
