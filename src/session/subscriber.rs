//! Live Update Subscriber
//!
//! Sole owner of the push channel for a session. All interest declarations
//! flow through here, driven by the commands [`SessionState`] returns.

use chrono::Local;
use tokio::sync::mpsc;

use super::state::{Command, SessionState};
use crate::config::{ChannelConfig, ServerConfig};
use crate::live::{ChannelError, ChannelEvent, ChannelHandle, ClientEvent, Connector, SocketIoConnector};
use crate::model::ViewMode;
use crate::snapshot::TeamSnapshot;

/// A session bound to its push channel
pub struct LiveSubscriber {
    state: SessionState,
    handle: ChannelHandle,
    events: mpsc::Receiver<ChannelEvent>,
}

impl LiveSubscriber {
    /// Start the channel with an explicit connector
    pub fn start(
        state: SessionState,
        connector: impl Connector + 'static,
        config: ChannelConfig,
    ) -> Self {
        let (handle, events) = ChannelHandle::start(connector, config);
        Self {
            state,
            handle,
            events,
        }
    }

    /// Start the channel against the configured Socket.IO endpoint
    pub fn connect(
        state: SessionState,
        server: &ServerConfig,
        channel: &ChannelConfig,
    ) -> Result<Self, ChannelError> {
        let connector = SocketIoConnector::from_config(server, channel)?;
        Ok(Self::start(state, connector, channel.clone()))
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Wait for the next channel event and apply it
    ///
    /// Returns `None` once the session is closed or the channel task is gone.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        if self.state.is_closed() {
            return None;
        }
        let event = self.events.recv().await?;
        let commands = self.state.apply(&event, Local::now());
        self.dispatch(commands);
        Some(event)
    }

    pub fn load_snapshot(&mut self, snapshot: TeamSnapshot) {
        let commands = self.state.load_snapshot(snapshot);
        self.dispatch(commands);
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        let commands = self.state.set_view_mode(mode);
        self.dispatch(commands);
    }

    pub fn select_team(&mut self, id: &str) {
        let commands = self.state.select_team(id);
        self.dispatch(commands);
    }

    pub fn select_team_at(&mut self, position: usize) {
        let commands = self.state.select_team_at(position);
        self.dispatch(commands);
    }

    /// Tear the session down. No event is applied after this returns.
    pub fn close(&mut self) {
        let commands = self.state.close();
        self.dispatch(commands);
    }

    /// Close and wait for the channel task to exit
    pub async fn shutdown(&mut self) {
        self.close();
        self.handle.shutdown().await;
    }

    fn dispatch(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Declare(interest) => {
                    tracing::info!(team_id = ?interest.team_id(), "Declaring interest");
                    if let Err(e) = self.handle.emit(ClientEvent::from(&interest)) {
                        tracing::warn!(error = %e, "Failed to queue declaration");
                    }
                }
                Command::Close => self.handle.close(),
            }
        }
    }
}

impl Drop for LiveSubscriber {
    fn drop(&mut self) {
        self.handle.close();
    }
}
