//! Push Channel Message Types
//!
//! Defines the events exchanged with the leaderboard server, and the events
//! the channel task reports back to its owner.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ChannelError;
use super::packet::SocketPacket;
use crate::config::TransportKind;
use crate::model::{Interest, RankedEntity};

pub const REQUEST_LEADERBOARD: &str = "request_leaderboard";
pub const CONNECTION_RESPONSE: &str = "connection_response";
pub const LEADERBOARD_UPDATE: &str = "leaderboard_update";

/// Payload of `request_leaderboard`
///
/// Serializes to `{}` for the team-scope ranking and `{"team_id": ..}` for
/// one team's members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
}

/// Payload of `leaderboard_update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardUpdate {
    pub leaderboard: Vec<RankedEntity>,
}

/// Events sent from client to server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Declare interest in a ranking scope
    RequestLeaderboard(LeaderboardRequest),
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RequestLeaderboard(_) => REQUEST_LEADERBOARD,
        }
    }

    pub fn to_packet(&self) -> Result<SocketPacket, ChannelError> {
        let payload = match self {
            ClientEvent::RequestLeaderboard(request) => serde_json::to_value(request)?,
        };
        Ok(SocketPacket::event(self.name(), payload))
    }
}

impl From<&Interest> for ClientEvent {
    fn from(interest: &Interest) -> Self {
        ClientEvent::RequestLeaderboard(LeaderboardRequest {
            team_id: interest.team_id().map(str::to_string),
        })
    }
}

/// Events sent from server to client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Handshake acknowledgment; informational only
    ConnectionResponse(Value),
    /// Full replacement of the current ranking
    LeaderboardUpdate(LeaderboardUpdate),
    /// Anything this client does not handle
    Unknown { name: String },
}

impl ServerEvent {
    /// Interpret a Socket.IO event by name
    pub fn from_event(name: &str, mut args: Vec<Value>) -> Result<Self, ChannelError> {
        let first = if args.is_empty() {
            Value::Null
        } else {
            args.swap_remove(0)
        };

        match name {
            CONNECTION_RESPONSE => Ok(ServerEvent::ConnectionResponse(first)),
            LEADERBOARD_UPDATE => Ok(ServerEvent::LeaderboardUpdate(serde_json::from_value(
                first,
            )?)),
            other => Ok(ServerEvent::Unknown {
                name: other.to_string(),
            }),
        }
    }
}

/// Lifecycle and data events reported by the channel task
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A connection attempt is starting
    Connecting { attempt: u32 },
    /// Socket.IO handshake acknowledged
    Connected { transport: TransportKind },
    /// The transport was lost; a reconnect follows unless the channel gives up
    Disconnected { reason: Option<String> },
    /// `connection_response` from the server
    ConnectionResponse(Value),
    /// `leaderboard_update` from the server
    LeaderboardUpdate(Vec<RankedEntity>),
    /// The channel task has exited
    Closed,
}
