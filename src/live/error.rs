//! Push channel error types

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors that can occur on the push channel
///
/// These are contained to the channel task. The session only ever sees them
/// as a `Disconnected` event followed by a reconnect.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Packet did not follow the Engine.IO / Socket.IO framing
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Handshake timed out")]
    HandshakeTimeout,

    #[error("Transport closed")]
    Closed,

    #[error("No transport configured")]
    NoTransport,

    #[error("Channel not connected")]
    NotConnected,
}

impl From<tungstenite::Error> for ChannelError {
    fn from(err: tungstenite::Error) -> Self {
        ChannelError::WebSocket(Box::new(err))
    }
}

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;
