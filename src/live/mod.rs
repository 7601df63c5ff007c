//! Live update channel
//!
//! A Socket.IO client for the leaderboard server's push channel. The server
//! speaks Socket.IO v5 over Engine.IO v4; this module covers the subset the
//! leaderboard needs: the default namespace, text packets, heartbeats and
//! the `request_leaderboard` / `leaderboard_update` exchange.
//!
//! # Example
//!
//! ```no_run
//! use podium::config::Config;
//! use podium::live::{ChannelEvent, ChannelHandle, ClientEvent, SocketIoConnector};
//! use podium::model::Interest;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let connector = SocketIoConnector::from_config(&config.server, &config.channel)?;
//! let (handle, mut events) = ChannelHandle::start(connector, config.channel.clone());
//!
//! while let Some(event) = events.recv().await {
//!     if let ChannelEvent::Connected { .. } = event {
//!         handle.emit(ClientEvent::from(&Interest::All))?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod channel;
mod error;
mod messages;
mod packet;
mod transport;

pub use channel::ChannelHandle;
pub use error::{ChannelError, ChannelResult};
pub use messages::{
    ChannelEvent, ClientEvent, LeaderboardRequest, LeaderboardUpdate, ServerEvent,
    CONNECTION_RESPONSE, LEADERBOARD_UPDATE, REQUEST_LEADERBOARD,
};
pub use packet::{
    decode_payload, encode_payload, EnginePacket, Handshake, SocketPacket, DEFAULT_NAMESPACE,
    RECORD_SEPARATOR,
};
pub use transport::{
    Connector, Endpoint, PollingTransport, SocketIoConnector, Transport, WebSocketTransport,
    ENGINE_IO_VERSION,
};

#[cfg(test)]
pub(crate) use channel::testing;
