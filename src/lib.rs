//! # Podium
//!
//! Live competition leaderboard client. Loads the team list from a
//! leaderboard server, subscribes to its Socket.IO push channel and renders
//! team or member rankings as they change.
//!
//! ## Modules
//!
//! - [`snapshot`]: REST calls and initial team resolution
//! - [`live`]: Socket.IO push channel with reconnection
//! - [`session`]: session state and interest declaration
//! - [`view`]: ranking, selector and status rendering
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use podium::{Config, LiveSubscriber, NavTarget, Screen, SessionState, SnapshotClient, SnapshotFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let target = NavTarget::All;
//!
//!     let client = SnapshotClient::from_config(&config.server)?;
//!     let snapshot = SnapshotFetcher::new(client).fetch(&target).await;
//!
//!     let state = SessionState::new(target);
//!     let mut subscriber = LiveSubscriber::connect(state, &config.server, &config.channel)?;
//!     subscriber.load_snapshot(snapshot);
//!
//!     while subscriber.next_event().await.is_some() {
//!         let screen = Screen::from_state(subscriber.state());
//!         print!("{}", screen.display(&config.display.thousands_separator));
//!     }
//!
//!     subscriber.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod live;
pub mod model;
pub mod session;
pub mod snapshot;
pub mod view;

// Re-export top-level types for convenience
pub use config::{ChannelConfig, Config, ConfigError, DisplayConfig, LoggingConfig, ServerConfig, TransportKind};

pub use model::{ConnectionState, Interest, NavTarget, RankedEntity, Team, ViewMode};

pub use snapshot::{Resolution, SnapshotClient, SnapshotError, SnapshotFetcher, TeamSnapshot};

pub use live::{ChannelError, ChannelEvent, ChannelHandle, ClientEvent, SocketIoConnector};

pub use session::{Command, LinkPhase, LiveSubscriber, LoadState, SessionState};

pub use view::{RankingView, Screen, StatusHeader, TeamSelector};
