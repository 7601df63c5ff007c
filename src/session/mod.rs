//! Leaderboard session
//!
//! - **state**: sans-IO session state and interest declaration rules
//! - **subscriber**: binds the state to the push channel

mod state;
mod subscriber;

pub use state::{Command, LinkPhase, LoadState, SessionState};
pub use subscriber::LiveSubscriber;
