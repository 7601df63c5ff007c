//! Terminal views
//!
//! Pure functions from session state to text. Nothing here performs I/O or
//! holds state between renders.

pub mod format;
pub mod header;
pub mod ranking;
pub mod screen;
pub mod selector;

pub use format::{clock, group_thousands};
pub use header::{StatusHeader, APP_TITLE};
pub use ranking::{Podium, RankRow, RankingView};
pub use screen::{Body, Screen};
pub use selector::{SelectorOption, TeamSelector};
