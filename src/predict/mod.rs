//! Live prediction
//!
//! Score upcoming games from each team's latest entering statistics.

pub mod live;

pub use live::{format_picks, LivePick, LivePredictions, LivePredictor};
