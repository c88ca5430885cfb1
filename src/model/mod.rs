//! Neural network architecture
//!
//! A small feed-forward network over the matchup feature vector.

pub mod spread_net;

pub use spread_net::{SpreadNet, SpreadNetConfig};
