//! Feature extraction
//!
//! Converts the game ledger into point-in-time team snapshots and model-ready
//! matchup vectors.

pub mod matchup;
pub mod snapshot;
pub mod stat_line;
pub mod temporal;

pub use matchup::{AssembledMatchups, FeatureVector, Matchup, MatchupAssembler};
pub use snapshot::FeatureSnapshot;
pub use stat_line::{StatColumn, StatLine};
pub use temporal::{AggregatedGames, AggregatedRow, LatestSnapshot, TemporalAggregator};
