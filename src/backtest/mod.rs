//! Historical self-test
//!
//! Walk-forward evaluation of a classifier against the spread, and the pick
//! rules it shares with live prediction.

pub mod picks;
pub mod walk_forward;

pub use picks::{confidence, decide, grade, grade_side, make_pick};
pub use walk_forward::{BacktestReport, BacktestWindow, WalkForwardEvaluator, WindowResult};
