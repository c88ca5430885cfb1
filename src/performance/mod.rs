//! Performance tracking
//!
//! Persistent graded picks, betting metrics and next-day grading of live picks.

pub mod grading;
pub mod ledger;

pub use grading::{grade_date, grade_predictions, GradingOutcome};
pub use ledger::{DateRange, PerformanceLedger, PerformanceSummary};
