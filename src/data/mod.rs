//! Data ingestion and storage
//!
//! The in-memory game ledger, SQLite persistence, file adapters for games and
//! schedules, and team name resolution.

pub mod database;
pub mod import;
pub mod ledger;
pub mod names;

pub use database::{Database, DatabaseStats};
pub use import::{complete_mirrors, GameSource, JsonGameFile, JsonScheduleFile, ScheduleSource, ScheduledGame};
pub use ledger::GameLedger;
pub use names::{AliasTable, NameResolver};
