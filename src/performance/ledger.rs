//! Graded pick history and betting metrics
//!
//! Picks are stored per game date. Re-grading a date replaces everything
//! stored for it, so repeated runs never double count.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::Database;
use crate::{LedgerConfig, Pick, Result};

/// Inclusive date filter; `None` bounds are open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Record, hit rate and profit over a set of graded picks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    /// Hit rate needed to break even at the configured unit values
    pub break_even: f64,
    pub profit: f64,
    /// Running profit after each game date, oldest first
    pub cumulative: Vec<(NaiveDate, f64)>,
}

impl PerformanceSummary {
    /// Summarise graded picks; ungraded picks are ignored
    pub fn from_picks(picks: &[Pick], units: &LedgerConfig) -> Self {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut wins = 0;
        let mut losses = 0;

        for pick in picks {
            let delta = match pick.pick_correct {
                Some(true) => {
                    wins += 1;
                    units.win_units
                }
                Some(false) => {
                    losses += 1;
                    units.loss_units
                }
                None => continue,
            };
            *by_date.entry(pick.date).or_insert(0.0) += delta;
        }

        let mut running = 0.0;
        let cumulative: Vec<(NaiveDate, f64)> = by_date
            .into_iter()
            .map(|(date, delta)| {
                running += delta;
                (date, running)
            })
            .collect();

        let count = wins + losses;
        PerformanceSummary {
            count,
            wins,
            losses,
            win_rate: if count == 0 {
                0.0
            } else {
                wins as f64 / count as f64
            },
            break_even: -units.loss_units / (units.win_units - units.loss_units),
            profit: wins as f64 * units.win_units + losses as f64 * units.loss_units,
            cumulative,
        }
    }
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Record: {}-{} | Win rate: {:.1}% ({:+.1}% vs break-even) | Profit: {:+.2} units",
            self.wins,
            self.losses,
            self.win_rate * 100.0,
            (self.win_rate - self.break_even) * 100.0,
            self.profit
        )
    }
}

/// Persistent graded picks backed by the `performance_log` table
pub struct PerformanceLedger<'a> {
    db: &'a Database,
    units: LedgerConfig,
}

impl<'a> PerformanceLedger<'a> {
    pub fn new(db: &'a Database, units: LedgerConfig) -> Self {
        PerformanceLedger { db, units }
    }

    /// Replace the stored picks for `date`
    pub fn upsert_date(&self, date: NaiveDate, picks: &[Pick]) -> Result<usize> {
        let written = self.db.replace_performance_date(date, picks)?;
        log::debug!("Stored {} graded picks for {}", written, date);
        Ok(written)
    }

    /// Upsert picks grouped by date
    pub fn upsert_all(&self, by_date: &BTreeMap<NaiveDate, Vec<Pick>>) -> Result<usize> {
        let mut written = 0;
        for (date, picks) in by_date {
            written += self.upsert_date(*date, picks)?;
        }
        Ok(written)
    }

    /// Stored picks within `range`, in date order
    pub fn picks(&self, range: DateRange) -> Result<Vec<Pick>> {
        Ok(self
            .db
            .get_performance_picks()?
            .into_iter()
            .filter(|p| range.contains(p.date))
            .collect())
    }

    pub fn summary(&self, range: DateRange) -> Result<PerformanceSummary> {
        Ok(PerformanceSummary::from_picks(&self.picks(range)?, &self.units))
    }

    /// Drop stored picks below `threshold`, returning how many were removed
    pub fn prune_below(&self, threshold: f64) -> Result<usize> {
        let removed = self.db.delete_performance_below(threshold)?;
        if removed > 0 {
            log::info!("Removed {} picks below {:.0}% confidence", removed, threshold * 100.0);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn pick(d: u32, team: &str, confidence: f64, correct: bool) -> Pick {
        Pick {
            date: date(d),
            picked_team: team.to_string(),
            picked_spread: -4.5,
            confidence,
            matchup: None,
            pick_correct: Some(correct),
        }
    }

    #[test]
    fn test_profit_arithmetic() {
        let picks: Vec<Pick> = (0..10)
            .map(|i| pick(1 + i as u32, "Team", 0.6, i < 6))
            .collect();
        let summary = PerformanceSummary::from_picks(&picks, &LedgerConfig::default());

        assert_eq!(summary.count, 10);
        assert_eq!(summary.wins, 6);
        assert_eq!(summary.losses, 4);
        assert!((summary.win_rate - 0.6).abs() < 1e-12);
        assert!((summary.profit - 1.6).abs() < 1e-9);
        assert!((summary.break_even - 1.1 / 2.1).abs() < 1e-12);

        assert_eq!(summary.cumulative.len(), 10);
        assert!((summary.cumulative[5].1 - 6.0).abs() < 1e-9);
        assert!((summary.cumulative[9].1 - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_empty_summary() {
        let summary = PerformanceSummary::from_picks(&[], &LedgerConfig::default());
        assert_eq!(summary.count, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.profit, 0.0);
        assert!(summary.cumulative.is_empty());
    }

    #[test]
    fn test_regrading_is_idempotent() {
        let db = Database::in_memory().unwrap();
        let ledger = PerformanceLedger::new(&db, LedgerConfig::default());
        let day_one = vec![pick(1, "Duke", 0.6, true), pick(1, "UNC", 0.55, false)];

        ledger.upsert_date(date(1), &day_one).unwrap();
        let first = ledger.summary(DateRange::all()).unwrap();
        ledger.upsert_date(date(1), &day_one).unwrap();
        let second = ledger.summary(DateRange::all()).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.count, 2);

        // A corrected grade replaces the old rows for that date
        ledger
            .upsert_date(date(1), &[pick(1, "Duke", 0.6, false)])
            .unwrap();
        let third = ledger.summary(DateRange::all()).unwrap();
        assert_eq!(third.count, 1);
        assert_eq!(third.losses, 1);
    }

    #[test]
    fn test_date_range_filter() {
        let db = Database::in_memory().unwrap();
        let ledger = PerformanceLedger::new(&db, LedgerConfig::default());
        let mut by_date = BTreeMap::new();
        for d in 1..=5 {
            by_date.insert(date(d), vec![pick(d, "Team", 0.6, d % 2 == 1)]);
        }
        assert_eq!(ledger.upsert_all(&by_date).unwrap(), 5);

        let range = DateRange {
            start: Some(date(2)),
            end: Some(date(4)),
        };
        let summary = ledger.summary(range).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.cumulative.first().map(|c| c.0), Some(date(2)));
    }

    #[test]
    fn test_upsert_all_clears_dates_with_no_picks() {
        let db = Database::in_memory().unwrap();
        let ledger = PerformanceLedger::new(&db, LedgerConfig::default());
        let mut first_run = BTreeMap::new();
        first_run.insert(date(1), vec![pick(1, "Duke", 0.6, true)]);
        first_run.insert(date(2), vec![pick(2, "UNC", 0.58, false)]);
        ledger.upsert_all(&first_run).unwrap();

        // A rerun that keeps nothing on day two
        let mut second_run = BTreeMap::new();
        second_run.insert(date(1), vec![pick(1, "Duke", 0.6, true)]);
        second_run.insert(date(2), vec![]);
        assert_eq!(ledger.upsert_all(&second_run).unwrap(), 1);

        let stored = ledger.picks(DateRange::all()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].date, date(1));
    }

    #[test]
    fn test_prune_below_threshold() {
        let db = Database::in_memory().unwrap();
        let ledger = PerformanceLedger::new(&db, LedgerConfig::default());
        ledger
            .upsert_date(
                date(3),
                &[pick(3, "A", 0.51, true), pick(3, "B", 0.53, false), pick(3, "C", 0.7, true)],
            )
            .unwrap();

        assert_eq!(ledger.prune_below(0.53).unwrap(), 1);
        let remaining = ledger.picks(DateRange::all()).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|p| p.confidence >= 0.53));
    }
}
