//! In-memory game ledger
//!
//! Holds every team-perspective game record, unique per `(date, team)` and
//! ordered by date then team name.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::GameRecord;

/// Ordered, deduplicated set of completed game records
#[derive(Debug, Clone, Default)]
pub struct GameLedger {
    records: BTreeMap<(NaiveDate, String), GameRecord>,
}

impl GameLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger; a later record for the same `(date, team)` replaces an earlier one
    pub fn from_records(records: impl IntoIterator<Item = GameRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.insert(record);
        }
        ledger
    }

    /// Insert a record, returning true if it replaced an existing one
    pub fn insert(&mut self, record: GameRecord) -> bool {
        let key = (record.date, record.team.clone());
        self.records.insert(key, record).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in `(date, team)` order
    pub fn iter(&self) -> impl Iterator<Item = &GameRecord> {
        self.records.values()
    }

    pub fn get(&self, date: NaiveDate, team: &str) -> Option<&GameRecord> {
        self.records.get(&(date, team.to_string()))
    }

    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.records.keys().next().map(|(d, _)| *d)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.records.keys().next_back().map(|(d, _)| *d)
    }

    /// Distinct team names, sorted
    pub fn teams(&self) -> BTreeSet<&str> {
        self.records.values().map(|r| r.team.as_str()).collect()
    }

    /// Every team's timeline, keyed by team name
    pub fn timelines(&self) -> BTreeMap<&str, Vec<&GameRecord>> {
        let mut timelines: BTreeMap<&str, Vec<&GameRecord>> = BTreeMap::new();
        for record in self.records.values() {
            timelines.entry(record.team.as_str()).or_default().push(record);
        }
        timelines
    }

    /// Records whose opponent-side mirror row is missing
    pub fn unmirrored(&self) -> Vec<&GameRecord> {
        self.records
            .values()
            .filter(|r| self.get(r.date, &r.opponent).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxScore;

    fn game(date: NaiveDate, team: &str, opponent: &str, team_score: u16) -> GameRecord {
        GameRecord {
            date,
            season: 2026,
            team: team.to_string(),
            opponent: opponent.to_string(),
            team_score,
            opp_score: 70,
            is_home: true,
            spread: -2.0,
            box_score: BoxScore::default(),
        }
    }

    #[test]
    fn test_dedup_on_date_and_team() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let mut ledger = GameLedger::new();
        assert!(!ledger.insert(game(d, "Duke", "UNC", 70)));
        assert!(ledger.insert(game(d, "Duke", "UNC", 81)));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.get(d, "Duke").unwrap().team_score, 81);
    }

    #[test]
    fn test_ordering_and_timelines() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let ledger = GameLedger::from_records(vec![
            game(d2, "Duke", "Clemson", 60),
            game(d1, "UNC", "Duke", 70),
            game(d1, "Duke", "UNC", 75),
        ]);

        let order: Vec<_> = ledger.iter().map(|r| (r.date, r.team.as_str())).collect();
        assert_eq!(order, vec![(d1, "Duke"), (d1, "UNC"), (d2, "Duke")]);
        assert_eq!(ledger.earliest_date(), Some(d1));
        assert_eq!(ledger.latest_date(), Some(d2));

        let timelines = ledger.timelines();
        assert_eq!(timelines.len(), 2);
        let duke = &timelines["Duke"];
        assert_eq!(duke.len(), 2);
        assert!(duke[0].date < duke[1].date);
    }

    #[test]
    fn test_unmirrored() {
        let d1 = NaiveDate::from_ymd_opt(2026, 1, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let ledger = GameLedger::from_records(vec![
            game(d1, "UNC", "Duke", 70),
            game(d1, "Duke", "UNC", 75),
            game(d2, "Duke", "Clemson", 60),
        ]);
        let orphans = ledger.unmirrored();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].opponent, "Clemson");
    }
}
