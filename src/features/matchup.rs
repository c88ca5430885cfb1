//! Matchup assembly
//!
//! Joins each aggregated row with the opponent's snapshot for the same date and
//! derives the fixed model input.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::snapshot::FeatureSnapshot;
use super::temporal::AggregatedGames;
use crate::{EdgeError, Result};

/// Model input, schema version 1
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// 1.0 if the perspective team is at home
    pub is_home: f64,
    /// Line from the perspective team's side
    pub spread: f64,
    /// Perspective team's rest days
    pub rest_days: f64,
    /// Season eFG% difference (team - opponent)
    pub diff_efg: f64,
    /// Season offensive rebound rate difference
    pub diff_rebound: f64,
    /// Season turnover rate difference
    pub diff_to: f64,
    /// Team's short-window eFG% minus its season eFG%
    pub momentum_gap: f64,
    /// Team's recent mean cover margin
    pub roll5_cover_margin: f64,
}

impl FeatureVector {
    pub const DIM: usize = 8;
    pub const SCHEMA_VERSION: u32 = 1;

    pub const NAMES: [&'static str; Self::DIM] = [
        "is_home",
        "spread",
        "rest_days",
        "diff_eFG",
        "diff_Rebound",
        "diff_TO",
        "momentum_gap",
        "roll5_cover_margin",
    ];

    /// Build from the perspective team's and opponent's snapshots
    pub fn from_snapshots(
        is_home: bool,
        spread: f64,
        rest_days: i64,
        team: &FeatureSnapshot,
        opponent: &FeatureSnapshot,
    ) -> Self {
        FeatureVector {
            is_home: if is_home { 1.0 } else { 0.0 },
            spread,
            rest_days: rest_days as f64,
            diff_efg: team.season_efg() - opponent.season_efg(),
            diff_rebound: team.season_orb() - opponent.season_orb(),
            diff_to: team.season_to() - opponent.season_to(),
            momentum_gap: team.momentum_gap(),
            roll5_cover_margin: team.roll5_cover_margin,
        }
    }

    /// Values in schema order
    pub fn to_array(&self) -> [f64; Self::DIM] {
        [
            self.is_home,
            self.spread,
            self.rest_days,
            self.diff_efg,
            self.diff_rebound,
            self.diff_to,
            self.momentum_gap,
            self.roll5_cover_margin,
        ]
    }

    /// Convert to flat vector
    pub fn to_vec(&self) -> Vec<f32> {
        self.to_array().iter().map(|&v| v as f32).collect()
    }
}

/// One historical prediction instance
#[derive(Debug, Clone)]
pub struct Matchup {
    pub date: NaiveDate,
    pub team: String,
    pub opponent: String,
    pub is_home: bool,
    pub spread: f64,
    pub team_score: u16,
    pub opp_score: u16,
    pub rest_days: i64,
    pub opponent_rest_days: i64,
    pub features: FeatureVector,
}

impl Matchup {
    /// Did the perspective team cover? A push is not a cover.
    pub fn covered(&self) -> bool {
        self.team_score as f64 + self.spread - self.opp_score as f64 > 0.0
    }
}

/// Assembled matchups for both perspectives, in `(date, team)` order
#[derive(Debug, Clone, Default)]
pub struct AssembledMatchups {
    pub matchups: Vec<Matchup>,
    /// Rows dropped because the opponent had no snapshot that day
    pub unmatched_opponent: usize,
}

impl AssembledMatchups {
    pub fn len(&self) -> usize {
        self.matchups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchups.is_empty()
    }

    /// Home-perspective rows only
    pub fn home_rows(&self) -> impl Iterator<Item = &Matchup> {
        self.matchups.iter().filter(|m| m.is_home)
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.matchups.iter().map(|m| m.date).max()
    }
}

/// Joins team snapshots into matchups
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchupAssembler;

impl MatchupAssembler {
    pub fn new() -> Self {
        MatchupAssembler
    }

    /// Join every row with the opponent's snapshot on `(date, opponent)`
    pub fn assemble(&self, games: &AggregatedGames) -> Result<AssembledMatchups> {
        let mut index: HashMap<(NaiveDate, &str), Vec<usize>> = HashMap::new();
        for (i, row) in games.rows.iter().enumerate() {
            index
                .entry((row.record.date, row.record.team.as_str()))
                .or_default()
                .push(i);
        }

        let mut matchups = Vec::with_capacity(games.rows.len());
        let mut unmatched_opponent = 0;

        for row in &games.rows {
            let r = &row.record;
            let opponent = match index.get(&(r.date, r.opponent.as_str())).map(Vec::as_slice) {
                None | Some([]) => {
                    unmatched_opponent += 1;
                    continue;
                }
                Some([only]) => &games.rows[*only],
                Some(_) => {
                    return Err(EdgeError::AmbiguousJoin {
                        team: r.opponent.clone(),
                        date: r.date,
                    })
                }
            };

            matchups.push(Matchup {
                date: r.date,
                team: r.team.clone(),
                opponent: r.opponent.clone(),
                is_home: r.is_home,
                spread: r.spread,
                team_score: r.team_score,
                opp_score: r.opp_score,
                rest_days: row.rest_days,
                opponent_rest_days: opponent.rest_days,
                features: FeatureVector::from_snapshots(
                    r.is_home,
                    r.spread,
                    row.rest_days,
                    &row.snapshot,
                    &opponent.snapshot,
                ),
            });
        }

        if unmatched_opponent > 0 {
            log::info!(
                "Dropped {} rows with no opponent snapshot",
                unmatched_opponent
            );
        }

        Ok(AssembledMatchups {
            matchups,
            unmatched_opponent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameLedger;
    use crate::features::temporal::TemporalAggregator;
    use crate::{BoxScore, GameRecord};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn box_score(efg: f64, orb: f64, to: f64) -> BoxScore {
        BoxScore {
            team_efg: Some(efg),
            team_to: Some(to),
            team_orb: Some(orb),
            team_ftr: Some(0.3),
            team_three_rate: Some(0.4),
            opp_efg: Some(0.5),
            opp_to: Some(0.18),
            opp_orb: Some(0.3),
            opp_ftr: Some(0.3),
            opp_three_rate: Some(0.4),
            possessions: Some(68.0),
        }
    }

    /// Both records of a game the home side wins 75-70 laying 3.5
    fn game(
        d: u32,
        home: &str,
        away: &str,
        home_box: BoxScore,
        away_box: BoxScore,
    ) -> Vec<GameRecord> {
        let home_rec = GameRecord {
            date: day(d),
            season: 2026,
            team: home.to_string(),
            opponent: away.to_string(),
            team_score: 75,
            opp_score: 70,
            is_home: true,
            spread: -3.5,
            box_score: home_box,
        };
        let mut away_rec = home_rec.mirrored();
        away_rec.box_score = away_box;
        vec![home_rec, away_rec]
    }

    fn ledger() -> GameLedger {
        let a = box_score(0.55, 0.35, 0.12);
        let b = box_score(0.47, 0.25, 0.20);
        let mut records = vec![];
        records.extend(game(2, "Alabama", "Auburn", a, b));
        records.extend(game(6, "Auburn", "Alabama", b, a));
        records.extend(game(10, "Alabama", "Auburn", a, b));
        // Tennessee debuts on the 10th, so Kentucky's opponent has no snapshot
        records.extend(game(3, "Kentucky", "Florida", a, b));
        records.extend(game(10, "Kentucky", "Tennessee", a, b));
        GameLedger::from_records(records)
    }

    #[test]
    fn test_assemble_both_perspectives() {
        let games = TemporalAggregator::default().aggregate(&ledger()).unwrap();
        let out = MatchupAssembler::new().assemble(&games).unwrap();

        // Alabama/Auburn on the 6th and 10th, both sides each
        assert_eq!(out.len(), 4);
        assert_eq!(out.home_rows().count(), 2);
        assert_eq!(out.unmatched_opponent, 1);

        let m = out
            .matchups
            .iter()
            .find(|m| m.date == day(6) && m.team == "Auburn")
            .unwrap();
        let f = m.features;
        assert_eq!(f.is_home, 1.0);
        assert_eq!(f.spread, -3.5);
        assert_eq!(f.rest_days, 4.0);
        assert!((f.diff_efg - (0.47 - 0.55)).abs() < 1e-12);
        assert!((f.diff_rebound - (0.25 - 0.35)).abs() < 1e-12);
        assert!((f.diff_to - (0.20 - 0.12)).abs() < 1e-12);
        // Only one prior game, so short roll equals season mean
        assert_eq!(f.momentum_gap, 0.0);
        // Auburn was the away side on the 2nd: 70 + 3.5 - 75
        assert_eq!(f.roll5_cover_margin, -1.5);
        assert!(m.covered());
        assert_eq!(m.opponent_rest_days, 4);
    }

    #[test]
    fn test_ambiguous_join() {
        let mut games = TemporalAggregator::default().aggregate(&ledger()).unwrap();
        let dup = games
            .rows
            .iter()
            .find(|r| r.record.team == "Auburn" && r.record.date == day(6))
            .cloned()
            .unwrap();
        games.rows.push(dup);

        match MatchupAssembler::new().assemble(&games) {
            Err(EdgeError::AmbiguousJoin { team, date }) => {
                assert_eq!(team, "Auburn");
                assert_eq!(date, day(6));
            }
            other => panic!("expected AmbiguousJoin, got {:?}", other.map(|m| m.len())),
        }
    }

    #[test]
    fn test_vector_order() {
        let f = FeatureVector {
            is_home: 1.0,
            spread: -2.0,
            rest_days: 3.0,
            diff_efg: 0.1,
            diff_rebound: 0.2,
            diff_to: 0.3,
            momentum_gap: 0.4,
            roll5_cover_margin: 5.0,
        };
        assert_eq!(f.to_array(), [1.0, -2.0, 3.0, 0.1, 0.2, 0.3, 0.4, 5.0]);
        assert_eq!(f.to_vec().len(), FeatureVector::DIM);
        assert_eq!(FeatureVector::NAMES[3], "diff_eFG");
    }
}
