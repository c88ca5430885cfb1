//! Forward-looking picks for upcoming games

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backtest::make_pick;
use crate::data::{NameResolver, ScheduledGame};
use crate::features::{FeatureVector, LatestSnapshot, TemporalAggregator};
use crate::training::Classifier;
use crate::{EdgeError, FeatureConfig, Pick, PickSide, Result};

/// A pick for an upcoming game, with the inputs it was made from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivePick {
    pub game_date: NaiveDate,
    pub home: String,
    pub away: String,
    /// Line from the home side
    pub home_spread: f64,
    /// P(home covers)
    pub home_probability: f64,
    pub home_rest_days: i64,
    pub away_rest_days: i64,
    pub side: PickSide,
    pub pick: Pick,
}

/// Picks plus the schedule rows that could not be scored
#[derive(Debug, Clone, Default)]
pub struct LivePredictions {
    /// Sorted by descending confidence
    pub picks: Vec<LivePick>,
    /// Games with a team name the resolver did not know
    pub unresolved: usize,
    /// Games with a team that has no snapshot with season history
    pub missing_snapshot: usize,
}

impl LivePredictions {
    /// Picks at or above `threshold`
    pub fn actionable(&self, threshold: f64) -> impl Iterator<Item = &LivePick> {
        self.picks.iter().filter(move |p| p.pick.confidence >= threshold)
    }
}

/// Scores an upcoming schedule from each team's latest snapshot
pub struct LivePredictor<'a> {
    snapshots: &'a BTreeMap<String, LatestSnapshot>,
    aggregator: TemporalAggregator,
}

impl<'a> LivePredictor<'a> {
    pub fn new(snapshots: &'a BTreeMap<String, LatestSnapshot>, features: FeatureConfig) -> Self {
        LivePredictor {
            snapshots,
            aggregator: TemporalAggregator::new(features),
        }
    }

    /// Score every scheduled game that resolves to two known teams
    pub fn predict<C, R>(
        &self,
        classifier: &C,
        resolver: &R,
        schedule: &[ScheduledGame],
    ) -> Result<LivePredictions>
    where
        C: Classifier,
        R: NameResolver,
    {
        let mut out = LivePredictions::default();
        let mut games = vec![];
        let mut features = vec![];

        for game in schedule {
            let (Some(home), Some(away)) = (resolver.resolve(&game.home), resolver.resolve(&game.away))
            else {
                log::warn!("Unresolved team in {} @ {}", game.away, game.home);
                out.unresolved += 1;
                continue;
            };
            let (Some(home_snap), Some(away_snap)) = (self.snapshots.get(&home), self.snapshots.get(&away))
            else {
                log::warn!("No history for {} @ {}", away, home);
                out.missing_snapshot += 1;
                continue;
            };

            let home_rest = self
                .aggregator
                .rest_days(Some(home_snap.last_played), game.date);
            let away_rest = self
                .aggregator
                .rest_days(Some(away_snap.last_played), game.date);

            features.push(FeatureVector::from_snapshots(
                true,
                game.spread,
                home_rest,
                &home_snap.snapshot,
                &away_snap.snapshot,
            ));
            games.push((game, home, away, home_rest, away_rest));
        }

        if games.is_empty() {
            return Ok(out);
        }

        let probabilities = classifier.predict_probability(&features)?;
        if probabilities.len() != games.len() {
            return Err(EdgeError::ShapeMismatch {
                features: games.len(),
                labels: probabilities.len(),
            });
        }

        for ((game, home, away, home_rest, away_rest), p) in games.into_iter().zip(probabilities) {
            let (side, pick) = make_pick(game.date, &home, &away, game.spread, p);
            out.picks.push(LivePick {
                game_date: game.date,
                home,
                away,
                home_spread: game.spread,
                home_probability: p,
                home_rest_days: home_rest,
                away_rest_days: away_rest,
                side,
                pick,
            });
        }

        out.picks.sort_by(|a, b| b.pick.confidence.total_cmp(&a.pick.confidence));
        Ok(out)
    }
}

/// Plain-text table of live picks
pub fn format_picks(picks: &[LivePick], threshold: f64) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10}  {:<40}  {:<28}  {:>6}  {:>9}\n",
        "Date", "Matchup", "Pick", "Conf", "Rest H/A"
    ));
    out.push_str(&format!("{}\n", "─".repeat(101)));
    for p in picks {
        let marker = if p.pick.confidence >= threshold { "*" } else { " " };
        out.push_str(&format!(
            "{:<10}  {:<40}  {:<28}  {:>5.1}%{}  {:>4}/{:<4}\n",
            p.game_date,
            format!("{} @ {}", p.away, p.home),
            p.pick.label(),
            p.pick.confidence * 100.0,
            marker,
            p.home_rest_days,
            p.away_rest_days
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AliasTable, GameLedger};
    use crate::{BoxScore, GameRecord};

    /// Home cover probability rises with the eFG differential
    struct EfgClassifier;

    impl Classifier for EfgClassifier {
        fn fit(&mut self, _features: &[FeatureVector], _labels: &[bool]) -> Result<()> {
            Ok(())
        }

        fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
            Ok(features.iter().map(|f| 0.5 + f.diff_efg).collect())
        }
    }

    struct ShortClassifier;

    impl Classifier for ShortClassifier {
        fn fit(&mut self, _features: &[FeatureVector], _labels: &[bool]) -> Result<()> {
            Ok(())
        }

        fn predict_probability(&self, _features: &[FeatureVector]) -> Result<Vec<f64>> {
            Ok(vec![])
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    fn game(date: NaiveDate, team: &str, opponent: &str, efg: f64) -> GameRecord {
        GameRecord {
            date,
            season: 2026,
            team: team.to_string(),
            opponent: opponent.to_string(),
            team_score: 70,
            opp_score: 65,
            is_home: true,
            spread: -3.0,
            box_score: BoxScore {
                team_efg: Some(efg),
                team_to: Some(0.16),
                team_orb: Some(0.30),
                team_ftr: Some(0.30),
                team_three_rate: Some(0.40),
                opp_efg: Some(0.50),
                opp_to: Some(0.16),
                opp_orb: Some(0.30),
                opp_ftr: Some(0.30),
                opp_three_rate: Some(0.40),
                possessions: Some(68.0),
            },
        }
    }

    /// Duke shoots 0.60, Virginia 0.45, Kansas 0.50
    fn snapshots() -> BTreeMap<String, LatestSnapshot> {
        let ledger = GameLedger::from_records(vec![
            game(day(1), "Duke", "X", 0.60),
            game(day(3), "Duke", "X", 0.60),
            game(day(1), "Virginia", "Y", 0.45),
            game(day(2), "Virginia", "Y", 0.45),
            game(day(1), "Kansas", "Z", 0.50),
            game(day(4), "Kansas", "Z", 0.50),
        ]);
        TemporalAggregator::default().latest_snapshots(&ledger).unwrap()
    }

    fn scheduled(home: &str, away: &str, spread: f64) -> ScheduledGame {
        ScheduledGame {
            home: home.to_string(),
            away: away.to_string(),
            date: day(6),
            spread,
        }
    }

    fn resolver() -> AliasTable {
        AliasTable::new(
            ["Duke", "Virginia", "Kansas"],
            vec![("UVA".to_string(), "Virginia".to_string())],
        )
    }

    #[test]
    fn test_predicts_resolved_games() {
        let snaps = snapshots();
        let predictor = LivePredictor::new(&snaps, FeatureConfig::default());
        let schedule = vec![
            scheduled("Virginia", "Kansas", 2.5),
            scheduled("duke", "UVA", -7.5),
        ];
        let out = predictor.predict(&EfgClassifier, &resolver(), &schedule).unwrap();

        assert_eq!(out.picks.len(), 2);
        assert_eq!(out.unresolved, 0);

        // Highest confidence first: Duke vs Virginia is the widest gap
        let top = &out.picks[0];
        assert_eq!(top.home, "Duke");
        assert_eq!(top.away, "Virginia");
        assert_eq!(top.side, PickSide::Home);
        assert_eq!(top.pick.label(), "Duke -7.5");
        assert!((top.home_probability - 0.65).abs() < 1e-9);
        assert_eq!(top.home_rest_days, 3);
        assert_eq!(top.away_rest_days, 4);

        let second = &out.picks[1];
        assert_eq!(second.side, PickSide::Away);
        assert_eq!(second.pick.picked_team, "Kansas");
        assert!((second.pick.picked_spread + 2.5).abs() < 1e-12);
        assert!(second.pick.pick_correct.is_none());
    }

    #[test]
    fn test_skips_unknown_and_unplayed_teams() {
        let snaps = snapshots();
        let predictor = LivePredictor::new(&snaps, FeatureConfig::default());
        let resolver = AliasTable::new(["Duke", "Virginia", "Kansas", "Baylor"], vec![]);
        let schedule = vec![
            scheduled("Duke", "Nowhere State", -20.0),
            scheduled("Baylor", "Kansas", 1.0),
            scheduled("Kansas", "Duke", 4.0),
        ];
        let out = predictor.predict(&EfgClassifier, &resolver, &schedule).unwrap();

        assert_eq!(out.unresolved, 1);
        assert_eq!(out.missing_snapshot, 1);
        assert_eq!(out.picks.len(), 1);
        assert_eq!(out.picks[0].pick.picked_team, "Duke");
    }

    #[test]
    fn test_actionable_filter() {
        let snaps = snapshots();
        let predictor = LivePredictor::new(&snaps, FeatureConfig::default());
        let schedule = vec![
            scheduled("Duke", "Virginia", -7.5),
            scheduled("Kansas", "Virginia", -1.0),
        ];
        let out = predictor.predict(&EfgClassifier, &resolver(), &schedule).unwrap();
        assert_eq!(out.actionable(0.6).count(), 1);
        assert_eq!(out.actionable(0.5).count(), 2);
    }

    #[test]
    fn test_empty_schedule_skips_classifier() {
        let snaps = snapshots();
        let predictor = LivePredictor::new(&snaps, FeatureConfig::default());
        let out = predictor.predict(&ShortClassifier, &resolver(), &[]).unwrap();
        assert!(out.picks.is_empty());
    }

    #[test]
    fn test_short_prediction_is_an_error() {
        let snaps = snapshots();
        let predictor = LivePredictor::new(&snaps, FeatureConfig::default());
        let schedule = vec![scheduled("Duke", "Virginia", -7.5)];
        let err = predictor
            .predict(&ShortClassifier, &resolver(), &schedule)
            .unwrap_err();
        assert!(matches!(err, EdgeError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_format_marks_actionable() {
        let snaps = snapshots();
        let predictor = LivePredictor::new(&snaps, FeatureConfig::default());
        let schedule = vec![scheduled("Duke", "Virginia", -7.5)];
        let out = predictor.predict(&EfgClassifier, &resolver(), &schedule).unwrap();
        let table = format_picks(&out.picks, 0.6);
        assert!(table.contains("Virginia @ Duke"));
        assert!(table.contains("65.0%*"));
    }
}
