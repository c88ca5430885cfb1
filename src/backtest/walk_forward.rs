//! Walk-forward evaluation
//!
//! Steps a weekly cursor over the most recent weeks of the ledger. Each window
//! gets a fresh classifier fitted only on matchups dated before the window,
//! then scores the window's home-side rows.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use super::picks::{grade_side, make_pick};
use crate::features::{AssembledMatchups, FeatureVector, Matchup};
use crate::training::{check_training_set, Classifier};
use crate::{BacktestConfig, EdgeError, Pick, Result};

/// A `[start, end)` test interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktestWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BacktestWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

/// Outcome of one evaluated window
#[derive(Debug, Clone)]
pub struct WindowResult {
    pub window: BacktestWindow,
    pub training_rows: usize,
    pub test_rows: usize,
    /// Graded picks at or above the confidence threshold
    pub picks: Vec<Pick>,
}

impl WindowResult {
    pub fn wins(&self) -> usize {
        self.picks.iter().filter(|p| p.pick_correct == Some(true)).count()
    }
}

/// Result of a full walk
#[derive(Debug, Clone, Default)]
pub struct BacktestReport {
    pub windows: Vec<WindowResult>,
    /// Windows skipped for lack of training rows
    pub windows_skipped: usize,
    /// Windows with no home rows to score
    pub windows_empty: usize,
    pub picks_considered: usize,
    pub picks_retained: usize,
}

impl BacktestReport {
    /// All retained picks in window order
    pub fn picks(&self) -> Vec<Pick> {
        self.windows.iter().flat_map(|w| w.picks.iter().cloned()).collect()
    }

    /// Retained picks grouped by game date.
    ///
    /// Every day of every evaluated window has an entry, empty when nothing
    /// was retained, so persisting the map replaces stale rows for those days.
    pub fn picks_by_date(&self) -> BTreeMap<NaiveDate, Vec<Pick>> {
        let mut by_date: BTreeMap<NaiveDate, Vec<Pick>> = BTreeMap::new();
        for result in &self.windows {
            for date in result.window.days() {
                by_date.entry(date).or_default();
            }
            for pick in &result.picks {
                by_date.entry(pick.date).or_default().push(pick.clone());
            }
        }
        by_date
    }
}

/// Expanding-window backtest driver
#[derive(Debug, Clone)]
pub struct WalkForwardEvaluator {
    config: BacktestConfig,
}

impl WalkForwardEvaluator {
    pub fn new(config: BacktestConfig) -> Self {
        WalkForwardEvaluator { config }
    }

    /// Test windows from `latest - weeks_back` up to and including `latest`
    pub fn windows(&self, latest: NaiveDate) -> Vec<BacktestWindow> {
        let step = Duration::days(self.config.window_days.max(1));
        let end = latest + Duration::days(1);
        let mut cursor = latest - Duration::weeks(self.config.weeks_back as i64);

        let mut windows = vec![];
        while cursor < end {
            windows.push(BacktestWindow {
                start: cursor,
                end: cursor + step,
            });
            cursor += step;
        }
        windows
    }

    /// Run the walk, building one classifier per window from `factory`.
    ///
    /// Any error aborts the whole run; callers persist only a finished report.
    pub fn run<C, F>(&self, matchups: &AssembledMatchups, mut factory: F) -> Result<BacktestReport>
    where
        C: Classifier,
        F: FnMut() -> C,
    {
        let latest = matchups.latest_date().ok_or(EdgeError::EmptyLedger)?;
        let mut report = BacktestReport::default();

        for window in self.windows(latest) {
            let train: Vec<&Matchup> = matchups
                .matchups
                .iter()
                .filter(|m| m.date < window.start)
                .collect();

            if train.len() < self.config.min_train_samples {
                log::info!(
                    "Window {}: {}",
                    window.start,
                    EdgeError::InsufficientHistory {
                        available: train.len(),
                        required: self.config.min_train_samples,
                    }
                );
                report.windows_skipped += 1;
                continue;
            }

            let test: Vec<&Matchup> = matchups.home_rows().filter(|m| window.contains(m.date)).collect();
            if test.is_empty() {
                report.windows_empty += 1;
                continue;
            }

            let features: Vec<FeatureVector> = train.iter().map(|m| m.features).collect();
            let labels: Vec<bool> = train.iter().map(|m| m.covered()).collect();
            check_training_set(&features, &labels)?;

            let mut classifier = factory();
            classifier.fit(&features, &labels)?;

            let test_features: Vec<FeatureVector> = test.iter().map(|m| m.features).collect();
            let probabilities = classifier.predict_probability(&test_features)?;
            if probabilities.len() != test.len() {
                return Err(EdgeError::ShapeMismatch {
                    features: test.len(),
                    labels: probabilities.len(),
                });
            }

            let mut picks = vec![];
            for (m, &p) in test.iter().zip(probabilities.iter()) {
                let (side, mut pick) = make_pick(m.date, &m.team, &m.opponent, m.spread, p);
                pick.pick_correct = Some(grade_side(side, m.spread, m.team_score, m.opp_score));
                report.picks_considered += 1;
                if pick.confidence >= self.config.confidence_threshold {
                    picks.push(pick);
                }
            }
            report.picks_retained += picks.len();

            let result = WindowResult {
                window,
                training_rows: train.len(),
                test_rows: test.len(),
                picks,
            };
            log::info!(
                "Window {}..{}: trained on {}, scored {}, kept {} ({} correct)",
                window.start,
                window.end,
                result.training_rows,
                result.test_rows,
                result.picks.len(),
                result.wins()
            );
            report.windows.push(result);
        }

        log::info!(
            "Backtest complete: {} windows evaluated, {} skipped, {}/{} picks retained",
            report.windows.len(),
            report.windows_skipped,
            report.picks_retained,
            report.picks_considered
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Returns P(home covers) from the spread sign, and logs each fit's size
    struct StubClassifier {
        fits: Rc<RefCell<Vec<usize>>>,
        strength: f64,
    }

    impl Classifier for StubClassifier {
        fn fit(&mut self, features: &[FeatureVector], _labels: &[bool]) -> Result<()> {
            self.fits.borrow_mut().push(features.len());
            Ok(())
        }

        fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
            Ok(features
                .iter()
                .map(|f| if f.spread < 0.0 { 0.5 + self.strength } else { 0.5 - self.strength })
                .collect())
        }
    }

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + Duration::days(offset)
    }

    fn matchup(date: NaiveDate, team: &str, opponent: &str, is_home: bool, spread: f64, score: u16) -> Matchup {
        Matchup {
            date,
            team: team.to_string(),
            opponent: opponent.to_string(),
            is_home,
            spread,
            team_score: score,
            opp_score: 70,
            rest_days: 3,
            opponent_rest_days: 3,
            features: FeatureVector {
                is_home: is_home as u8 as f64,
                spread,
                ..FeatureVector::default()
            },
        }
    }

    /// Two games a day for `days` days; home favourites alternate covering
    fn season(days: i64) -> AssembledMatchups {
        let mut matchups = vec![];
        for d in 0..days {
            for g in 0..2 {
                let home_score = if (d + g) % 2 == 0 { 80 } else { 72 };
                let home = matchup(day(d), &format!("H{}", g), &format!("A{}", g), true, -5.5, home_score);
                let mut away = matchup(day(d), &format!("A{}", g), &format!("H{}", g), false, 5.5, 70);
                away.opp_score = home_score;
                matchups.push(home);
                matchups.push(away);
            }
        }
        AssembledMatchups {
            matchups,
            unmatched_opponent: 0,
        }
    }

    fn stub(fits: &Rc<RefCell<Vec<usize>>>, strength: f64) -> impl FnMut() -> StubClassifier {
        let fits = Rc::clone(fits);
        move || StubClassifier {
            fits: Rc::clone(&fits),
            strength,
        }
    }

    #[test]
    fn test_windows_do_not_overlap() {
        let evaluator = WalkForwardEvaluator::new(BacktestConfig::default());
        let latest = day(60);
        let windows = evaluator.windows(latest);

        assert_eq!(windows.len(), 5);
        assert_eq!(windows[0].start, latest - Duration::weeks(4));
        for pair in windows.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!((pair[0].end - pair[0].start).num_days(), 7);
        }
        assert!(windows.last().unwrap().contains(latest));
    }

    #[test]
    fn test_trains_only_on_earlier_rows() {
        let matchups = season(61);
        let fits = Rc::new(RefCell::new(vec![]));
        let evaluator = WalkForwardEvaluator::new(BacktestConfig::default());
        let report = evaluator.run(&matchups, stub(&fits, 0.1)).unwrap();

        assert_eq!(report.windows.len(), 5);
        for (result, &fit_rows) in report.windows.iter().zip(fits.borrow().iter()) {
            let expected = matchups
                .matchups
                .iter()
                .filter(|m| m.date < result.window.start)
                .count();
            assert_eq!(fit_rows, expected);
            assert_eq!(result.training_rows, expected);
            assert!(result.picks.iter().all(|p| result.window.contains(p.date)));
        }
        // Each test row is a home row: two per day
        let tested: usize = report.windows.iter().map(|w| w.test_rows).sum();
        assert_eq!(tested, 2 * 29);
    }

    #[test]
    fn test_grading_and_threshold() {
        let matchups = season(61);
        let fits = Rc::new(RefCell::new(vec![]));
        let evaluator = WalkForwardEvaluator::new(BacktestConfig::default());

        // Home favourites picked with 0.6 confidence: right on every 80-70 game
        let report = evaluator.run(&matchups, stub(&fits, 0.1)).unwrap();
        assert_eq!(report.picks_considered, report.picks_retained);
        for pick in report.picks() {
            assert!(pick.picked_team.starts_with('H'));
            assert_eq!(pick.picked_spread, -5.5);
        }
        let wins = report.picks().iter().filter(|p| p.pick_correct == Some(true)).count();
        assert_eq!(wins, 29);

        // 0.52 confidence falls under the 0.53 threshold
        let report = evaluator.run(&matchups, stub(&fits, 0.02)).unwrap();
        assert_eq!(report.picks_considered, 58);
        assert_eq!(report.picks_retained, 0);
        assert!(report.picks().is_empty());
    }

    #[test]
    fn test_picks_by_date_covers_every_evaluated_day() {
        let matchups = season(61);
        let fits = Rc::new(RefCell::new(vec![]));
        let evaluator = WalkForwardEvaluator::new(BacktestConfig::default());

        // Nothing clears the threshold, yet each window day still gets an entry
        let report = evaluator.run(&matchups, stub(&fits, 0.02)).unwrap();
        let by_date = report.picks_by_date();
        let days: usize = report.windows.iter().map(|w| w.window.days().count()).sum();
        assert_eq!(days, 35);
        assert_eq!(by_date.len(), days);
        assert!(by_date.values().all(|picks| picks.is_empty()));
        let first = report.windows[0].window.start;
        assert!(by_date.contains_key(&first));
        assert!(by_date.contains_key(&(first + Duration::days(6))));

        // Games stop at day 60; the last window's later days are empty
        let report = evaluator.run(&matchups, stub(&fits, 0.1)).unwrap();
        let by_date = report.picks_by_date();
        assert_eq!(by_date[&day(60)].len(), 2);
        assert!(by_date[&(day(60) + Duration::days(1))].is_empty());
        let total: usize = by_date.values().map(Vec::len).sum();
        assert_eq!(total, report.picks_retained);
    }

    #[test]
    fn test_skips_windows_without_history() {
        // 20 days of games: 80 rows total, the first windows have fewer than 50
        let matchups = season(20);
        let fits = Rc::new(RefCell::new(vec![]));
        let evaluator = WalkForwardEvaluator::new(BacktestConfig::default());
        let report = evaluator.run(&matchups, stub(&fits, 0.1)).unwrap();

        assert!(report.windows_skipped > 0);
        assert_eq!(report.windows_skipped + report.windows_empty + report.windows.len(), 5);
        assert_eq!(fits.borrow().len(), report.windows.len());
        assert!(report.windows.iter().all(|w| w.training_rows >= 50));
    }

    #[test]
    fn test_degenerate_labels_abort() {
        let mut matchups = season(61);
        for m in matchups.matchups.iter_mut() {
            m.team_score = 100;
            m.opp_score = 50;
        }
        let fits = Rc::new(RefCell::new(vec![]));
        let evaluator = WalkForwardEvaluator::new(BacktestConfig::default());
        let result = evaluator.run(&matchups, stub(&fits, 0.1));

        assert!(matches!(
            result,
            Err(EdgeError::DegenerateTrainingLabels { label: true, .. })
        ));
        assert!(fits.borrow().is_empty());
    }

    #[test]
    fn test_empty_input() {
        let fits = Rc::new(RefCell::new(vec![]));
        let evaluator = WalkForwardEvaluator::new(BacktestConfig::default());
        let result = evaluator.run(&AssembledMatchups::default(), stub(&fits, 0.1));
        assert!(matches!(result, Err(EdgeError::EmptyLedger)));
    }
}
