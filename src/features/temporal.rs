//! Point-in-time team aggregation
//!
//! Walks every team's timeline in date order and computes, for each game, the
//! statistics the team carried into it. Only strictly earlier games contribute.
//!
//! - Season means: expanding mean over prior games of the same season
//! - Rolling means: last `k` prior games, crossing season boundaries
//! - Score volatility: sample std of recent team scores, with a floor default
//! - Rest days: gap to the previous game, clipped to `[0, max_rest_days]`

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::snapshot::FeatureSnapshot;
use super::stat_line::{StatColumn, StatLine};
use crate::data::GameLedger;
use crate::{FeatureConfig, GameRecord, Result};

/// A game together with the team's entering statistics
#[derive(Debug, Clone)]
pub struct AggregatedRow {
    pub record: GameRecord,
    pub rest_days: i64,
    pub snapshot: FeatureSnapshot,
}

/// Aggregator output, ordered by `(date, team)`
#[derive(Debug, Clone, Default)]
pub struct AggregatedGames {
    pub rows: Vec<AggregatedRow>,
    /// Rows dropped because the team had no earlier game in the season
    pub dropped_debuts: usize,
}

/// Snapshot a team would carry into its next game
#[derive(Debug, Clone)]
pub struct LatestSnapshot {
    pub snapshot: FeatureSnapshot,
    pub last_played: NaiveDate,
}

/// One completed game, reduced to what later snapshots need
struct HistoryEntry {
    date: NaiveDate,
    season: u16,
    line: StatLine,
    cover_margin: f64,
}

/// Computes leakage-free snapshots from a game ledger
#[derive(Debug, Clone, Default)]
pub struct TemporalAggregator {
    config: FeatureConfig,
}

impl TemporalAggregator {
    pub fn new(config: FeatureConfig) -> Self {
        TemporalAggregator { config }
    }

    /// Entering snapshot for every record in the ledger.
    ///
    /// Fails on the first record (in `(date, team)` order) with a null raw column.
    pub fn aggregate(&self, ledger: &GameLedger) -> Result<AggregatedGames> {
        let histories = self.histories(ledger)?;

        let mut rows = Vec::with_capacity(ledger.len());
        let mut dropped_debuts = 0;

        for (team, games) in ledger.timelines() {
            let history = &histories[team];
            for (i, record) in games.into_iter().enumerate() {
                let prior = &history[..i];
                let snapshot = self.entering(prior, record.season);
                if !snapshot.has_season_history() {
                    dropped_debuts += 1;
                    continue;
                }
                rows.push(AggregatedRow {
                    record: record.clone(),
                    rest_days: self.rest_days(prior.last().map(|h| h.date), record.date),
                    snapshot,
                });
            }
        }

        rows.sort_by(|a, b| {
            (a.record.date, &a.record.team).cmp(&(b.record.date, &b.record.team))
        });

        log::debug!(
            "Aggregated {} rows ({} season debuts dropped)",
            rows.len(),
            dropped_debuts
        );

        Ok(AggregatedGames {
            rows,
            dropped_debuts,
        })
    }

    /// Most recent entering snapshot per team, for scoring its next game.
    ///
    /// This is the snapshot of the team's last game that carried season
    /// history, so live inputs come from the same distribution as training
    /// rows. `last_played` is the team's last game date for rest days. Teams
    /// with no such game are left out.
    pub fn latest_snapshots(&self, ledger: &GameLedger) -> Result<BTreeMap<String, LatestSnapshot>> {
        let histories = self.histories(ledger)?;
        let mut latest = BTreeMap::new();

        for (team, history) in histories {
            let Some(last) = history.last() else {
                continue;
            };
            let snapshot = (0..history.len())
                .rev()
                .map(|i| self.entering(&history[..i], history[i].season))
                .find(FeatureSnapshot::has_season_history);
            let Some(snapshot) = snapshot else {
                log::debug!("No snapshot with season history for {}", team);
                continue;
            };
            latest.insert(
                team.to_string(),
                LatestSnapshot {
                    snapshot,
                    last_played: last.date,
                },
            );
        }
        Ok(latest)
    }

    /// Rest days between the previous game and `date`
    pub fn rest_days(&self, previous: Option<NaiveDate>, date: NaiveDate) -> i64 {
        match previous {
            Some(prev) => (date - prev).num_days().clamp(0, self.config.max_rest_days),
            None => self.config.max_rest_days,
        }
    }

    fn histories<'a>(&self, ledger: &'a GameLedger) -> Result<BTreeMap<&'a str, Vec<HistoryEntry>>> {
        // Validate in ledger order so the reported column is deterministic
        let mut lines = BTreeMap::new();
        for record in ledger.iter() {
            lines.insert((record.date, record.team.as_str()), StatLine::from_record(record)?);
        }

        let mut histories = BTreeMap::new();
        for (team, games) in ledger.timelines() {
            let entries = games
                .into_iter()
                .map(|r| HistoryEntry {
                    date: r.date,
                    season: r.season,
                    line: lines[&(r.date, team)],
                    cover_margin: r.cover_margin(),
                })
                .collect();
            histories.insert(team, entries);
        }
        Ok(histories)
    }

    /// Statistics entering a game of `season`, given the team's prior games
    fn entering(&self, prior: &[HistoryEntry], season: u16) -> FeatureSnapshot {
        let season_games = prior
            .iter()
            .rev()
            .take_while(|h| h.season == season)
            .count();
        let season_slice = &prior[prior.len() - season_games..];

        FeatureSnapshot {
            season: StatLine::mean(season_slice.iter().map(|h| &h.line)),
            roll_short: Self::rolling_mean(prior, self.config.short_window),
            roll_medium: Self::rolling_mean(prior, self.config.medium_window),
            score_volatility: self.score_volatility(prior),
            roll5_cover_margin: Self::rolling_cover_margin(prior, self.config.medium_window),
            season_games,
        }
    }

    fn tail(prior: &[HistoryEntry], window: usize) -> &[HistoryEntry] {
        &prior[prior.len().saturating_sub(window)..]
    }

    /// Empty history leaves the neutral zero fill
    fn rolling_mean(prior: &[HistoryEntry], window: usize) -> StatLine {
        StatLine::mean(Self::tail(prior, window).iter().map(|h| &h.line))
    }

    fn rolling_cover_margin(prior: &[HistoryEntry], window: usize) -> f64 {
        let tail = Self::tail(prior, window);
        if tail.is_empty() {
            return 0.0;
        }
        tail.iter().map(|h| h.cover_margin).sum::<f64>() / tail.len() as f64
    }

    fn score_volatility(&self, prior: &[HistoryEntry]) -> f64 {
        let tail = Self::tail(prior, self.config.volatility_window);
        if tail.len() < self.config.volatility_min_periods.max(2) {
            return self.config.volatility_default;
        }
        let scores: Vec<f64> = tail.iter().map(|h| h.line[StatColumn::TeamScore]).collect();
        let n = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let var = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    }
}
