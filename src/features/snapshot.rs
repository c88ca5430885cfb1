//! Entering statistics for a team on a given date

use serde::{Deserialize, Serialize};

use super::stat_line::{StatColumn, StatLine};

/// A team's statistics as of, but excluding, one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// Season-to-date means over prior games in the same season
    pub season: StatLine,
    /// Short rolling window means (3 games by default)
    pub roll_short: StatLine,
    /// Medium rolling window means (5 games by default)
    pub roll_medium: StatLine,
    /// Sample std of recent team scores
    pub score_volatility: f64,
    /// Mean cover margin over the medium window
    pub roll5_cover_margin: f64,
    /// Prior games in the same season
    pub season_games: usize,
}

impl FeatureSnapshot {
    /// True if the team has played at least once this season
    pub fn has_season_history(&self) -> bool {
        self.season_games > 0
    }

    pub fn season_efg(&self) -> f64 {
        self.season[StatColumn::TeamEfg]
    }

    pub fn season_orb(&self) -> f64 {
        self.season[StatColumn::TeamOrb]
    }

    pub fn season_to(&self) -> f64 {
        self.season[StatColumn::TeamTo]
    }

    /// Recent shooting relative to the season baseline
    pub fn momentum_gap(&self) -> f64 {
        self.roll_short[StatColumn::TeamEfg] - self.season[StatColumn::TeamEfg]
    }
}
