//! College basketball spread model
//!
//! Point-in-time team features, matchup assembly, walk-forward backtesting and
//! performance tracking for against-the-spread picks.

pub mod backtest;
pub mod data;
pub mod features;
pub mod model;
pub mod performance;
pub mod predict;
pub mod training;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Raw box-score columns for one team in one game.
///
/// Every column is nullable at the storage boundary so that an incomplete
/// ingestion can be detected by the aggregator instead of silently defaulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxScore {
    #[serde(rename = "team_eFG")]
    pub team_efg: Option<f64>,
    #[serde(rename = "team_TO")]
    pub team_to: Option<f64>,
    #[serde(rename = "team_ORB")]
    pub team_orb: Option<f64>,
    #[serde(rename = "team_FTR")]
    pub team_ftr: Option<f64>,
    #[serde(rename = "team_3PR")]
    pub team_three_rate: Option<f64>,
    #[serde(rename = "opp_eFG")]
    pub opp_efg: Option<f64>,
    #[serde(rename = "opp_TO")]
    pub opp_to: Option<f64>,
    #[serde(rename = "opp_ORB")]
    pub opp_orb: Option<f64>,
    #[serde(rename = "opp_FTR")]
    pub opp_ftr: Option<f64>,
    #[serde(rename = "opp_3PR")]
    pub opp_three_rate: Option<f64>,
    pub possessions: Option<f64>,
}

impl BoxScore {
    /// The same game seen from the other bench: offense and defense swap.
    pub fn mirrored(&self) -> Self {
        BoxScore {
            team_efg: self.opp_efg,
            team_to: self.opp_to,
            team_orb: self.opp_orb,
            team_ftr: self.opp_ftr,
            team_three_rate: self.opp_three_rate,
            opp_efg: self.team_efg,
            opp_to: self.team_to,
            opp_orb: self.team_orb,
            opp_ftr: self.team_ftr,
            opp_three_rate: self.team_three_rate,
            possessions: self.possessions,
        }
    }
}

/// One team's perspective of one completed game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub date: NaiveDate,
    pub season: u16,
    pub team: String,
    pub opponent: String,
    pub team_score: u16,
    pub opp_score: u16,
    pub is_home: bool,
    /// Line from this team's perspective (negative = favored)
    pub spread: f64,
    #[serde(flatten)]
    pub box_score: BoxScore,
}

impl GameRecord {
    /// Raw scoring margin (positive = this team won)
    pub fn margin(&self) -> i32 {
        self.team_score as i32 - self.opp_score as i32
    }

    /// Margin adjusted by the spread (positive = this team covered)
    pub fn cover_margin(&self) -> f64 {
        self.margin() as f64 + self.spread
    }

    /// Against-the-spread result. A push is not a cover.
    pub fn covered(&self) -> bool {
        self.cover_margin() > 0.0
    }

    /// The opponent's record of the same game
    pub fn mirrored(&self) -> Self {
        GameRecord {
            date: self.date,
            season: self.season,
            team: self.opponent.clone(),
            opponent: self.team.clone(),
            team_score: self.opp_score,
            opp_score: self.team_score,
            is_home: !self.is_home,
            spread: -self.spread,
            box_score: self.box_score.mirrored(),
        }
    }
}

/// Season label for a game date.
///
/// A college season spans the new year; it is named after the year it ends in,
/// so November 2025 and March 2026 both belong to season 2026.
pub fn season_for(date: NaiveDate) -> u16 {
    if date.month() >= 7 {
        (date.year() + 1) as u16
    } else {
        date.year() as u16
    }
}

/// A betting decision, graded once the game has been played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub date: NaiveDate,
    pub picked_team: String,
    pub picked_spread: f64,
    /// max(p, 1 - p), always in [0.5, 1.0]
    pub confidence: f64,
    /// "Away @ Home" label, when known
    pub matchup: Option<String>,
    pub pick_correct: Option<bool>,
}

impl Pick {
    /// Display label such as "Michigan -21.5" or "USC +21.5"
    pub fn label(&self) -> String {
        format_line(&self.picked_team, self.picked_spread)
    }
}

/// Format a team with a signed line
pub fn format_line(team: &str, spread: f64) -> String {
    // Negating a pick'em line yields -0.0
    let spread = if spread == 0.0 { 0.0 } else { spread };
    if spread > 0.0 {
        format!("{} +{}", team, spread)
    } else {
        format!("{} {}", team, spread)
    }
}

/// Which side of a matchup a pick backs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickSide {
    Home,
    Away,
}

impl fmt::Display for PickSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickSide::Home => write!(f, "Home"),
            PickSide::Away => write!(f, "Away"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("Missing raw column {column} for {team} on {date}")]
    MissingRawColumn {
        column: &'static str,
        team: String,
        date: NaiveDate,
    },

    #[error("Insufficient history: {available} training rows, need {required}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Degenerate training labels: all {count} rows are {label}")]
    DegenerateTrainingLabels { count: usize, label: bool },

    #[error("Ambiguous join: more than one snapshot for {team} on {date}")]
    AmbiguousJoin { team: String, date: NaiveDate },

    #[error("Feature/label length mismatch: {features} feature rows, {labels} labels")]
    ShapeMismatch { features: usize, labels: usize },

    #[error("Game ledger is empty - run `cbb-edge data import` first")]
    EmptyLedger,

    #[error("Model not trained - run `cbb-edge train` first")]
    NoModel,

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, EdgeError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub backtest: BacktestConfig,
    pub training: TrainingConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub model_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub short_window: usize,
    pub medium_window: usize,
    pub volatility_window: usize,
    pub volatility_min_periods: usize,
    pub volatility_default: f64,
    pub max_rest_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub weeks_back: u32,
    pub window_days: i64,
    pub min_train_samples: usize,
    /// Picks below this confidence are computed but never recorded
    pub confidence_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Empty = plain logistic regression
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
    /// 0 = full batch
    pub batch_size: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub win_units: f64,
    pub loss_units: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            short_window: 3,
            medium_window: 5,
            volatility_window: 5,
            volatility_min_periods: 3,
            volatility_default: 10.0,
            max_rest_days: 7,
        }
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            weeks_back: 4,
            window_days: 7,
            min_train_samples: 50,
            confidence_threshold: 0.53,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 300,
            learning_rate: 0.1,
            hidden_dims: vec![],
            dropout: 0.0,
            batch_size: 0,
            seed: 42,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        // Standard -110 pricing
        LedgerConfig {
            win_units: 1.0,
            loss_units: -1.1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/cbb.db".to_string(),
                model_path: "model/spread_model".to_string(),
            },
            features: FeatureConfig::default(),
            backtest: BacktestConfig::default(),
            training: TrainingConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EdgeError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| EdgeError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EdgeError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> GameRecord {
        GameRecord {
            date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            season: 2026,
            team: "Duke".to_string(),
            opponent: "Virginia".to_string(),
            team_score: 80,
            opp_score: 77,
            is_home: true,
            spread: -5.5,
            box_score: BoxScore {
                team_efg: Some(0.55),
                opp_efg: Some(0.48),
                ..BoxScore::default()
            },
        }
    }

    #[test]
    fn test_cover_margin() {
        let r = record();
        assert_eq!(r.margin(), 3);
        assert!((r.cover_margin() - (-2.5)).abs() < 1e-12);
        assert!(!r.covered());
        assert!(r.mirrored().covered());
    }

    #[test]
    fn test_push_is_not_a_cover() {
        let mut r = record();
        r.spread = -3.0;
        assert_eq!(r.cover_margin(), 0.0);
        assert!(!r.covered());
        assert!(!r.mirrored().covered());
    }

    #[test]
    fn test_mirror_swaps_sides() {
        let r = record();
        let m = r.mirrored();
        assert_eq!(m.team, "Virginia");
        assert_eq!(m.team_score, 77);
        assert!(!m.is_home);
        assert_eq!(m.spread, 5.5);
        assert_eq!(m.box_score.team_efg, Some(0.48));
        assert_eq!(m.box_score.opp_efg, Some(0.55));
        assert_eq!(m.mirrored(), r);
    }

    #[test]
    fn test_season_for() {
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2025, 11, 4).unwrap()), 2026);
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2026, 3, 20).unwrap()), 2026);
        assert_eq!(season_for(NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()), 2026);
    }

    #[test]
    fn test_pick_label() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let mut pick = Pick {
            date,
            picked_team: "Michigan".to_string(),
            picked_spread: -21.5,
            confidence: 0.6,
            matchup: None,
            pick_correct: None,
        };
        assert_eq!(pick.label(), "Michigan -21.5");
        pick.picked_spread = 21.5;
        assert_eq!(pick.label(), "Michigan +21.5");
    }

    #[test]
    fn test_config_roundtrip_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.backtest.min_train_samples, 50);
        assert_eq!(parsed.backtest.confidence_threshold, 0.53);
        assert_eq!(parsed.ledger.loss_units, -1.1);
        assert!(parsed.training.hidden_dims.is_empty());
    }
}
