//! Ingestion and schedule adapters
//!
//! Remote scoreboard services sit behind [`GameSource`] and [`ScheduleSource`];
//! the shipped adapters read JSON files produced by whatever fetcher is in use.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::GameLedger;
use crate::{season_for, BoxScore, EdgeError, GameRecord, Result};

/// A source of completed games
pub trait GameSource {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Completed games with `start <= date <= end`
    fn fetch_completed(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<GameRecord>>;
}

/// A source of upcoming games with posted lines
pub trait ScheduleSource {
    fn fetch_upcoming(&self) -> Result<Vec<ScheduledGame>>;
}

/// An upcoming game, line quoted from the home side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub home: String,
    pub away: String,
    pub date: NaiveDate,
    pub spread: f64,
}

/// Row layout of a game file; `season` is derived from the date when absent.
///
/// `spread` is optional only so a missing line can be reported by column.
#[derive(Debug, Clone, Deserialize)]
struct GameRow {
    date: NaiveDate,
    #[serde(default)]
    season: Option<u16>,
    team: String,
    opponent: String,
    team_score: u16,
    opp_score: u16,
    is_home: bool,
    #[serde(default)]
    spread: Option<f64>,
    #[serde(flatten)]
    box_score: BoxScore,
}

impl GameRow {
    /// A row without a posted line is rejected, never defaulted
    fn into_record(self) -> Result<GameRecord> {
        let team = self.team.trim().to_string();
        let Some(spread) = self.spread else {
            return Err(EdgeError::MissingRawColumn {
                column: "spread",
                team,
                date: self.date,
            });
        };
        Ok(GameRecord {
            season: self.season.unwrap_or_else(|| season_for(self.date)),
            date: self.date,
            team,
            opponent: self.opponent.trim().to_string(),
            team_score: self.team_score,
            opp_score: self.opp_score,
            is_home: self.is_home,
            spread,
            box_score: self.box_score,
        })
    }
}

/// JSON array of team-perspective game rows
pub struct JsonGameFile {
    path: PathBuf,
    name: String,
}

impl JsonGameFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        JsonGameFile { path, name }
    }

    /// Every row in the file
    pub fn read_all(&self) -> Result<Vec<GameRecord>> {
        let content = std::fs::read_to_string(&self.path)?;
        parse_game_rows(&content)
    }
}

impl GameSource for JsonGameFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch_completed(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<GameRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.date >= start && r.date <= end)
            .collect())
    }
}

fn parse_game_rows(content: &str) -> Result<Vec<GameRecord>> {
    let rows: Vec<GameRow> = serde_json::from_str(content)?;
    rows.into_iter().map(GameRow::into_record).collect()
}

/// JSON array of [`ScheduledGame`]
pub struct JsonScheduleFile {
    path: PathBuf,
}

impl JsonScheduleFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        JsonScheduleFile {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ScheduleSource for JsonScheduleFile {
    fn fetch_upcoming(&self) -> Result<Vec<ScheduledGame>> {
        let content = std::fs::read_to_string(&self.path)?;
        let games: Vec<ScheduledGame> = serde_json::from_str(&content)?;
        Ok(games
            .into_iter()
            .map(|g| ScheduledGame {
                home: g.home.trim().to_string(),
                away: g.away.trim().to_string(),
                ..g
            })
            .collect())
    }
}

/// Add the opponent-side record for every game that only arrived from one side.
///
/// Returns the number of mirror rows added.
pub fn complete_mirrors(ledger: &mut GameLedger) -> usize {
    let missing: Vec<GameRecord> = ledger.unmirrored().into_iter().map(|r| r.mirrored()).collect();
    let added = missing.len();
    for record in missing {
        ledger.insert(record);
    }
    if added > 0 {
        log::info!("Completed {} one-sided games with mirror records", added);
    }
    added
}
