//! SQLite storage for game records, graded picks and live predictions

use crate::data::GameLedger;
use crate::predict::LivePick;
use crate::{BoxScore, GameRecord, Pick, PickSide, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const GAME_COLUMNS: &str = "date, season, team, opponent, team_score, opp_score, is_home, spread,
    team_efg, team_to, team_orb, team_ftr, team_3pr,
    opp_efg, opp_to, opp_orb, opp_ftr, opp_3pr, possessions";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS game_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                season INTEGER NOT NULL,
                team TEXT NOT NULL,
                opponent TEXT NOT NULL,
                team_score INTEGER NOT NULL,
                opp_score INTEGER NOT NULL,
                is_home INTEGER NOT NULL,
                spread REAL NOT NULL,
                team_efg REAL,
                team_to REAL,
                team_orb REAL,
                team_ftr REAL,
                team_3pr REAL,
                opp_efg REAL,
                opp_to REAL,
                opp_orb REAL,
                opp_ftr REAL,
                opp_3pr REAL,
                possessions REAL,
                UNIQUE(date, team)
            );

            CREATE TABLE IF NOT EXISTS performance_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                picked_team TEXT NOT NULL,
                picked_spread REAL NOT NULL,
                confidence REAL NOT NULL,
                matchup TEXT,
                pick_correct INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                game_date TEXT NOT NULL,
                home TEXT NOT NULL,
                away TEXT NOT NULL,
                home_spread REAL NOT NULL,
                home_probability REAL NOT NULL,
                home_rest_days INTEGER NOT NULL,
                away_rest_days INTEGER NOT NULL,
                side TEXT NOT NULL,
                picked_team TEXT NOT NULL,
                picked_spread REAL NOT NULL,
                confidence REAL NOT NULL,
                UNIQUE(game_date, home, away)
            );

            CREATE TABLE IF NOT EXISTS team_aliases (
                alias TEXT PRIMARY KEY,
                team TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_date ON game_records(date);
            CREATE INDEX IF NOT EXISTS idx_games_team ON game_records(team, date);
            CREATE INDEX IF NOT EXISTS idx_performance_date ON performance_log(date);
            "#,
        )?;
        Ok(())
    }

    // ==================== Game Records ====================

    /// Insert or replace the record for `(date, team)`
    pub fn upsert_game(&self, record: &GameRecord) -> Result<()> {
        let b = &record.box_score;
        self.conn.execute(
            &format!(
                "INSERT INTO game_records ({GAME_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
                 ON CONFLICT(date, team) DO UPDATE SET
                    season = excluded.season,
                    opponent = excluded.opponent,
                    team_score = excluded.team_score,
                    opp_score = excluded.opp_score,
                    is_home = excluded.is_home,
                    spread = excluded.spread,
                    team_efg = excluded.team_efg,
                    team_to = excluded.team_to,
                    team_orb = excluded.team_orb,
                    team_ftr = excluded.team_ftr,
                    team_3pr = excluded.team_3pr,
                    opp_efg = excluded.opp_efg,
                    opp_to = excluded.opp_to,
                    opp_orb = excluded.opp_orb,
                    opp_ftr = excluded.opp_ftr,
                    opp_3pr = excluded.opp_3pr,
                    possessions = excluded.possessions"
            ),
            params![
                record.date,
                record.season,
                record.team,
                record.opponent,
                record.team_score,
                record.opp_score,
                record.is_home,
                record.spread,
                b.team_efg,
                b.team_to,
                b.team_orb,
                b.team_ftr,
                b.team_three_rate,
                b.opp_efg,
                b.opp_to,
                b.opp_orb,
                b.opp_ftr,
                b.opp_three_rate,
                b.possessions,
            ],
        )?;
        Ok(())
    }

    /// Upsert many records in one transaction
    pub fn upsert_games(&self, records: &[GameRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for record in records {
            self.upsert_game(record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Load every stored record into a ledger
    pub fn load_ledger(&self) -> Result<GameLedger> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {GAME_COLUMNS} FROM game_records ORDER BY date, team"))?;
        let records = stmt
            .query_map([], Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(GameLedger::from_records(records))
    }

    /// Records with `start <= date <= end`
    pub fn get_games_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<GameRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GAME_COLUMNS} FROM game_records
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date, team"
        ))?;
        let records = stmt
            .query_map(params![start, end], Self::row_to_game)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn row_to_game(row: &Row) -> rusqlite::Result<GameRecord> {
        Ok(GameRecord {
            date: row.get(0)?,
            season: row.get(1)?,
            team: row.get(2)?,
            opponent: row.get(3)?,
            team_score: row.get(4)?,
            opp_score: row.get(5)?,
            is_home: row.get(6)?,
            spread: row.get(7)?,
            box_score: BoxScore {
                team_efg: row.get(8)?,
                team_to: row.get(9)?,
                team_orb: row.get(10)?,
                team_ftr: row.get(11)?,
                team_three_rate: row.get(12)?,
                opp_efg: row.get(13)?,
                opp_to: row.get(14)?,
                opp_orb: row.get(15)?,
                opp_ftr: row.get(16)?,
                opp_three_rate: row.get(17)?,
                possessions: row.get(18)?,
            },
        })
    }

    // ==================== Team Aliases ====================

    /// Map an external name onto a canonical team name
    pub fn add_team_alias(&self, alias: &str, team: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO team_aliases (alias, team) VALUES (?1, ?2)
             ON CONFLICT(alias) DO UPDATE SET team = excluded.team",
            params![alias.trim(), team.trim()],
        )?;
        Ok(())
    }

    /// All `(alias, team)` pairs
    pub fn get_team_aliases(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT alias, team FROM team_aliases ORDER BY alias")?;
        let aliases = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(aliases)
    }

    // ==================== Performance Log ====================

    /// Replace every graded pick stored for `date` with `picks`
    pub fn replace_performance_date(&self, date: NaiveDate, picks: &[Pick]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM performance_log WHERE date = ?1", params![date])?;
        let mut written = 0;
        for pick in picks.iter().filter(|p| p.date == date) {
            let Some(correct) = pick.pick_correct else {
                log::warn!("Skipping ungraded pick {} on {}", pick.label(), date);
                continue;
            };
            tx.execute(
                "INSERT INTO performance_log (date, picked_team, picked_spread, confidence, matchup, pick_correct)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    pick.date,
                    pick.picked_team,
                    pick.picked_spread,
                    pick.confidence,
                    pick.matchup,
                    correct,
                ],
            )?;
            written += 1;
        }
        tx.commit()?;
        Ok(written)
    }

    /// All graded picks in date order (insertion order within a date)
    pub fn get_performance_picks(&self) -> Result<Vec<Pick>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, picked_team, picked_spread, confidence, matchup, pick_correct
             FROM performance_log
             ORDER BY date, id",
        )?;
        let picks = stmt
            .query_map([], |row| {
                Ok(Pick {
                    date: row.get(0)?,
                    picked_team: row.get(1)?,
                    picked_spread: row.get(2)?,
                    confidence: row.get(3)?,
                    matchup: row.get(4)?,
                    pick_correct: Some(row.get(5)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(picks)
    }

    /// Delete graded picks below a confidence threshold
    pub fn delete_performance_below(&self, threshold: f64) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM performance_log WHERE confidence < ?1",
            params![threshold],
        )?;
        Ok(removed)
    }

    // ==================== Live Predictions ====================

    /// Store live picks; a repeated `(date, home, away)` overwrites the earlier pick
    pub fn save_predictions(&self, picks: &[LivePick]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for p in picks {
            tx.execute(
                "INSERT INTO predictions (game_date, home, away, home_spread, home_probability,
                                          home_rest_days, away_rest_days, side, picked_team,
                                          picked_spread, confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(game_date, home, away) DO UPDATE SET
                    created_at = datetime('now'),
                    home_spread = excluded.home_spread,
                    home_probability = excluded.home_probability,
                    home_rest_days = excluded.home_rest_days,
                    away_rest_days = excluded.away_rest_days,
                    side = excluded.side,
                    picked_team = excluded.picked_team,
                    picked_spread = excluded.picked_spread,
                    confidence = excluded.confidence",
                params![
                    p.game_date,
                    p.home,
                    p.away,
                    p.home_spread,
                    p.home_probability,
                    p.home_rest_days,
                    p.away_rest_days,
                    p.side.to_string(),
                    p.pick.picked_team,
                    p.pick.picked_spread,
                    p.pick.confidence,
                ],
            )?;
        }
        tx.commit()?;
        Ok(picks.len())
    }

    /// Live picks stored for games on `date`
    pub fn get_predictions_for(&self, date: NaiveDate) -> Result<Vec<LivePick>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_date, home, away, home_spread, home_probability, home_rest_days,
                    away_rest_days, side, picked_team, picked_spread, confidence
             FROM predictions
             WHERE game_date = ?1
             ORDER BY confidence DESC, id",
        )?;
        let picks = stmt
            .query_map(params![date], |row| {
                let game_date: NaiveDate = row.get(0)?;
                let home: String = row.get(1)?;
                let away: String = row.get(2)?;
                let side: String = row.get(7)?;
                let side = if side == "Home" {
                    PickSide::Home
                } else {
                    PickSide::Away
                };
                let matchup = format!("{} @ {}", away, home);
                Ok(LivePick {
                    game_date,
                    home_spread: row.get(3)?,
                    home_probability: row.get(4)?,
                    home_rest_days: row.get(5)?,
                    away_rest_days: row.get(6)?,
                    side,
                    pick: Pick {
                        date: game_date,
                        picked_team: row.get(8)?,
                        picked_spread: row.get(9)?,
                        confidence: row.get(10)?,
                        matchup: Some(matchup),
                        pick_correct: None,
                    },
                    home,
                    away,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(picks)
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let earliest: Option<NaiveDate> = self
            .conn
            .query_row("SELECT MIN(date) FROM game_records", [], |row| row.get(0))
            .optional()?
            .flatten();
        let latest: Option<NaiveDate> = self
            .conn
            .query_row("SELECT MAX(date) FROM game_records", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            record_count: count("SELECT COUNT(*) FROM game_records")?,
            team_count: count("SELECT COUNT(DISTINCT team) FROM game_records")?,
            graded_picks: count("SELECT COUNT(*) FROM performance_log")?,
            predictions: count("SELECT COUNT(*) FROM predictions")?,
            aliases: count("SELECT COUNT(*) FROM team_aliases")?,
            earliest_game: earliest,
            latest_game: latest,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub record_count: usize,
    pub team_count: usize,
    pub graded_picks: usize,
    pub predictions: usize,
    pub aliases: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}
