//! Aggregated stat columns
//!
//! The eleven box-score columns plus both scores, read from a [`GameRecord`]
//! into a fixed-width line so that means can be taken column by column.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::{EdgeError, GameRecord, Result};

/// A column that is aggregated into season and rolling means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatColumn {
    TeamEfg,
    TeamTo,
    TeamOrb,
    TeamFtr,
    TeamThreeRate,
    OppEfg,
    OppTo,
    OppOrb,
    OppFtr,
    OppThreeRate,
    Possessions,
    TeamScore,
    OppScore,
}

impl StatColumn {
    pub const COUNT: usize = 13;

    pub const ALL: [StatColumn; Self::COUNT] = [
        StatColumn::TeamEfg,
        StatColumn::TeamTo,
        StatColumn::TeamOrb,
        StatColumn::TeamFtr,
        StatColumn::TeamThreeRate,
        StatColumn::OppEfg,
        StatColumn::OppTo,
        StatColumn::OppOrb,
        StatColumn::OppFtr,
        StatColumn::OppThreeRate,
        StatColumn::Possessions,
        StatColumn::TeamScore,
        StatColumn::OppScore,
    ];

    /// Column name as it appears in game files
    pub fn name(self) -> &'static str {
        match self {
            StatColumn::TeamEfg => "team_eFG",
            StatColumn::TeamTo => "team_TO",
            StatColumn::TeamOrb => "team_ORB",
            StatColumn::TeamFtr => "team_FTR",
            StatColumn::TeamThreeRate => "team_3PR",
            StatColumn::OppEfg => "opp_eFG",
            StatColumn::OppTo => "opp_TO",
            StatColumn::OppOrb => "opp_ORB",
            StatColumn::OppFtr => "opp_FTR",
            StatColumn::OppThreeRate => "opp_3PR",
            StatColumn::Possessions => "possessions",
            StatColumn::TeamScore => "team_score",
            StatColumn::OppScore => "opp_score",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Raw value, `None` when the column was never ingested
    pub fn value(self, record: &GameRecord) -> Option<f64> {
        let b = &record.box_score;
        match self {
            StatColumn::TeamEfg => b.team_efg,
            StatColumn::TeamTo => b.team_to,
            StatColumn::TeamOrb => b.team_orb,
            StatColumn::TeamFtr => b.team_ftr,
            StatColumn::TeamThreeRate => b.team_three_rate,
            StatColumn::OppEfg => b.opp_efg,
            StatColumn::OppTo => b.opp_to,
            StatColumn::OppOrb => b.opp_orb,
            StatColumn::OppFtr => b.opp_ftr,
            StatColumn::OppThreeRate => b.opp_three_rate,
            StatColumn::Possessions => b.possessions,
            StatColumn::TeamScore => Some(record.team_score as f64),
            StatColumn::OppScore => Some(record.opp_score as f64),
        }
    }
}

/// One value per [`StatColumn`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    values: [f64; StatColumn::COUNT],
}

impl Default for StatLine {
    fn default() -> Self {
        StatLine::zeros()
    }
}

impl StatLine {
    pub fn zeros() -> Self {
        StatLine {
            values: [0.0; StatColumn::COUNT],
        }
    }

    /// Read every column of a record; any null column is an error
    pub fn from_record(record: &GameRecord) -> Result<Self> {
        let mut values = [0.0; StatColumn::COUNT];
        for column in StatColumn::ALL {
            values[column.index()] =
                column
                    .value(record)
                    .ok_or_else(|| EdgeError::MissingRawColumn {
                        column: column.name(),
                        team: record.team.clone(),
                        date: record.date,
                    })?;
        }
        Ok(StatLine { values })
    }

    pub fn get(&self, column: StatColumn) -> f64 {
        self.values[column.index()]
    }

    /// Column-wise arithmetic mean, summed in slice order.
    ///
    /// An empty slice yields zeros.
    pub fn mean<'a>(lines: impl IntoIterator<Item = &'a StatLine>) -> StatLine {
        let mut sums = [0.0; StatColumn::COUNT];
        let mut n = 0usize;
        for line in lines {
            for (sum, v) in sums.iter_mut().zip(line.values.iter()) {
                *sum += v;
            }
            n += 1;
        }
        if n > 0 {
            for sum in sums.iter_mut() {
                *sum /= n as f64;
            }
        }
        StatLine { values: sums }
    }
}

impl Index<StatColumn> for StatLine {
    type Output = f64;

    fn index(&self, column: StatColumn) -> &f64 {
        &self.values[column.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxScore;
    use chrono::NaiveDate;

    fn full_record() -> GameRecord {
        GameRecord {
            date: NaiveDate::from_ymd_opt(2026, 1, 3).unwrap(),
            season: 2026,
            team: "Purdue".to_string(),
            opponent: "Iowa".to_string(),
            team_score: 81,
            opp_score: 74,
            is_home: true,
            spread: -7.5,
            box_score: BoxScore {
                team_efg: Some(0.56),
                team_to: Some(0.14),
                team_orb: Some(0.33),
                team_ftr: Some(0.29),
                team_three_rate: Some(0.41),
                opp_efg: Some(0.50),
                opp_to: Some(0.16),
                opp_orb: Some(0.27),
                opp_ftr: Some(0.22),
                opp_three_rate: Some(0.38),
                possessions: Some(68.0),
            },
        }
    }

    #[test]
    fn test_from_record() {
        let line = StatLine::from_record(&full_record()).unwrap();
        assert_eq!(line[StatColumn::TeamEfg], 0.56);
        assert_eq!(line.get(StatColumn::OppOrb), 0.27);
        assert_eq!(line[StatColumn::TeamScore], 81.0);
        assert_eq!(line[StatColumn::OppScore], 74.0);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let mut record = full_record();
        record.box_score.opp_ftr = None;
        match StatLine::from_record(&record) {
            Err(EdgeError::MissingRawColumn { column, team, .. }) => {
                assert_eq!(column, "opp_FTR");
                assert_eq!(team, "Purdue");
            }
            other => panic!("expected MissingRawColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_mean() {
        let a = StatLine::from_record(&full_record()).unwrap();
        let mut record = full_record();
        record.team_score = 61;
        let b = StatLine::from_record(&record).unwrap();

        let mean = StatLine::mean([&a, &b]);
        assert_eq!(mean[StatColumn::TeamScore], 71.0);
        assert_eq!(mean[StatColumn::TeamEfg], 0.56);
        assert_eq!(StatLine::mean(std::iter::empty::<&StatLine>()), StatLine::zeros());
    }
}
