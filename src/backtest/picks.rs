//! Pick decisions and grading, shared by the backtest and the live predictor

use chrono::NaiveDate;

use crate::{Pick, PickSide};

/// max(p, 1 - p)
pub fn confidence(home_probability: f64) -> f64 {
    home_probability.max(1.0 - home_probability)
}

/// Back the home side only when it is more likely than not to cover
pub fn decide(home_probability: f64) -> PickSide {
    if home_probability > 0.5 {
        PickSide::Home
    } else {
        PickSide::Away
    }
}

/// Build the pick for a game given P(home covers)
pub fn make_pick(
    date: NaiveDate,
    home: &str,
    away: &str,
    home_spread: f64,
    home_probability: f64,
) -> (PickSide, Pick) {
    let side = decide(home_probability);
    let (picked_team, picked_spread) = match side {
        PickSide::Home => (home, home_spread),
        PickSide::Away => (away, -home_spread),
    };
    let pick = Pick {
        date,
        picked_team: picked_team.to_string(),
        picked_spread,
        confidence: confidence(home_probability),
        matchup: Some(format!("{} @ {}", away, home)),
        pick_correct: None,
    };
    (side, pick)
}

/// A pick wins when the picked side's score plus its line beats the other score
pub fn grade(picked_score: u16, picked_spread: f64, other_score: u16) -> bool {
    picked_score as f64 + picked_spread > other_score as f64
}

/// Grade a pick from the final home and away scores
pub fn grade_side(side: PickSide, home_spread: f64, home_score: u16, away_score: u16) -> bool {
    match side {
        PickSide::Home => grade(home_score, home_spread, away_score),
        PickSide::Away => grade(away_score, -home_spread, home_score),
    }
}
