//! Next-day grading of stored live picks

use chrono::NaiveDate;

use super::ledger::PerformanceLedger;
use crate::backtest::grade_side;
use crate::data::GameLedger;
use crate::predict::LivePick;
use crate::{Pick, Result};

/// Result of grading one date's live picks
#[derive(Debug, Clone, Default)]
pub struct GradingOutcome {
    pub graded: Vec<Pick>,
    /// Predictions with no completed game in the ledger
    pub unmatched: usize,
    /// Graded picks left out by the actionable filter
    pub below_threshold: usize,
}

impl GradingOutcome {
    pub fn wins(&self) -> usize {
        self.graded.iter().filter(|p| p.pick_correct == Some(true)).count()
    }
}

/// Grade live picks against completed games.
///
/// Each prediction is matched to the home team's record on the game date with
/// the predicted away team as opponent, and graded at the line it was made at.
/// With `actionable_threshold` set, picks below it are left out of the result.
pub fn grade_predictions(
    predictions: &[LivePick],
    ledger: &GameLedger,
    actionable_threshold: Option<f64>,
) -> GradingOutcome {
    let mut outcome = GradingOutcome::default();

    for prediction in predictions {
        let game = ledger
            .get(prediction.game_date, &prediction.home)
            .filter(|r| r.is_home && r.opponent == prediction.away);
        let Some(game) = game else {
            log::warn!(
                "No result for {} @ {} on {}",
                prediction.away,
                prediction.home,
                prediction.game_date
            );
            outcome.unmatched += 1;
            continue;
        };

        if actionable_threshold.is_some_and(|t| prediction.pick.confidence < t) {
            outcome.below_threshold += 1;
            continue;
        }

        let mut pick = prediction.pick.clone();
        pick.pick_correct = Some(grade_side(
            prediction.side,
            prediction.home_spread,
            game.team_score,
            game.opp_score,
        ));
        outcome.graded.push(pick);
    }

    outcome
}

/// Grade the picks stored for `date` and replace that date in the performance log
pub fn grade_date(
    performance: &PerformanceLedger<'_>,
    predictions: &[LivePick],
    ledger: &GameLedger,
    date: NaiveDate,
    actionable_threshold: Option<f64>,
) -> Result<GradingOutcome> {
    let for_date: Vec<LivePick> = predictions
        .iter()
        .filter(|p| p.game_date == date)
        .cloned()
        .collect();
    if for_date.is_empty() {
        log::info!("No predictions stored for {}", date);
        return Ok(GradingOutcome::default());
    }
    let outcome = grade_predictions(&for_date, ledger, actionable_threshold);

    // An empty result still replaces whatever an earlier grading stored
    performance.upsert_date(date, &outcome.graded)?;
    if outcome.graded.is_empty() {
        log::info!("No gradable picks for {}", date);
    } else {
        log::info!(
            "Graded {} picks for {}: {}-{}",
            outcome.graded.len(),
            date,
            outcome.wins(),
            outcome.graded.len() - outcome.wins()
        );
    }
    Ok(outcome)
}
