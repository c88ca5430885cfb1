//! Binary classifier contract
//!
//! The backtest and live predictor only ever see a model through this trait,
//! so any learner that can fit labelled feature vectors and return cover
//! probabilities can be plugged in.

use crate::features::FeatureVector;
use crate::{EdgeError, Result};

/// A trainable probability model for "perspective team covers"
pub trait Classifier {
    /// Fit on labelled rows, replacing any previous fit
    fn fit(&mut self, features: &[FeatureVector], labels: &[bool]) -> Result<()>;

    /// P(label = true) for each row, in input order
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>>;
}

/// Reject training sets a classifier cannot learn from.
///
/// Lengths must agree, and both classes must be present.
pub fn check_training_set(features: &[FeatureVector], labels: &[bool]) -> Result<()> {
    if features.len() != labels.len() {
        return Err(EdgeError::ShapeMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    if labels.is_empty() {
        return Err(EdgeError::InsufficientHistory {
            available: 0,
            required: 1,
        });
    }
    let positives = labels.iter().filter(|&&l| l).count();
    if positives == 0 || positives == labels.len() {
        return Err(EdgeError::DegenerateTrainingLabels {
            count: labels.len(),
            label: positives > 0,
        });
    }
    Ok(())
}
