//! Model training
//!
//! The classifier contract, the burn-backed implementation and metrics tracking.

pub mod classifier;
pub mod metrics;
pub mod trainer;

pub use classifier::{check_training_set, Classifier};
pub use metrics::{Metrics, TrainingHistory};
pub use trainer::{BurnClassifier, DefaultBackend, FeatureScaler};
