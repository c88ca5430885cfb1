//! Burn-backed spread classifier
//!
//! Z-score scales the feature rows, then trains a [`SpreadNet`] with SGD on
//! binary cross-entropy. Full batch by default; mini-batches are shuffled with
//! a seeded RNG so repeated fits see the same order.

use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{GradientsParams, Optimizer, Sgd, SgdConfig};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor, TensorData};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;
use crate::model::{SpreadNet, SpreadNetConfig};
use crate::training::classifier::{check_training_set, Classifier};
use crate::training::metrics::{Metrics, TrainingHistory};
use crate::{EdgeError, Result, TrainingConfig};

/// CPU backend used by the CLI
pub type DefaultBackend = Autodiff<NdArray<f32>>;

type Row = [f32; FeatureVector::DIM];

/// Per-feature z-score scaling fitted on training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl FeatureScaler {
    /// Population mean and std per column; std is floored at 0.001
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let mut sum = [0.0f64; FeatureVector::DIM];
        let mut sum_sq = [0.0f64; FeatureVector::DIM];

        for row in rows {
            for (j, v) in row.to_array().iter().enumerate() {
                sum[j] += v;
                sum_sq[j] += v * v;
            }
        }

        let n = rows.len().max(1) as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
        let std: Vec<f64> = sum_sq
            .iter()
            .zip(mean.iter())
            .map(|(sq, m)| (sq / n - m * m).max(0.0).sqrt().max(0.001))
            .collect();

        FeatureScaler { mean, std }
    }

    pub fn transform(&self, row: &FeatureVector) -> Row {
        let mut out = [0.0f32; FeatureVector::DIM];
        for (j, v) in row.to_array().iter().enumerate() {
            out[j] = ((v - self.mean[j]) / self.std[j]) as f32;
        }
        out
    }

    fn validate(&self) -> Result<()> {
        if self.mean.len() != FeatureVector::DIM || self.std.len() != FeatureVector::DIM {
            return Err(EdgeError::Model(format!(
                "scaler has {} columns, expected {}",
                self.mean.len(),
                FeatureVector::DIM
            )));
        }
        Ok(())
    }
}

/// Everything besides the weights needed to rebuild a fitted classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelMeta {
    schema_version: u32,
    hidden_dims: Vec<usize>,
    dropout: f64,
    scaler: FeatureScaler,
}

fn meta_path(path: &str) -> String {
    format!("{}.scaler.json", path)
}

/// Stack rows into a `[n, DIM]` tensor
fn batch_tensor<'a, BB: Backend>(
    rows: impl Iterator<Item = &'a Row>,
    device: &BB::Device,
) -> Tensor<BB, 2> {
    let mut flat = Vec::new();
    let mut n = 0;
    for row in rows {
        flat.extend_from_slice(row);
        n += 1;
    }
    Tensor::from_data(TensorData::new(flat, [n, FeatureVector::DIM]), device)
}

/// Spread classifier trained with burn
pub struct BurnClassifier<B: AutodiffBackend> {
    config: TrainingConfig,
    device: B::Device,
    model: Option<SpreadNet<B>>,
    scaler: Option<FeatureScaler>,
    history: TrainingHistory,
}

impl<B: AutodiffBackend> BurnClassifier<B> {
    pub fn new(device: B::Device, config: TrainingConfig) -> Self {
        BurnClassifier {
            config,
            device,
            model: None,
            scaler: None,
            history: TrainingHistory::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// History of the most recent fit
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    fn net_config(&self) -> SpreadNetConfig {
        SpreadNetConfig {
            input_dim: FeatureVector::DIM,
            hidden_dims: self.config.hidden_dims.clone(),
            dropout: self.config.dropout,
        }
    }

    fn binary_cross_entropy(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
        let eps = 1e-7;
        let probs_clamped = probs.clamp(eps, 1.0 - eps);
        let loss = targets.clone().neg() * probs_clamped.clone().log()
            - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
        loss.mean()
    }

    fn count_correct(probs: Tensor<B, 2>, labels: impl Iterator<Item = bool>) -> Result<usize> {
        let values = probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| EdgeError::Model(format!("{:?}", e)))?;
        Ok(values
            .iter()
            .zip(labels)
            .filter(|(p, l)| (**p >= 0.5) == *l)
            .count())
    }
}

impl<B: AutodiffBackend> Classifier for BurnClassifier<B> {
    fn fit(&mut self, features: &[FeatureVector], labels: &[bool]) -> Result<()> {
        check_training_set(features, labels)?;

        let scaler = FeatureScaler::fit(features);
        let rows: Vec<Row> = features.iter().map(|f| scaler.transform(f)).collect();
        let targets: Vec<f32> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();

        let mut model = SpreadNet::<B>::new(&self.device, &self.net_config());
        let mut optimizer: OptimizerAdaptor<Sgd<B::InnerBackend>, SpreadNet<B>, B> =
            SgdConfig::new().init();

        let batch_size = match self.config.batch_size {
            0 => rows.len(),
            n => n.min(rows.len()),
        };
        let mut order: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut history = TrainingHistory::new();
        let epochs = self.config.epochs;

        for epoch in 0..epochs {
            if batch_size < rows.len() {
                order.shuffle(&mut rng);
            }

            let mut metrics = Metrics::new();
            for chunk in order.chunks(batch_size) {
                let x = batch_tensor::<B>(chunk.iter().map(|&i| &rows[i]), &self.device);
                let y_values: Vec<f32> = chunk.iter().map(|&i| targets[i]).collect();
                let y = Tensor::<B, 2>::from_data(
                    TensorData::new(y_values, [chunk.len(), 1]),
                    &self.device,
                );

                let probs = sigmoid(model.forward(x));
                let loss = Self::binary_cross_entropy(probs.clone(), y);
                let loss_val: f32 = loss.clone().into_scalar().elem();
                let correct = Self::count_correct(probs, chunk.iter().map(|&i| labels[i]))?;
                metrics.update(loss_val, correct, chunk.len());

                let grads = loss.backward();
                let grads_params = GradientsParams::from_grads(grads, &model);
                model = optimizer.step(self.config.learning_rate, model, grads_params);
            }

            history.record_epoch(epoch, &metrics);
            if epoch % 50 == 0 || epoch + 1 == epochs {
                log::debug!("Epoch {}/{}: {}", epoch + 1, epochs, metrics);
            }
        }

        self.model = Some(model);
        self.scaler = Some(scaler);
        self.history = history;
        Ok(())
    }

    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        let (Some(model), Some(scaler)) = (&self.model, &self.scaler) else {
            return Err(EdgeError::NoModel);
        };
        if features.is_empty() {
            return Ok(vec![]);
        }

        let model = model.valid();
        let rows: Vec<Row> = features.iter().map(|f| scaler.transform(f)).collect();
        let x = batch_tensor::<B::InnerBackend>(rows.iter(), &self.device);
        let probs = sigmoid(model.forward(x));

        let values = probs
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| EdgeError::Model(format!("{:?}", e)))?;
        Ok(values.into_iter().map(|p| p as f64).collect())
    }
}

impl<B: AutodiffBackend> BurnClassifier<B>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Save weights and the scaler sidecar under `path`
    pub fn save(&self, path: &str) -> Result<()> {
        let (Some(model), Some(scaler)) = (&self.model, &self.scaler) else {
            return Err(EdgeError::NoModel);
        };
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        model.save(path)?;
        let meta = ModelMeta {
            schema_version: FeatureVector::SCHEMA_VERSION,
            hidden_dims: self.config.hidden_dims.clone(),
            dropout: self.config.dropout,
            scaler: scaler.clone(),
        };
        std::fs::write(meta_path(path), serde_json::to_string_pretty(&meta)?)?;
        log::info!("Saved model to {}", path);
        Ok(())
    }

    /// Load a classifier saved with [`BurnClassifier::save`]
    pub fn load(device: B::Device, path: &str, config: TrainingConfig) -> Result<Self> {
        let meta_file = meta_path(path);
        if !Path::new(&meta_file).exists() {
            return Err(EdgeError::NoModel);
        }
        let meta: ModelMeta = serde_json::from_str(&std::fs::read_to_string(&meta_file)?)?;
        if meta.schema_version != FeatureVector::SCHEMA_VERSION {
            return Err(EdgeError::Model(format!(
                "model was trained on feature schema v{}, current is v{}",
                meta.schema_version,
                FeatureVector::SCHEMA_VERSION
            )));
        }
        meta.scaler.validate()?;

        let config = TrainingConfig {
            hidden_dims: meta.hidden_dims,
            dropout: meta.dropout,
            ..config
        };
        let mut classifier = Self::new(device, config);
        let model = SpreadNet::load(&classifier.device, path, &classifier.net_config())?;
        classifier.model = Some(model);
        classifier.scaler = Some(meta.scaler);
        Ok(classifier)
    }
}
