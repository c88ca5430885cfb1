//! Spread cover network
//!
//! Architecture: Input(8) → [Linear → ReLU → Dropout]* → Linear(1) cover logit
//!
//! With no hidden layers this is plain logistic regression, and the head starts
//! at zero so training is fully deterministic.

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Initializer, Linear, LinearConfig};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::features::FeatureVector;
use crate::EdgeError;

/// Configuration for the spread network
#[derive(Debug, Clone)]
pub struct SpreadNetConfig {
    pub input_dim: usize,
    /// Hidden layer widths, empty for a linear model
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
}

impl Default for SpreadNetConfig {
    fn default() -> Self {
        SpreadNetConfig {
            input_dim: FeatureVector::DIM,
            hidden_dims: vec![],
            dropout: 0.0,
        }
    }
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

/// Feed-forward classifier producing one cover logit per row
#[derive(Module, Debug)]
pub struct SpreadNet<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    head: Linear<B>,
}

impl<B: Backend> SpreadNet<B> {
    pub fn new(device: &B::Device, config: &SpreadNetConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &width in &config.hidden_dims {
            hidden.push(HiddenBlock::new(device, in_dim, width, config.dropout));
            in_dim = width;
        }

        let head = if hidden.is_empty() {
            LinearConfig::new(in_dim, 1)
                .with_initializer(Initializer::Zeros)
                .init(device)
        } else {
            LinearConfig::new(in_dim, 1).init(device)
        };

        SpreadNet { hidden, head }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `features` - Scaled feature rows [batch, input_dim]
    ///
    /// # Returns
    /// Cover logits [batch, 1]; apply sigmoid for P(cover)
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = features;
        for block in &self.hidden {
            x = block.forward(x);
        }
        self.head.forward(x)
    }

    /// Save weights to `path` (the recorder adds the `.mpk` extension)
    pub fn save(&self, path: &str) -> crate::Result<()>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        recorder
            .record(self.clone().into_record(), path.into())
            .map_err(|e| EdgeError::Model(e.to_string()))
    }

    /// Load weights saved with [`SpreadNet::save`]
    pub fn load(device: &B::Device, path: &str, config: &SpreadNetConfig) -> crate::Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let record = recorder
            .load(path.into(), device)
            .map_err(|e| EdgeError::Model(e.to_string()))?;

        let model = Self::new(device, config);
        Ok(model.load_record(record))
    }
}
