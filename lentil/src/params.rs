//! Experiment configuration.
//!
//! A configuration is a JSON document such as
//!
//! ```text
//! {
//!   "model_params": { "name": "inpainting", "N": 784, "N_rem": 200, "mode": "band" },
//!   "data_params":  { "name": "mnist" },
//!   "prior_params": { "name": "VAE", "type": "mnist", "id": "20_relu_400_sigmoid_784_bias" },
//!   "Delta": 0.01,
//!   "seed": 3
//! }
//! ```
//!
//! Names the experiment does not know deserialize into `Unsupported` so
//! that they fail with a typed error at setup rather than at parse time.

use crate::error::SetupError;
use matrix_util::common_io::open_buf_reader;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum ModelParams {
    #[serde(rename = "denoising")]
    Denoising {
        #[serde(rename = "N")]
        n: usize,
    },
    #[serde(rename = "inpainting")]
    Inpainting {
        #[serde(rename = "N")]
        n: usize,
        #[serde(rename = "N_rem", default)]
        n_rem: usize,
        mode: String,
    },
    #[serde(other)]
    Unsupported,
}

impl ModelParams {
    pub fn name(&self) -> &str {
        match self {
            ModelParams::Denoising { .. } => "denoising",
            ModelParams::Inpainting { .. } => "inpainting",
            ModelParams::Unsupported => "unsupported",
        }
    }

    /// Size `N` of the signal
    pub fn signal_size(&self) -> anyhow::Result<usize> {
        match self {
            ModelParams::Denoising { n } | ModelParams::Inpainting { n, .. } => Ok(*n),
            ModelParams::Unsupported => Err(SetupError::not_implemented("model").into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum DataParams {
    #[serde(rename = "gaussian")]
    Gaussian,
    #[serde(rename = "mnist")]
    Mnist,
    #[serde(rename = "fashion_mnist")]
    FashionMnist,
    /// images drawn from a pretrained generator
    #[serde(rename = "GAN")]
    Gan {
        #[serde(rename = "type")]
        kind: String,
        id: String,
    },
    #[serde(other)]
    Unsupported,
}

impl DataParams {
    pub fn name(&self) -> &str {
        match self {
            DataParams::Gaussian => "gaussian",
            DataParams::Mnist => "mnist",
            DataParams::FashionMnist => "fashion_mnist",
            DataParams::Gan { .. } => "GAN",
            DataParams::Unsupported => "unsupported",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, DataParams::Mnist | DataParams::FashionMnist)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum PriorParams {
    #[serde(rename = "gaussian")]
    Gaussian,
    /// generalized linear model `x = f(W z)` with `z` of size `N / alpha`
    #[serde(rename = "GLM")]
    Glm { alpha: f64, channel: String },
    /// multi-layer network with relu activations and random biases
    #[serde(rename = "ML")]
    Ml { alphas: Vec<f64> },
    /// decoder of a pretrained variational auto-encoder
    #[serde(rename = "VAE")]
    Vae {
        #[serde(rename = "type")]
        kind: String,
        id: String,
    },
    #[serde(other)]
    Unsupported,
}

impl PriorParams {
    pub fn name(&self) -> &str {
        match self {
            PriorParams::Gaussian => "gaussian",
            PriorParams::Glm { .. } => "GLM",
            PriorParams::Ml { .. } => "ML",
            PriorParams::Vae { .. } => "VAE",
            PriorParams::Unsupported => "unsupported",
        }
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            PriorParams::Vae { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            PriorParams::Vae { id, .. } => Some(id),
            _ => None,
        }
    }

    /// GLM aspect ratio; 1 for the other priors
    pub fn alpha(&self) -> f64 {
        match self {
            PriorParams::Glm { alpha, .. } => *alpha,
            _ => 1.0,
        }
    }
}

/// Activation of a GLM prior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nonlinearity {
    Linear,
    Sign,
    Relu,
}

impl FromStr for Nonlinearity {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Nonlinearity::Linear),
            "sign" => Ok(Nonlinearity::Sign),
            "relu" => Ok(Nonlinearity::Relu),
            _ => Err(SetupError::not_implemented(format!("GLM channel {}", s))),
        }
    }
}

/// Which coordinates an inpainting mask removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// `N_rem` consecutive coordinates around the middle
    Band,
    /// `N_rem` distinct coordinates chosen at random
    Random,
    /// two diagonal stripes of a 28 x 28 image
    Diagonal,
}

impl FromStr for MaskMode {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "band" => Ok(MaskMode::Band),
            "random" => Ok(MaskMode::Random),
            "diagonal" => Ok(MaskMode::Diagonal),
            _ => Err(SetupError::not_implemented(format!("inpainting mode {}", s))),
        }
    }
}

fn default_delta() -> f64 {
    0.5
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_weights_dir() -> String {
    "GAN_VAE_weights".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(rename = "model_params")]
    pub model: ModelParams,
    #[serde(rename = "data_params")]
    pub data: DataParams,
    #[serde(rename = "prior_params")]
    pub prior: PriorParams,
    /// noise variance
    #[serde(rename = "Delta", default = "default_delta")]
    pub delta: f64,
    /// random seed (0: seeded from the OS); also the test image index
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub daft: bool,
    #[serde(default)]
    pub plot_truth: bool,
    #[serde(default)]
    pub plot_truth_vs_pred: bool,
    #[serde(default)]
    pub plot_prior_sample: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_weights_dir")]
    pub weights_dir: String,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            model: ModelParams::Denoising { n: 1000 },
            data: DataParams::Gaussian,
            prior: PriorParams::Gaussian,
            delta: default_delta(),
            seed: 0,
            daft: false,
            plot_truth: false,
            plot_truth_vs_pred: false,
            plot_prior_sample: false,
            data_dir: default_data_dir(),
            weights_dir: default_weights_dir(),
        }
    }
}

impl ExperimentConfig {
    /// Read a (possibly gzipped) JSON configuration file
    pub fn from_json_file(file: &str) -> anyhow::Result<Self> {
        let reader = open_buf_reader(file)?;
        let config: Self = serde_json::from_reader(reader)
            .map_err(|e| anyhow::anyhow!("failed to parse {}: {}", file, e))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() -> anyhow::Result<()> {
        let json = r#"{
            "model_params": {"name": "inpainting", "N": 784, "N_rem": 100, "mode": "band"},
            "data_params": {"name": "fashion_mnist"},
            "prior_params": {"name": "VAE", "type": "fashion_mnist", "id": "20_relu_400_sigmoid_784"},
            "Delta": 0.01,
            "seed": 7,
            "plot_truth_vs_pred": true
        }"#;
        let config: ExperimentConfig = serde_json::from_str(json)?;
        assert_eq!(
            config.model,
            ModelParams::Inpainting {
                n: 784,
                n_rem: 100,
                mode: "band".to_string()
            }
        );
        assert_eq!(config.data, DataParams::FashionMnist);
        assert_eq!(config.prior.id(), Some("20_relu_400_sigmoid_784"));
        assert_eq!(config.seed, 7);
        assert!(config.plot_truth_vs_pred && !config.plot_truth);
        assert_eq!(config.weights_dir, "GAN_VAE_weights");
        Ok(())
    }

    #[test]
    fn unknown_names_are_kept_as_unsupported() -> anyhow::Result<()> {
        let json = r#"{
            "model_params": {"name": "low_rank", "N": 10, "alpha": 1.0},
            "data_params": {"name": "cifar"},
            "prior_params": {"name": "flow", "depth": 3}
        }"#;
        let config: ExperimentConfig = serde_json::from_str(json)?;
        assert_eq!(config.model, ModelParams::Unsupported);
        assert_eq!(config.data, DataParams::Unsupported);
        assert_eq!(config.prior, PriorParams::Unsupported);
        assert_eq!(config.delta, 0.5);
        assert!(config.model.signal_size().is_err());
        Ok(())
    }

    #[test]
    fn parse_sub_options() {
        assert_eq!("relu".parse::<Nonlinearity>(), Ok(Nonlinearity::Relu));
        assert!("tanh".parse::<Nonlinearity>().is_err());
        assert_eq!("diagonal".parse::<MaskMode>(), Ok(MaskMode::Diagonal));
        assert!(matches!(
            "stripes".parse::<MaskMode>(),
            Err(SetupError::NotImplemented(_))
        ));
    }
}
