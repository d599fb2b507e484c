//! Structured priors on the signal `x`.
//!
//! Every prior is a chain that starts from a standard Gaussian latent
//! and ends at the signal variable [`SIGNAL_ID`] of size `N`.

use crate::common::*;
use crate::error::SetupError;
use crate::params::{Nonlinearity, PriorParams};
use crate::weights::{load_decoder_weights, LayerWeights};
use ep_util::ensemble::gaussian_ensemble;
use ep_util::*;
use matrix_util::traits::SampleOps;
use rand::Rng;

pub const VAE_BIAS_ID: &str = "20_relu_400_sigmoid_784_bias";
pub const VAE_IDS: [&str; 2] = ["20_relu_400_sigmoid_784", "20_relu_400_sigmoid_784_old"];

const VAE_LATENT: usize = 20;
const VAE_HIDDEN: usize = 400;

/// A prior chain and the intermediate variables it introduced
#[derive(Debug)]
pub struct PriorBuild {
    pub chain: PriorChain,
    /// variables to damp, excluding the signal itself
    pub variable_ids: Vec<String>,
}

/// Build the prior described by `params` over a signal of size `n`
///
/// * `weights_dir` - root of the pretrained weight files
/// * `rng` - draws the random weights and biases of GLM and ML priors
pub fn build_prior<R: Rng + ?Sized>(
    params: &PriorParams,
    n: usize,
    weights_dir: &str,
    rng: &mut R,
) -> anyhow::Result<PriorBuild> {
    let ret = match params {
        PriorParams::Gaussian => PriorBuild {
            chain: PriorChain::new(GaussianPrior::new(n), SIGNAL_ID),
            variable_ids: vec![],
        },
        PriorParams::Glm { alpha, channel } => {
            let nonlinearity: Nonlinearity = channel.parse()?;
            build_glm_prior(n, *alpha, nonlinearity, rng)?
        }
        PriorParams::Ml { alphas } => build_multi_layer_prior(n, alphas, rng)?,
        PriorParams::Vae { kind, id } => {
            if n != IMAGE_SIZE {
                return Err(SetupError::dimension_mismatch("VAE prior", IMAGE_SIZE, n).into());
            }
            if id != VAE_BIAS_ID && !VAE_IDS.contains(&id.as_str()) {
                return Err(SetupError::not_implemented(format!("VAE {}", id)).into());
            }
            let weights = load_decoder_weights(weights_dir, kind, id)?;
            build_vae_prior(id, &weights)?
        }
        PriorParams::Unsupported => {
            return Err(SetupError::not_implemented("prior").into());
        }
    };

    info!(
        "{} prior over {} variables: {:?}",
        params.name(),
        ret.chain.num_variables(),
        ret.chain.variable_ids()
    );
    Ok(ret)
}

fn latent_size(n: usize, alpha: f64) -> anyhow::Result<usize> {
    if !(alpha > 0.0) {
        anyhow::bail!("aspect ratio must be positive: {}", alpha);
    }
    let d = (n as f64 / alpha).floor() as usize;
    if d == 0 {
        anyhow::bail!("aspect ratio {} leaves no latent dimension for N = {}", alpha, n);
    }
    Ok(d)
}

/// `z0 ~ N(0, I_D)`, `x = f(W z0)` with `D = floor(N / alpha)`
pub fn build_glm_prior<R: Rng + ?Sized>(
    n: usize,
    alpha: f64,
    nonlinearity: Nonlinearity,
    rng: &mut R,
) -> anyhow::Result<PriorBuild> {
    let d = latent_size(n, alpha)?;
    let w = gaussian_ensemble(n, d, rng);

    let mut chain = PriorChain::new(GaussianPrior::new(d), "z0").then(LinearChannel::new(w)?, "Wz0")?;
    let mut variable_ids = vec!["z0".to_string(), "Wz0".to_string()];

    chain = match nonlinearity {
        Nonlinearity::Linear => chain,
        Nonlinearity::Sign => chain.then(PiecewiseLinearChannel::sign(n), "s")?,
        Nonlinearity::Relu => chain.then(PiecewiseLinearChannel::relu(n), "s")?,
    };
    if nonlinearity != Nonlinearity::Linear {
        variable_ids.push("s".to_string());
    }

    let chain = chain.then(ReshapeChannel::new(&[n], &[n])?, SIGNAL_ID)?;
    Ok(PriorBuild {
        chain,
        variable_ids,
    })
}

/// Layer sizes `N_0 = N`, `N_{k+1} = floor(N_k / alpha)` over the
/// aspect ratios taken from the last to the first
pub fn multi_layer_sizes(n: usize, alphas: &[f64]) -> anyhow::Result<Vec<usize>> {
    let mut sizes = vec![n];
    for &alpha in alphas.iter().rev() {
        let last = sizes[sizes.len() - 1];
        sizes.push(latent_size(last, alpha)?);
    }
    Ok(sizes)
}

/// `z0 -> (W -> t_i -> +b -> u_i -> relu -> a_i)_{i=1..L} -> x`
pub fn build_multi_layer_prior<R: Rng + ?Sized>(
    n: usize,
    alphas: &[f64],
    rng: &mut R,
) -> anyhow::Result<PriorBuild> {
    if alphas.is_empty() {
        anyhow::bail!("a multi-layer prior needs at least one aspect ratio");
    }
    let sizes = multi_layer_sizes(n, alphas)?;
    let nlayers = alphas.len();
    debug!("layer sizes: {:?}", sizes);

    let weights: Vec<Array2<f64>> = (0..nlayers)
        .map(|k| gaussian_ensemble(sizes[k], sizes[k + 1], rng))
        .collect();
    let biases: Vec<Array1<f64>> = (0..nlayers)
        .map(|k| Array2::<f64>::runif_with(sizes[k], 1, rng).column(0).to_owned())
        .collect();

    let mut chain = PriorChain::new(GaussianPrior::new(sizes[nlayers]), "z0");
    let mut variable_ids = vec!["z0".to_string()];

    for i in 0..nlayers {
        let k = nlayers - 1 - i;
        let (t, u, a) = (
            format!("t_{}", i + 1),
            format!("u_{}", i + 1),
            format!("a_{}", i + 1),
        );
        chain = chain
            .then(LinearChannel::new(weights[k].clone())?, &t)?
            .then(BiasChannel::new(biases[k].clone()), &u)?
            .then(PiecewiseLinearChannel::relu(sizes[k]), &a)?;
        variable_ids.extend([t, u, a]);
    }

    let chain = chain.then(ReshapeChannel::new(&[n], &[n])?, SIGNAL_ID)?;
    Ok(PriorBuild {
        chain,
        variable_ids,
    })
}

fn check_shape(what: &str, found: (usize, usize), expected: (usize, usize)) -> anyhow::Result<()> {
    if found != expected {
        anyhow::bail!(
            "{} has shape {} x {}, expected {} x {}",
            what,
            found.0,
            found.1,
            expected.0,
            expected.1
        );
    }
    Ok(())
}

/// Two-layer decoder `20 -> 400 (relu) -> 784 (hard tanh)`
pub fn build_vae_prior(id: &str, layers: &LayerWeights) -> anyhow::Result<PriorBuild> {
    if layers.weights.len() != 2 {
        anyhow::bail!(
            "VAE {} needs 2 weight matrices, found {}",
            id,
            layers.weights.len()
        );
    }
    let (w1, w2) = (&layers.weights[0], &layers.weights[1]);
    check_shape("W_1", w1.dim(), (VAE_HIDDEN, VAE_LATENT))?;
    check_shape("W_2", w2.dim(), (IMAGE_SIZE, VAE_HIDDEN))?;

    let z0 = PriorChain::new(GaussianPrior::new(VAE_LATENT), "z_0");

    let ret = if id == VAE_BIAS_ID {
        if layers.biases.len() != 2 {
            anyhow::bail!("VAE {} needs 2 bias vectors, found {}", id, layers.biases.len());
        }
        let (b1, b2) = (&layers.biases[0], &layers.biases[1]);
        if b1.len() != VAE_HIDDEN || b2.len() != IMAGE_SIZE {
            anyhow::bail!("VAE {} has biases of sizes {} and {}", id, b1.len(), b2.len());
        }
        let chain = z0
            .then(LinearChannel::with_name(w1.clone(), "W_1")?, "Wz_1")?
            .then(BiasChannel::new(b1.clone()), "b_1")?
            .then(PiecewiseLinearChannel::leaky_relu(VAE_HIDDEN, 0.0), "z_1")?
            .then(LinearChannel::with_name(w2.clone(), "W_2")?, "Wz_2")?
            .then(BiasChannel::new(b2.clone()), "b_2")?
            .then(PiecewiseLinearChannel::hard_tanh(IMAGE_SIZE), "z_2")?
            .then(ReshapeChannel::new(&[IMAGE_SIZE], &[IMAGE_SIZE])?, SIGNAL_ID)?;
        PriorBuild {
            chain,
            variable_ids: ["z_0", "Wz_1", "Wz_2", "z_1", "z_2", "b_1", "b_2"]
                .iter()
                .map(|x| x.to_string())
                .collect(),
        }
    } else if VAE_IDS.contains(&id) {
        let chain = z0
            .then(LinearChannel::with_name(w1.clone(), "W_1")?, "Wz_1")?
            .then(PiecewiseLinearChannel::leaky_relu(VAE_HIDDEN, 0.0), "z_1")?
            .then(LinearChannel::with_name(w2.clone(), "W_2")?, "Wz_2")?
            .then(PiecewiseLinearChannel::hard_tanh(IMAGE_SIZE), "z_2")?
            .then(ReshapeChannel::new(&[IMAGE_SIZE], &[IMAGE_SIZE])?, SIGNAL_ID)?;
        PriorBuild {
            chain,
            variable_ids: ["z_0", "Wz_1", "Wz_2", "z_1", "z_2"]
                .iter()
                .map(|x| x.to_string())
                .collect(),
        }
    } else {
        return Err(SetupError::not_implemented(format!("VAE {}", id)).into());
    };

    Ok(ret)
}
