//! One signal recovery experiment.
//!
//! ```text
//! prior builder -> model assembly -> sample generation -> EP -> evaluation
//! ```

use crate::common::*;
use crate::error::SetupError;
use crate::params::*;
use crate::prior::{build_prior, PriorBuild};
use crate::sample::*;
use ep_util::metrics::{overlap, sign_invariant_mse};
use ep_util::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const DEFAULT_MAX_ITER: usize = 250;
pub const DEFAULT_DAMPING: f64 = 0.5;

/// `seed = 0` asks for a fresh generator
pub fn experiment_rng(seed: u64) -> StdRng {
    if seed != 0 {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_os_rng()
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_iter: usize,
    /// coefficient applied to both directions of every tracked variable
    pub damping: f64,
    pub check_decreasing: bool,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            damping: DEFAULT_DAMPING,
            check_decreasing: true,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    /// posterior mean of the signal
    pub x_pred: Array1<f64>,
    /// posterior variance reported by EP
    pub mse_ep: f64,
    /// `min(mse(x, r), mse(x, -r))`
    pub mse: f64,
    pub overlap: f64,
    pub n_iter: usize,
}

pub struct Experiment {
    config: ExperimentConfig,
    model: ChainModel,
    variable_ids: Vec<String>,
    truth: GroundTruth,
    observation: Observation,
    /// observation of `x_spec` through the same channel
    observation_spec: Option<Observation>,
    rng: StdRng,
}

impl Experiment {
    /// Build the prior, the observation model and a sample
    pub fn setup(config: ExperimentConfig) -> anyhow::Result<Self> {
        let mut rng = experiment_rng(config.seed);
        let n = config.model.signal_size()?;

        // 1. prior on x
        let PriorBuild {
            chain,
            mut variable_ids,
        } = build_prior(&config.prior, n, &config.weights_dir, &mut rng)?;

        // 2. observation channel
        let (chain, channel) = match &config.model {
            ModelParams::Denoising { .. } => (
                chain,
                SignalChannel::Denoising {
                    delta: config.delta,
                },
            ),
            ModelParams::Inpainting { n_rem, mode, .. } => {
                let mode: MaskMode = mode.parse()?;
                let mask = build_mask(n, *n_rem, mode, &mut rng)?;
                let chain = chain.then(
                    LinearChannel::with_name(mask.f_obs.clone(), "F")?,
                    MASKED_ID,
                )?;
                (chain, SignalChannel::Inpainting { mask })
            }
            ModelParams::Unsupported => {
                return Err(SetupError::not_implemented("model").into());
            }
        };
        variable_ids.push(SIGNAL_ID.to_string());

        // 3. ground truth and observations
        let truth = generate_truth(&config.data, n, config.seed, &config.data_dir, &mut rng)?;
        let observation = channel.apply(&truth.x, &mut rng);
        let observation_spec = truth.x_spec.as_ref().map(|x| channel.apply(x, &mut rng));

        // 4. likelihood on the last variable
        let likelihood = GaussianLikelihood::new(observation.y.clone(), config.delta)?;
        let model = ChainModel::new(chain, likelihood)?;

        if config.daft {
            info!("{}", model);
        }

        Ok(Self {
            config,
            model,
            variable_ids,
            truth,
            observation,
            observation_spec,
            rng,
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn model(&self) -> &ChainModel {
        &self.model
    }

    pub fn signal_size(&self) -> usize {
        self.truth.x.len()
    }

    pub fn truth(&self) -> &GroundTruth {
        &self.truth
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn observation_spec(&self) -> Option<&Observation> {
        self.observation_spec.as_ref()
    }

    /// Variables damped during EP, the signal last
    pub fn variable_ids(&self) -> &[String] {
        &self.variable_ids
    }

    /// `(id, fwd, c)` and `(id, bwd, c)` for every tracked variable
    pub fn build_variable_damping(&self, coef: f64) -> Vec<VariableDamping> {
        self.variable_ids
            .iter()
            .flat_map(|id| {
                [
                    VariableDamping::new(id, Direction::Fwd, coef),
                    VariableDamping::new(id, Direction::Bwd, coef),
                ]
            })
            .collect()
    }

    /// Draw signals from the prior
    pub fn sample_prior(&mut self, count: usize) -> Vec<Array1<f64>> {
        let chain = self.model.chain();
        (0..count)
            .filter_map(|_| chain.sample(&mut self.rng).remove(SIGNAL_ID))
            .collect()
    }

    /// Run EP and return the posterior of the signal
    pub fn run_ep(&mut self, options: &RunOptions) -> anyhow::Result<(VariableData, IterationSummary)> {
        let iterate_options = IterateOptions {
            max_iter: options.max_iter,
            check_decreasing: options.check_decreasing,
            variables_damping: self.build_variable_damping(options.damping),
            show_progress: options.show_progress,
        };
        let mut callback = EarlyStopping::default();
        let initializer = Initializer::default();

        let mut ep = ExpectationPropagation::new(&self.model);
        let summary = ep.iterate(&iterate_options, &mut callback, &initializer, &mut self.rng)?;
        info!(
            "EP stopped after {} iterations{}",
            summary.n_iter,
            if summary.restored {
                " (messages restored)"
            } else {
                ""
            }
        );

        let mut data = ep.get_variables_data(&[SIGNAL_ID])?;
        let x_data = data
            .remove(SIGNAL_ID)
            .ok_or(anyhow::anyhow!("no posterior for {}", SIGNAL_ID))?;
        Ok((x_data, summary))
    }

    /// Compare the posterior mean with the ground truth
    pub fn compute_mse(&self, x_data: &VariableData, n_iter: usize) -> anyhow::Result<Evaluation> {
        let mse = sign_invariant_mse(&self.truth.x, &x_data.r)?;
        let overlap = overlap(&self.truth.x, &x_data.r)?;
        info!("mse_ep: {:.3} mse: {:.3}", x_data.v, mse);
        Ok(Evaluation {
            x_pred: x_data.r.clone(),
            mse_ep: x_data.v,
            mse,
            overlap,
            n_iter,
        })
    }

    pub fn run(&mut self, options: &RunOptions) -> anyhow::Result<Evaluation> {
        let (x_data, summary) = self.run_ep(options)?;
        self.compute_mse(&x_data, summary.n_iter)
    }
}
