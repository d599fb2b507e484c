use clap::Args;
use lentil::common::*;
use lentil::experiment::*;
use lentil::params::ExperimentConfig;
use lentil::plot::*;
use lentil::report::*;
use std::time::{SystemTime, UNIX_EPOCH};

/// Number of prior samples on each side of the grid
const PRIOR_GRID: u32 = 5;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Experiment configuration (JSON). Without it, denoise a Gaussian
    /// vector of size 1000 under a Gaussian prior.
    #[arg(long, short)]
    config: Option<Box<str>>,

    /// Maximum number of EP iterations
    #[arg(long, default_value_t = DEFAULT_MAX_ITER)]
    max_iter: usize,

    /// Damping coefficient of every tracked variable
    #[arg(long, default_value_t = DEFAULT_DAMPING)]
    damping: f64,

    /// Keep iterating even if the posterior variances go up
    #[arg(long, default_value_t = false)]
    no_check_decreasing: bool,

    /// Output directory for figures and summaries
    #[arg(long, short, default_value = "Images")]
    out: Box<str>,

    /// Override the noise variance `Delta`
    #[arg(long)]
    delta: Option<f64>,

    /// Override the random seed (also the test image index)
    #[arg(long)]
    seed: Option<u64>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

pub fn run_experiment(args: &RunArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let mut config = match args.config.as_deref() {
        Some(file) => ExperimentConfig::from_json_file(file)?,
        None => ExperimentConfig::default(),
    };
    if let Some(delta) = args.delta {
        config.delta = delta;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let out = args.out.as_ref();
    let mut experiment = Experiment::setup(config.clone())?;
    let is_image = experiment.signal_size() == IMAGE_SIZE;

    if config.plot_prior_sample {
        if is_image {
            let samples = experiment.sample_prior((PRIOR_GRID * PRIOR_GRID) as usize);
            save_sample_grid(&prior_sample_file(out, &config.prior), &samples, PRIOR_GRID)?;
        } else {
            warn!("prior samples are only drawn for {} pixel images", IMAGE_SIZE);
        }
    }

    if config.plot_truth && config.data.is_image() {
        save_signal(&truth_file(out, &config), &experiment.truth().x)?;
        if let (Some(x_spec), Some(obs)) = (
            experiment.truth().x_spec.as_ref(),
            experiment.observation_spec(),
        ) {
            let observed = obs.y_inp.as_ref().unwrap_or(&obs.y);
            save_signal_and_observation(&truth_spec_file(out, &config), x_spec, observed)?;
        }
    }

    let options = RunOptions {
        max_iter: args.max_iter,
        damping: args.damping,
        check_decreasing: !args.no_check_decreasing,
        show_progress: args.verbose,
    };
    let eval = experiment.run(&options)?;

    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let stem = result_stem(out, &config, timestamp);

    if config.plot_truth_vs_pred {
        if is_image {
            let truth = &experiment.truth().x;
            let observed = experiment
                .observation()
                .y_inp
                .as_ref()
                .unwrap_or(&experiment.observation().y);
            save_truth_vs_prediction(&(stem.clone() + ".png"), truth, observed, &eval.x_pred)?;
        } else {
            warn!("truth vs. prediction is only drawn for {} pixel images", IMAGE_SIZE);
        }
    }

    RunSummary::new(&config, &eval).to_json_file(&(stem.clone() + ".json"))?;
    info!("Wrote {}.json", stem);

    println!(
        "mse_ep: {:.3} mse: {:.3} overlap: {:.3} iterations: {}",
        eval.mse_ep, eval.mse, eval.overlap, eval.n_iter
    );
    Ok(())
}
