use clap::Args;
use lentil::common::*;
use lentil::experiment::experiment_rng;
use lentil::params::ExperimentConfig;
use lentil::plot::save_sample_grid;
use lentil::prior::build_prior;
use lentil::report::prior_sample_file;

#[derive(Args, Debug)]
pub struct SamplePriorArgs {
    /// Experiment configuration (JSON)
    #[arg(long, short, required = true)]
    config: Box<str>,

    /// Number of samples on each side of the grid
    #[arg(long, short, default_value_t = 5)]
    grid: u32,

    /// Output directory
    #[arg(long, short, default_value = "Images")]
    out: Box<str>,

    /// verbosity
    #[arg(long, short)]
    verbose: bool,
}

pub fn run_sample_prior(args: &SamplePriorArgs) -> anyhow::Result<()> {
    if args.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let config = ExperimentConfig::from_json_file(&args.config)?;
    let n = config.model.signal_size()?;
    let mut rng = experiment_rng(config.seed);
    let prior = build_prior(&config.prior, n, &config.weights_dir, &mut rng)?;

    let nsamples = (args.grid * args.grid) as usize;
    let samples: Vec<Array1<f64>> = (0..nsamples)
        .filter_map(|_| prior.chain.sample(&mut rng).remove(SIGNAL_ID))
        .collect();
    info!("Drew {} samples of size {}", samples.len(), n);

    save_sample_grid(
        &prior_sample_file(&args.out, &config.prior),
        &samples,
        args.grid,
    )
}
