mod run_experiment;
mod run_inspect_weights;
mod run_sample_prior;

use crate::run_experiment::*;
use crate::run_inspect_weights::*;
use crate::run_sample_prior::*;

use clap::{Parser, Subcommand};
use log::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "LENTIL",
    long_about = "Expectation propagation with structured priors\n\
		  Recover a signal (Gaussian vector or test image) from noisy\n\
		  or partial observations under a Gaussian, GLM, multi-layer\n\
		  or pretrained VAE decoder prior."
)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run a denoising or inpainting experiment",
        long_about = "Run one experiment in four stages: \n\
		      (1) Build the prior on the signal\n\
		      (2) Draw a signal and observe it through the channel\n\
		      (3) Estimate the signal by expectation propagation\n\
		      (4) Report the mean squared error and save figures.\n"
    )]
    Run(RunArgs),

    /// Draw a grid of samples from the configured prior
    SamplePrior(SamplePriorArgs),

    /// List the layers of a pretrained weight file
    InspectWeights(InspectWeightsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.commands {
        Commands::Run(args) => {
            run_experiment(args)?;
        }
        Commands::SamplePrior(args) => {
            run_sample_prior(args)?;
        }
        Commands::InspectWeights(args) => {
            run_inspect_weights(args)?;
        }
    }

    info!("Done");
    Ok(())
}
