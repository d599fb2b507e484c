use crate::experiment::Evaluation;
use crate::params::{ExperimentConfig, PriorParams};
use matrix_util::common_io::{mkdir, open_buf_writer};
use serde::Serialize;
use std::io::Write;

/// `<out>/<model>/<data>_<prior>_<id>_Delta<Δ>_alpha<α>_<ts>`
pub fn result_stem(out: &str, config: &ExperimentConfig, timestamp: u64) -> String {
    format!(
        "{}/{}/{}_{}_{}_Delta{:.3}_alpha{:.3}_{}",
        out,
        config.model.name(),
        config.data.name(),
        config.prior.name(),
        config.prior.id().unwrap_or("none"),
        config.delta,
        config.prior.alpha(),
        timestamp
    )
}

/// `<out>/Prior_<prior>_<type>_<id>.png`
pub fn prior_sample_file(out: &str, prior: &PriorParams) -> String {
    format!(
        "{}/Prior_{}_{}_{}.png",
        out,
        prior.name(),
        prior.kind().unwrap_or("none"),
        prior.id().unwrap_or("none")
    )
}

/// `<out>/<model>/truth_<data>_<seed>.png`
pub fn truth_file(out: &str, config: &ExperimentConfig) -> String {
    format!(
        "{}/{}/truth_{}_{}.png",
        out,
        config.model.name(),
        config.data.name(),
        config.seed
    )
}

/// `<out>/<model>/truth_spec_<data>_<seed>.png`
pub fn truth_spec_file(out: &str, config: &ExperimentConfig) -> String {
    format!(
        "{}/{}/truth_spec_{}_{}.png",
        out,
        config.model.name(),
        config.data.name(),
        config.seed
    )
}

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub config: &'a ExperimentConfig,
    pub mse: f64,
    pub mse_ep: f64,
    pub overlap: f64,
    pub n_iter: usize,
}

impl<'a> RunSummary<'a> {
    pub fn new(config: &'a ExperimentConfig, eval: &Evaluation) -> Self {
        Self {
            config,
            mse: eval.mse,
            mse_ep: eval.mse_ep,
            overlap: eval.overlap,
            n_iter: eval.n_iter,
        }
    }

    pub fn to_json_file(&self, file: &str) -> anyhow::Result<()> {
        mkdir(file)?;
        let mut writer = open_buf_writer(file)?;
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
