//! Expectation propagation on a [`ChainModel`].
//!
//! Each variable `v_k` keeps two messages: `fwd[k]` from the factor on its
//! prior side and `bwd[k]` from the factor on its observation side. One
//! iteration is a forward sweep over the channels followed by a backward
//! sweep; the marginal of `v_k` is `fwd[k] * bwd[k]`.

use crate::callback::Callback;
use crate::init::Initializer;
use crate::message::Message;
use crate::model::ChainModel;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use ndarray::Array1;
use rand::Rng;
use std::collections::HashMap;

/// Relative increase of the summed variance counted as "not decreasing"
const MAX_INCREASE: f64 = 0.2;

/// Number of consecutive increases tolerated with `check_decreasing`
const WAIT_INCREASE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// message arriving from the prior side
    Fwd,
    /// message arriving from the observation side
    Bwd,
}

/// `(variable id, direction, damping coefficient)`
#[derive(Debug, Clone)]
pub struct VariableDamping {
    pub id: String,
    pub direction: Direction,
    pub damping: f64,
}

impl VariableDamping {
    pub fn new(id: &str, direction: Direction, damping: f64) -> Self {
        Self {
            id: id.to_string(),
            direction,
            damping,
        }
    }
}

/// Posterior mean `r` and averaged variance `v` of a variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableData {
    pub r: Array1<f64>,
    pub v: f64,
}

#[derive(Debug, Clone)]
pub struct IterateOptions {
    pub max_iter: usize,
    pub check_decreasing: bool,
    pub variables_damping: Vec<VariableDamping>,
    pub show_progress: bool,
}

impl Default for IterateOptions {
    fn default() -> Self {
        Self {
            max_iter: 250,
            check_decreasing: true,
            variables_damping: vec![],
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationSummary {
    /// number of completed iterations
    pub n_iter: usize,
    /// the callback asked to stop before `max_iter`
    pub stopped_early: bool,
    /// messages were rolled back to an earlier iteration
    pub restored: bool,
}

pub struct ExpectationPropagation<'a> {
    model: &'a ChainModel,
    fwd: Vec<Message>,
    bwd: Vec<Message>,
}

impl<'a> ExpectationPropagation<'a> {
    pub fn new(model: &'a ChainModel) -> Self {
        let nvar = model.num_variables();
        let mut fwd: Vec<Message> = (0..nvar)
            .map(|k| Message::uninformative(model.variable_size(k)))
            .collect();
        let mut bwd = fwd.clone();
        fwd[0] = model.chain().prior().message();
        bwd[nvar - 1] = model.likelihood().message();
        Self { model, fwd, bwd }
    }

    pub fn model(&self) -> &ChainModel {
        self.model
    }

    /// Reset the free messages; the prior and likelihood messages are fixed
    pub fn initialize<R: Rng + ?Sized>(&mut self, initializer: &Initializer, rng: &mut R) {
        let nvar = self.model.num_variables();
        for k in 0..nvar {
            let size = self.model.variable_size(k);
            if k > 0 {
                self.fwd[k] = initializer.message(size, rng);
            }
            if k + 1 < nvar {
                self.bwd[k] = initializer.message(size, rng);
            }
        }
    }

    fn resolve_damping(&self, damping: &[VariableDamping]) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
        let nvar = self.model.num_variables();
        let mut fwd = vec![0.0; nvar];
        let mut bwd = vec![0.0; nvar];
        for d in damping {
            let k = self
                .model
                .variable_index(&d.id)
                .ok_or(anyhow::anyhow!("cannot damp unknown variable {}", d.id))?;
            if !(0.0..1.0).contains(&d.damping) {
                anyhow::bail!("damping for {} must be in [0, 1): {}", d.id, d.damping);
            }
            match d.direction {
                Direction::Fwd => fwd[k] = d.damping,
                Direction::Bwd => bwd[k] = d.damping,
            }
        }
        Ok((fwd, bwd))
    }

    fn forward_sweep(&mut self, damping: &[f64]) {
        let model = self.model;
        for (k, channel) in model.chain().channels().iter().enumerate().map(|(i, c)| (i + 1, c)) {
            let (_, post_x) = channel.posterior(&self.fwd[k - 1], &self.bwd[k]);
            let new = Message::from_moments(&post_x).divide(&self.bwd[k]);
            self.fwd[k] = new.damp(&self.fwd[k], damping[k]);
        }
    }

    fn backward_sweep(&mut self, damping: &[f64]) {
        let model = self.model;
        for (k, channel) in model.chain().channels().iter().enumerate().rev() {
            let (post_z, _) = channel.posterior(&self.fwd[k], &self.bwd[k + 1]);
            let new = Message::from_moments(&post_z).divide(&self.fwd[k]);
            self.bwd[k] = new.damp(&self.bwd[k], damping[k]);
        }
    }

    fn has_nan(&self) -> bool {
        self.fwd.iter().chain(self.bwd.iter()).any(|m| m.has_nan())
    }

    fn total_variance(&self) -> f64 {
        self.all_variables_data().iter().map(|d| d.v).sum()
    }

    /// Run EP until `callback` stops it or `max_iter` iterations are done
    pub fn iterate<R: Rng + ?Sized>(
        &mut self,
        options: &IterateOptions,
        callback: &mut dyn Callback,
        initializer: &Initializer,
        rng: &mut R,
    ) -> anyhow::Result<IterationSummary> {
        let (fwd_damping, bwd_damping) = self.resolve_damping(&options.variables_damping)?;
        self.initialize(initializer, rng);

        let pb = if options.show_progress {
            let pb = ProgressBar::new(options.max_iter as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("EP {bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
            {
                pb.set_style(style);
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut summary = IterationSummary {
            n_iter: 0,
            stopped_early: false,
            restored: false,
        };

        let mut prev_total = f64::INFINITY;
        let mut n_increase = 0;
        let mut snapshot: Option<(Vec<Message>, Vec<Message>)> = None;

        for iter in 0..options.max_iter {
            let before = (self.fwd.clone(), self.bwd.clone());

            self.forward_sweep(&fwd_damping);
            self.backward_sweep(&bwd_damping);

            if self.has_nan() {
                warn!("iteration {}: NaN in messages, keeping the previous ones", iter);
                (self.fwd, self.bwd) = before;
                summary.restored = true;
                summary.stopped_early = true;
                break;
            }

            summary.n_iter = iter + 1;
            pb.inc(1);

            if options.check_decreasing {
                let total = self.total_variance();
                if total > prev_total * (1.0 + MAX_INCREASE) {
                    if n_increase == 0 {
                        snapshot = Some(before);
                    }
                    n_increase += 1;
                    debug!(
                        "iteration {}: variance went up {:.3e} -> {:.3e}",
                        iter, prev_total, total
                    );
                } else {
                    n_increase = 0;
                    snapshot = None;
                }
                prev_total = total;

                if n_increase >= WAIT_INCREASE {
                    if let Some((fwd, bwd)) = snapshot.take() {
                        info!(
                            "iteration {}: variance kept increasing, restoring iteration {}",
                            iter,
                            iter + 1 - WAIT_INCREASE
                        );
                        self.fwd = fwd;
                        self.bwd = bwd;
                        summary.restored = true;
                    }
                    summary.stopped_early = true;
                    break;
                }
            }

            if callback.call(self, iter, options.max_iter) {
                summary.stopped_early = iter + 1 < options.max_iter;
                break;
            }
        }

        pb.finish_and_clear();
        debug!("EP finished after {} iterations", summary.n_iter);
        Ok(summary)
    }

    /// Marginal of the `index`-th variable of the chain
    pub fn variable_data(&self, index: usize) -> VariableData {
        let m = self.fwd[index].product(&self.bwd[index]).moments();
        VariableData { r: m.r, v: m.v }
    }

    pub fn all_variables_data(&self) -> Vec<VariableData> {
        (0..self.model.num_variables())
            .map(|k| self.variable_data(k))
            .collect()
    }

    pub fn get_variables_data(&self, ids: &[&str]) -> anyhow::Result<HashMap<String, VariableData>> {
        let mut ret = HashMap::new();
        for id in ids {
            let k = self
                .model
                .variable_index(id)
                .ok_or(anyhow::anyhow!("unknown variable {}", id))?;
            ret.insert(id.to_string(), self.variable_data(k));
        }
        Ok(ret)
    }
}
