use crate::ep::{ExpectationPropagation, VariableData};
use crate::message::MAX_PRECISION;
use log::{info, warn};

/// Called after every EP iteration; returning `true` stops the iteration
pub trait Callback {
    fn call(&mut self, algo: &ExpectationPropagation, iteration: usize, max_iter: usize) -> bool;
}

/// Stop when the posterior summaries no longer move, when a variance
/// collapses, or when a NaN shows up.
///
/// A variance has collapsed once it reaches `min_variance` or
/// `1 / MAX_PRECISION`, whichever is larger; marginal precisions are
/// capped so no variance goes below the latter.
///
/// The change between two iterations is the largest, over variables, of
/// `max(mean((r_old - r_new)^2), (v_old - v_new)^2)`.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    pub tol: f64,
    pub min_variance: f64,
    old: Option<Vec<VariableData>>,
}

impl EarlyStopping {
    pub fn new(tol: f64, min_variance: f64) -> Self {
        Self {
            tol,
            min_variance,
            old: None,
        }
    }
}

impl Default for EarlyStopping {
    fn default() -> Self {
        Self::new(1e-4, 1e-12)
    }
}

impl Callback for EarlyStopping {
    fn call(&mut self, algo: &ExpectationPropagation, iteration: usize, _max_iter: usize) -> bool {
        if iteration == 0 {
            self.old = None;
        }

        let new = algo.all_variables_data();

        if new.iter().any(|d| d.v.is_nan() || d.r.iter().any(|x| x.is_nan())) {
            warn!("iteration {}: NaN in posterior estimates", iteration);
            return true;
        }

        let floor = self.min_variance.max(1.0 / MAX_PRECISION);
        if let Some(d) = new.iter().find(|d| d.v <= floor) {
            info!(
                "iteration {}: variance {:.3e} collapsed (floor {:.1e})",
                iteration, d.v, floor
            );
            return true;
        }

        let stop = match &self.old {
            Some(old) => {
                let change = old
                    .iter()
                    .zip(new.iter())
                    .map(|(o, n)| {
                        let dr = (&o.r - &n.r).mapv(|x| x * x).mean().unwrap_or(0.0);
                        let dv = (o.v - n.v) * (o.v - n.v);
                        dr.max(dv)
                    })
                    .fold(0.0, f64::max);
                if change < self.tol {
                    info!(
                        "iteration {}: converged (change {:.3e} < {:.1e})",
                        iteration, change, self.tol
                    );
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        self.old = Some(new);
        stop
    }
}

/// Run several callbacks; stop as soon as one of them asks to
#[derive(Default)]
pub struct JoinCallback {
    callbacks: Vec<Box<dyn Callback>>,
}

impl JoinCallback {
    pub fn new(callbacks: Vec<Box<dyn Callback>>) -> Self {
        Self { callbacks }
    }
}

impl Callback for JoinCallback {
    fn call(&mut self, algo: &ExpectationPropagation, iteration: usize, max_iter: usize) -> bool {
        let mut stop = false;
        for cb in self.callbacks.iter_mut() {
            stop |= cb.call(algo, iteration, max_iter);
        }
        stop
    }
}

/// Never stops early
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCallback;

impl Callback for NoCallback {
    fn call(&mut self, _: &ExpectationPropagation, _: usize, _: usize) -> bool {
        false
    }
}
