use crate::message::{Message, EPSILON};
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;

/// Gaussian observation `y ~ N(x, var I)` attached to the last variable
/// of a chain. A zero variance is treated as the smallest variance a
/// message can carry.
#[derive(Debug, Clone)]
pub struct GaussianLikelihood {
    y: Array1<f64>,
    var: f64,
}

impl GaussianLikelihood {
    pub fn new(y: Array1<f64>, var: f64) -> anyhow::Result<Self> {
        if var < 0.0 || !var.is_finite() {
            anyhow::bail!("likelihood variance must be non-negative: {}", var);
        }
        Ok(Self { y, var })
    }

    pub fn size(&self) -> usize {
        self.y.len()
    }

    pub fn var(&self) -> f64 {
        self.var
    }

    /// The message the likelihood sends to its variable; it never changes
    pub fn message(&self) -> Message {
        let a = 1.0 / self.var.max(EPSILON);
        Message::new(a, &self.y * a)
    }

    /// Draw an observation for a given signal
    pub fn sample<R: Rng + ?Sized>(&self, x: &Array1<f64>, rng: &mut R) -> Array1<f64> {
        let sd = self.var.sqrt();
        x.mapv(|xi| {
            let e: f64 = rng.sample(StandardNormal);
            xi + sd * e
        })
    }
}
