use crate::message::Message;
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;

/// Factorized Gaussian prior `N(mean, var I)` on the first variable of
/// a chain
#[derive(Debug, Clone)]
pub struct GaussianPrior {
    size: usize,
    mean: f64,
    var: f64,
}

impl GaussianPrior {
    /// Standard normal prior
    pub fn new(size: usize) -> Self {
        Self {
            size,
            mean: 0.0,
            var: 1.0,
        }
    }

    pub fn with_moments(size: usize, mean: f64, var: f64) -> anyhow::Result<Self> {
        if var <= 0.0 || !var.is_finite() {
            anyhow::bail!("prior variance must be positive and finite: {}", var);
        }
        Ok(Self { size, mean, var })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The message the prior sends to its variable; it never changes
    pub fn message(&self) -> Message {
        let a = 1.0 / self.var;
        Message::new(a, Array1::from_elem(self.size, self.mean * a))
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
        let sd = self.var.sqrt();
        Array1::from_shape_simple_fn(self.size, || {
            let e: f64 = rng.sample(StandardNormal);
            self.mean + sd * e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn message_carries_the_moments() -> anyhow::Result<()> {
        let prior = GaussianPrior::with_moments(3, 2.0, 0.5)?;
        let m = prior.message().moments();
        assert_abs_diff_eq!(m.v, 0.5, epsilon = 1e-12);
        assert!(m.r.iter().all(|&r| (r - 2.0).abs() < 1e-12));
        assert!(GaussianPrior::with_moments(3, 0.0, 0.0).is_err());
        Ok(())
    }

    #[test]
    fn samples_are_centred_on_the_mean() -> anyhow::Result<()> {
        let prior = GaussianPrior::with_moments(20_000, -1.0, 4.0)?;
        let x = prior.sample(&mut StdRng::seed_from_u64(7));
        assert_abs_diff_eq!(x.mean().unwrap_or(0.0), -1.0, epsilon = 0.1);
        Ok(())
    }
}
