use crate::message::Message;
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;

/// How the free messages are set before the first sweep
#[derive(Debug, Clone)]
pub enum Initializer {
    /// every message is `(a, b * ones)`
    Constant { a: f64, b: f64 },
    /// precision `a_init`, `b ~ N(b_mean, b_var)` entrywise
    Noisy { a_init: f64, b_mean: f64, b_var: f64 },
}

impl Default for Initializer {
    fn default() -> Self {
        Initializer::Noisy {
            a_init: 0.0,
            b_mean: 0.0,
            b_var: 1.0,
        }
    }
}

impl Initializer {
    pub fn message<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Message {
        match *self {
            Initializer::Constant { a, b } => Message::new(a, Array1::from_elem(size, b)),
            Initializer::Noisy {
                a_init,
                b_mean,
                b_var,
            } => {
                let sd = b_var.max(0.0).sqrt();
                let b = Array1::from_shape_simple_fn(size, || {
                    let e: f64 = rng.sample(StandardNormal);
                    b_mean + sd * e
                });
                Message::new(a_init, b)
            }
        }
    }
}
