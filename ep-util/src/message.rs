//! Isotropic Gaussian messages in natural parameters.
//!
//! A message over a vector `x` of size `n` is proportional to
//!
//! ```text
//! exp(-a/2 * |x|^2 + b'x)
//! ```
//!
//! so that `a` is a (shared) precision and `b / a` the mean.

use ndarray::Array1;

/// Smallest precision (and variance) a message can carry
pub const EPSILON: f64 = 1e-11;

/// Largest precision a message can carry
pub const MAX_PRECISION: f64 = 1.0 / EPSILON;

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub a: f64,
    pub b: Array1<f64>,
}

/// Posterior summary: mean vector `r` and the variance `v` averaged
/// over the coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    pub r: Array1<f64>,
    pub v: f64,
}

impl Message {
    pub fn new(a: f64, b: Array1<f64>) -> Self {
        Self { a, b }
    }

    /// A flat message carrying no information
    pub fn uninformative(size: usize) -> Self {
        Self {
            a: 0.0,
            b: Array1::zeros(size),
        }
    }

    pub fn size(&self) -> usize {
        self.b.len()
    }

    /// Precision used in computations, never below `EPSILON`
    pub fn precision(&self) -> f64 {
        self.a.clamp(EPSILON, MAX_PRECISION)
    }

    /// Message with the same first two moments as `moments`
    pub fn from_moments(moments: &Moments) -> Self {
        let v = moments.v.max(EPSILON);
        Self {
            a: 1.0 / v,
            b: &moments.r / v,
        }
    }

    /// Product of two messages
    pub fn product(&self, other: &Message) -> Message {
        Message {
            a: self.a + other.a,
            b: &self.b + &other.b,
        }
    }

    /// Divide a moment-matched posterior by the cavity `other`. The
    /// precision is kept inside `[EPSILON, MAX_PRECISION]`.
    pub fn divide(&self, other: &Message) -> Message {
        Message {
            a: (self.a - other.a).clamp(EPSILON, MAX_PRECISION),
            b: &self.b - &other.b,
        }
    }

    /// `(1 - c) * self + c * old`
    pub fn damp(self, old: &Message, damping: f64) -> Message {
        if damping <= 0.0 {
            return self;
        }
        Message {
            a: (1.0 - damping) * self.a + damping * old.a,
            b: self.b * (1.0 - damping) + &old.b * damping,
        }
    }

    pub fn moments(&self) -> Moments {
        let a = self.precision();
        Moments {
            r: &self.b / a,
            v: 1.0 / a,
        }
    }

    pub fn has_nan(&self) -> bool {
        self.a.is_nan() || self.b.iter().any(|x| x.is_nan())
    }
}
