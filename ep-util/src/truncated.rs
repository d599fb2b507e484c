//! Normal CDF in log space and truncated-normal moments.
//!
//! ```text
//! Z(a, b; l, u) = ∫_l^u exp(-a z^2 / 2 + b z) dz
//!               = sqrt(2π / a) exp(b^2 / 2a) [Φ(β) - Φ(α)]
//! α = (l - r) / σ,  β = (u - r) / σ,  r = b / a,  σ = 1 / sqrt(a)
//! ```

use statrs::function::erf::{erf, erfc};
use std::f64::consts::{LN_2, PI, SQRT_2};

/// `ln(sqrt(2π))`
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Below this point `log Φ` switches to the asymptotic Mills ratio
const LOG_CDF_ASYMPTOTIC: f64 = -30.0;

/// `ln φ(x)`
#[inline]
pub fn log_norm_pdf(x: f64) -> f64 {
    -0.5 * x * x - LN_SQRT_2PI
}

/// `ln Φ(x)`, accurate far into the lower tail
pub fn log_norm_cdf(x: f64) -> f64 {
    if x == f64::INFINITY {
        0.0
    } else if x == f64::NEG_INFINITY {
        f64::NEG_INFINITY
    } else if x > LOG_CDF_ASYMPTOTIC {
        (0.5 * erfc(-x / SQRT_2)).ln()
    } else {
        let x2 = x * x;
        log_norm_pdf(x) - (-x).ln() + (1.0 - 1.0 / x2 + 3.0 / (x2 * x2)).ln()
    }
}

/// `ln(1 - e^x)` for `x <= 0`
#[inline]
fn log1mexp(x: f64) -> f64 {
    if x > -LN_2 {
        (-x.exp_m1()).ln()
    } else {
        (-x.exp()).ln_1p()
    }
}

/// `erf(x / sqrt 2)`, i.e., `2Φ(x) - 1`, defined on the extended line
#[inline]
fn centred_cdf(x: f64) -> f64 {
    if x == f64::INFINITY {
        1.0
    } else if x == f64::NEG_INFINITY {
        -1.0
    } else {
        erf(x / SQRT_2)
    }
}

/// `ln(Φ(β) - Φ(α))`
pub fn log_norm_interval(alpha: f64, beta: f64) -> f64 {
    if alpha >= beta {
        return f64::NEG_INFINITY;
    }

    if alpha > 0.0 {
        // both in the upper tail: Φ(-α) - Φ(-β)
        let la = log_norm_cdf(-alpha);
        let lb = log_norm_cdf(-beta);
        la + log1mexp(lb - la)
    } else if beta < 0.0 {
        let lb = log_norm_cdf(beta);
        let la = log_norm_cdf(alpha);
        lb + log1mexp(la - lb)
    } else {
        (0.5 * (centred_cdf(beta) - centred_cdf(alpha))).ln()
    }
}

/// Normalizer and moments of `exp(-a z^2 / 2 + b z)` restricted to `[lower, upper]`
#[derive(Debug, Clone, Copy)]
pub struct TruncatedMoments {
    pub log_z: f64,
    pub mean: f64,
    pub var: f64,
}

/// Truncate the Gaussian with natural parameters `(a, b)` to `[lower, upper]`.
/// Either bound may be infinite; `a` must be positive.
pub fn truncated_moments(a: f64, b: f64, lower: f64, upper: f64) -> TruncatedMoments {
    debug_assert!(a > 0.0);

    let r = b / a;
    let sd = a.sqrt().recip();
    let alpha = (lower - r) / sd;
    let beta = (upper - r) / sd;

    let log_mass = log_norm_interval(alpha, beta);

    if log_mass == f64::NEG_INFINITY {
        return TruncatedMoments {
            log_z: f64::NEG_INFINITY,
            mean: r.clamp(lower, upper),
            var: 0.0,
        };
    }

    let log_z = 0.5 * (2.0 * PI / a).ln() + 0.5 * b * r + log_mass;

    let (pa, apa) = if alpha.is_finite() {
        let p = (log_norm_pdf(alpha) - log_mass).exp();
        (p, alpha * p)
    } else {
        (0.0, 0.0)
    };

    let (pb, bpb) = if beta.is_finite() {
        let p = (log_norm_pdf(beta) - log_mass).exp();
        (p, beta * p)
    } else {
        (0.0, 0.0)
    };

    let mean = (r + sd * (pa - pb)).clamp(lower, upper);
    let var = sd * sd * (1.0 + apa - bpb - (pa - pb) * (pa - pb));
    let var = if var.is_finite() { var.max(0.0) } else { 0.0 };

    TruncatedMoments { log_z, mean, var }
}

/// `ln Σ exp(x_i)`
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn log_cdf_matches_known_values() {
        assert_abs_diff_eq!(log_norm_cdf(0.0), 0.5_f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(log_norm_cdf(1.959_963_985), 0.975_f64.ln(), epsilon = 1e-8);
        // continuous across the switch to the asymptotic branch
        let below = log_norm_cdf(LOG_CDF_ASYMPTOTIC - 1e-9);
        let above = log_norm_cdf(LOG_CDF_ASYMPTOTIC + 1e-9);
        assert_abs_diff_eq!(below, above, epsilon = 1e-6);
        assert!(log_norm_cdf(-100.0).is_finite());
    }

    #[test]
    fn full_line_is_untruncated() {
        let m = truncated_moments(4.0, 2.0, f64::NEG_INFINITY, f64::INFINITY);
        assert_abs_diff_eq!(m.mean, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m.var, 0.25, epsilon = 1e-12);
        // sqrt(2π/4) exp(4/8)
        let expected = 0.5 * (2.0 * PI / 4.0).ln() + 0.5;
        assert_abs_diff_eq!(m.log_z, expected, epsilon = 1e-12);
    }

    #[test]
    fn half_normal_moments() {
        let m = truncated_moments(1.0, 0.0, 0.0, f64::INFINITY);
        let mean = (2.0 / PI).sqrt();
        assert_abs_diff_eq!(m.mean, mean, epsilon = 1e-10);
        assert_abs_diff_eq!(m.var, 1.0 - 2.0 / PI, epsilon = 1e-10);
        assert_abs_diff_eq!(m.log_z, 0.5 * (2.0 * PI).ln() + 0.5_f64.ln(), epsilon = 1e-10);
    }

    #[test]
    fn far_tail_stays_inside_interval() {
        // mean at -50 truncated to the positive half line
        let m = truncated_moments(1.0, -50.0, 0.0, f64::INFINITY);
        assert!(m.log_z.is_finite());
        assert!(m.mean >= 0.0 && m.mean < 0.1);
        assert!(m.var >= 0.0 && m.var < 0.01);
    }

    #[test]
    fn bounded_interval_is_symmetric() {
        let m = truncated_moments(1.0, 0.0, -1.0, 1.0);
        assert_abs_diff_eq!(m.mean, 0.0, epsilon = 1e-12);
        assert!(m.var < 1.0 / 3.0 && m.var > 0.0);
    }

    #[test]
    fn log_sum_exp_is_stable() {
        assert_abs_diff_eq!(log_sum_exp(&[1000.0, 1000.0]), 1000.0 + LN_2, epsilon = 1e-9);
        assert_eq!(log_sum_exp(&[f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }
}
