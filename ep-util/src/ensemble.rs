use matrix_util::traits::SampleOps;
use ndarray::Array2;
use rand::Rng;

/// `n x m` matrix with i.i.d. `N(0, 1/m)` entries so that `W z` has
/// entries of order one for `z ~ N(0, I_m)`
pub fn gaussian_ensemble<R: Rng + ?Sized>(n: usize, m: usize, rng: &mut R) -> Array2<f64> {
    let scale = 1.0 / (m.max(1) as f64).sqrt();
    Array2::<f64>::rnorm_with(n, m, rng) * scale
}
