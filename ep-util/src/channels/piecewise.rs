use super::Channel;
use crate::message::{Message, Moments};
use crate::truncated::{log_sum_exp, truncated_moments};
use ndarray::Array1;
use rayon::prelude::*;

/// One linear piece `x = slope * z + offset` for `z` in `[lower, upper]`
#[derive(Debug, Clone, Copy)]
pub struct Piece {
    pub lower: f64,
    pub upper: f64,
    pub slope: f64,
    pub offset: f64,
}

impl Piece {
    pub fn new(lower: f64, upper: f64, slope: f64, offset: f64) -> Self {
        Self {
            lower,
            upper,
            slope,
            offset,
        }
    }

    #[inline]
    fn apply(&self, z: f64) -> f64 {
        self.slope * z + self.offset
    }
}

/// Element-wise piecewise linear activation. The pieces must tile the
/// real line. Rectified linear, leaky rectified linear, hard tanh, sign
/// and absolute value are all special cases.
///
/// For each coordinate, piece `p` contributes
///
/// ```text
/// ∫_{l_p}^{u_p} exp(-az z^2/2 + bz z) exp(-ax x_p(z)^2/2 + bx x_p(z)) dz
/// ```
///
/// which is a truncated Gaussian in `z`; the posterior is the mixture
/// of these pieces weighted by their normalizers.
#[derive(Debug, Clone)]
pub struct PiecewiseLinearChannel {
    name: String,
    size: usize,
    pieces: Vec<Piece>,
}

impl PiecewiseLinearChannel {
    pub fn new(name: &str, size: usize, pieces: Vec<Piece>) -> anyhow::Result<Self> {
        if pieces.is_empty() {
            anyhow::bail!("{}: need at least one piece", name);
        }
        let mut sorted = pieces.clone();
        sorted.sort_by(|a, b| a.lower.total_cmp(&b.lower));

        let tiles = sorted.first().map(|p| p.lower) == Some(f64::NEG_INFINITY)
            && sorted.last().map(|p| p.upper) == Some(f64::INFINITY)
            && sorted.windows(2).all(|w| w[0].upper == w[1].lower)
            && sorted.iter().all(|p| p.lower < p.upper);

        if !tiles {
            anyhow::bail!("{}: pieces must tile the real line", name);
        }

        Ok(Self {
            name: name.to_string(),
            size,
            pieces: sorted,
        })
    }

    /// `x = max(0, z)`
    pub fn relu(size: usize) -> Self {
        Self::leaky_relu(size, 0.0).named("relu")
    }

    /// `x = z` if `z > 0`, `slope * z` otherwise
    pub fn leaky_relu(size: usize, slope: f64) -> Self {
        Self::from_tiling(
            "leaky-relu",
            size,
            vec![
                Piece::new(f64::NEG_INFINITY, 0.0, slope, 0.0),
                Piece::new(0.0, f64::INFINITY, 1.0, 0.0),
            ],
        )
    }

    /// `x = clip(z, -1, 1)`
    pub fn hard_tanh(size: usize) -> Self {
        Self::from_tiling(
            "hard-tanh",
            size,
            vec![
                Piece::new(f64::NEG_INFINITY, -1.0, 0.0, -1.0),
                Piece::new(-1.0, 1.0, 1.0, 0.0),
                Piece::new(1.0, f64::INFINITY, 0.0, 1.0),
            ],
        )
    }

    /// `x = sign(z)`
    pub fn sign(size: usize) -> Self {
        Self::from_tiling(
            "sign",
            size,
            vec![
                Piece::new(f64::NEG_INFINITY, 0.0, 0.0, -1.0),
                Piece::new(0.0, f64::INFINITY, 0.0, 1.0),
            ],
        )
    }

    /// `x = |z|`
    pub fn abs(size: usize) -> Self {
        Self::from_tiling(
            "abs",
            size,
            vec![
                Piece::new(f64::NEG_INFINITY, 0.0, -1.0, 0.0),
                Piece::new(0.0, f64::INFINITY, 1.0, 0.0),
            ],
        )
    }

    fn from_tiling(name: &str, size: usize, pieces: Vec<Piece>) -> Self {
        Self {
            name: name.to_string(),
            size,
            pieces,
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Posterior `(E z, V z, E x, V x)` of a single coordinate
    fn scalar_posterior(&self, az: f64, bz: f64, ax: f64, bx: f64) -> (f64, f64, f64, f64) {
        let parts: Vec<(f64, f64, f64, &Piece)> = self
            .pieces
            .iter()
            .map(|p| {
                let (s, c) = (p.slope, p.offset);
                let a = az + ax * s * s;
                let b = bz + s * bx - ax * s * c;
                let log_const = bx * c - 0.5 * ax * c * c;
                let tm = truncated_moments(a, b, p.lower, p.upper);
                (log_const + tm.log_z, tm.mean, tm.var, p)
            })
            .collect();

        let log_w: Vec<f64> = parts.iter().map(|x| x.0).collect();
        let log_norm = log_sum_exp(&log_w);

        let (mut ez, mut ez2, mut ex, mut ex2) = (0.0, 0.0, 0.0, 0.0);
        for &(lw, m, v, p) in parts.iter() {
            let w = if log_norm.is_finite() {
                (lw - log_norm).exp()
            } else {
                1.0 / parts.len() as f64
            };
            let mx = p.apply(m);
            let vx = p.slope * p.slope * v;
            ez += w * m;
            ez2 += w * (v + m * m);
            ex += w * mx;
            ex2 += w * (vx + mx * mx);
        }

        (ez, (ez2 - ez * ez).max(0.0), ex, (ex2 - ex * ex).max(0.0))
    }
}

impl Channel for PiecewiseLinearChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn posterior(&self, to_input: &Message, to_output: &Message) -> (Moments, Moments) {
        let az = to_input.precision();
        let ax = to_output.precision();

        let stats: Vec<(f64, f64, f64, f64)> = (0..self.size)
            .into_par_iter()
            .map(|i| self.scalar_posterior(az, to_input.b[i], ax, to_output.b[i]))
            .collect();

        let nn = self.size.max(1) as f64;
        let rz = Array1::from_iter(stats.iter().map(|x| x.0));
        let vz = stats.iter().map(|x| x.1).sum::<f64>() / nn;
        let rx = Array1::from_iter(stats.iter().map(|x| x.2));
        let vx = stats.iter().map(|x| x.3).sum::<f64>() / nn;

        (Moments { r: rz, v: vz }, Moments { r: rx, v: vx })
    }

    fn sample(&self, z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|zi| {
            self.pieces
                .iter()
                .find(|p| zi >= p.lower && zi < p.upper)
                .map(|p| p.apply(zi))
                .unwrap_or(zi)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn sampling_applies_activation() {
        let z = array![-2.0, -0.5, 0.5, 2.0];
        assert_eq!(
            PiecewiseLinearChannel::relu(4).sample(&z),
            array![0.0, 0.0, 0.5, 2.0]
        );
        assert_eq!(
            PiecewiseLinearChannel::hard_tanh(4).sample(&z),
            array![-1.0, -0.5, 0.5, 1.0]
        );
        assert_eq!(
            PiecewiseLinearChannel::sign(4).sample(&z),
            array![-1.0, -1.0, 1.0, 1.0]
        );
        assert_eq!(
            PiecewiseLinearChannel::leaky_relu(4, 0.1).sample(&z),
            array![-0.2, -0.05, 0.5, 2.0]
        );
    }

    #[test]
    fn relu_without_output_information() {
        // z ~ N(0,1) and a flat message on x
        let ch = PiecewiseLinearChannel::relu(1);
        let (z, x) = ch.posterior(&Message::new(1.0, array![0.0]), &Message::new(0.0, array![0.0]));
        assert_abs_diff_eq!(z.r[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(z.v, 1.0, epsilon = 1e-6);
        // E max(0,z) = 1/sqrt(2π), E max(0,z)^2 = 1/2
        let ex = (2.0 * std::f64::consts::PI).sqrt().recip();
        assert_abs_diff_eq!(x.r[0], ex, epsilon = 1e-6);
        assert_abs_diff_eq!(x.v, 0.5 - ex * ex, epsilon = 1e-6);
    }

    #[test]
    fn sign_follows_a_strong_output_message() {
        let ch = PiecewiseLinearChannel::sign(1);
        let (z, x) = ch.posterior(
            &Message::new(1.0, array![0.0]),
            &Message::new(100.0, array![100.0]),
        );
        assert!(x.r[0] > 0.99);
        assert!(z.r[0] > 0.7);
    }

    #[test]
    fn identity_tiling_is_gaussian() {
        let ch =
            PiecewiseLinearChannel::new("id", 1, vec![Piece::new(f64::NEG_INFINITY, f64::INFINITY, 1.0, 0.0)])
                .unwrap();
        let (z, x) = ch.posterior(&Message::new(1.0, array![1.0]), &Message::new(3.0, array![0.0]));
        assert_abs_diff_eq!(z.r[0], 0.25, epsilon = 1e-10);
        assert_abs_diff_eq!(z.v, 0.25, epsilon = 1e-10);
        assert_abs_diff_eq!(x.r[0], 0.25, epsilon = 1e-10);
    }

    #[test]
    fn rejects_gaps() {
        let pieces = vec![
            Piece::new(f64::NEG_INFINITY, 0.0, 0.0, 0.0),
            Piece::new(1.0, f64::INFINITY, 1.0, 0.0),
        ];
        assert!(PiecewiseLinearChannel::new("gap", 3, pieces).is_err());
    }
}
