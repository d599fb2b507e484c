use super::Channel;
use crate::message::{Message, Moments};
use matrix_util::traits::ConvertMatOps;
use ndarray::{Array1, Array2};

/// `x = W z` with a fixed `N x M` matrix `W`.
///
/// With the thin SVD `W = U S V'` (rank `R = min(N, M)`) the posterior of
/// `z` under the isotropic messages `(az, bz)` and `(ax, bx)` is
///
/// ```text
/// Σ  = V diag(1 / (az + ax s^2)) V' + (I - V V') / az
/// rz = Σ (bz + W' bx)
/// vz = [Σ_k 1 / (az + ax s_k^2) + (M - R) / az] / M
/// rx = W rz,  vx = Σ_k s_k^2 / (az + ax s_k^2) / N
/// ```
#[derive(Debug, Clone)]
pub struct LinearChannel {
    name: String,
    w: Array2<f64>,
    s: Array1<f64>,
    vt: Array2<f64>,
}

impl LinearChannel {
    pub fn new(w: Array2<f64>) -> anyhow::Result<Self> {
        Self::with_name(w, "linear")
    }

    /// * `w` - `N x M` matrix mapping the input (size `M`) to the output (size `N`)
    /// * `name` - label of the factor
    pub fn with_name(w: Array2<f64>, name: &str) -> anyhow::Result<Self> {
        if w.is_empty() {
            anyhow::bail!("empty weight matrix for linear channel {}", name);
        }
        if w.iter().any(|x| !x.is_finite()) {
            anyhow::bail!("non-finite weights in linear channel {}", name);
        }

        let svd = w.to_other().svd(false, true);
        let vt = svd
            .v_t
            .ok_or(anyhow::anyhow!("SVD did not return V' for {}", name))?;

        Ok(Self {
            name: name.to_string(),
            s: Array1::from_iter(svd.singular_values.iter().cloned()),
            vt: Array2::from_other(&vt),
            w,
        })
    }
}

impl Channel for LinearChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_size(&self) -> usize {
        self.w.ncols()
    }

    fn output_size(&self) -> usize {
        self.w.nrows()
    }

    fn posterior(&self, to_input: &Message, to_output: &Message) -> (Moments, Moments) {
        let az = to_input.precision();
        let ax = to_output.precision();
        let mm = self.input_size() as f64;
        let nn = self.output_size() as f64;
        let rank = self.s.len() as f64;

        let s2 = self.s.mapv(|s| s * s);
        let gamma = s2.mapv(|s2| 1.0 / (az + ax * s2));

        let c = &to_input.b + &self.w.t().dot(&to_output.b);
        let p = self.vt.dot(&c);

        let in_span = self.vt.t().dot(&(&gamma * &p));
        let null_part = (&c - &self.vt.t().dot(&p)) / az;
        let rz = in_span + null_part;

        let vz = (gamma.sum() + (mm - rank) / az) / mm;
        let rx = self.w.dot(&rz);
        let vx = (&s2 * &gamma).sum() / nn;

        (Moments { r: rz, v: vz }, Moments { r: rx, v: vx })
    }

    fn sample(&self, z: &Array1<f64>) -> Array1<f64> {
        self.w.dot(z)
    }
}
