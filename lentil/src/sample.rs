use crate::common::*;
use crate::datasets::{load_test_images, ImageSource};
use crate::error::SetupError;
use crate::params::{DataParams, MaskMode};
use matrix_util::traits::MatOps;
use rand::Rng;
use rand_distr::StandardNormal;
use std::collections::BTreeSet;

/// Width of each diagonal stripe removed by [`MaskMode::Diagonal`]
const DIAGONAL_WIDTH: i64 = 4;

/// Inpainting mask.
///
/// `f_tot` is the identity with the removed coordinates zeroed and
/// `f_obs` keeps only its non-zero rows, so that `f_obs x` are the
/// observed coordinates of `x`.
#[derive(Debug, Clone)]
pub struct Mask {
    pub removed: Vec<usize>,
    pub kept: Vec<usize>,
    pub f_tot: Array2<f64>,
    pub f_obs: Array2<f64>,
}

impl Mask {
    pub fn from_removed(n: usize, removed: BTreeSet<usize>) -> Self {
        let kept: Vec<usize> = (0..n).filter(|i| !removed.contains(i)).collect();
        let f_tot = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j && !removed.contains(&i) {
                1.0
            } else {
                0.0
            }
        });
        let f_obs = Array2::from_shape_fn((kept.len(), n), |(i, j)| {
            if kept[i] == j {
                1.0
            } else {
                0.0
            }
        });
        Self {
            removed: removed.into_iter().collect(),
            kept,
            f_tot,
            f_obs,
        }
    }

    pub fn size(&self) -> usize {
        self.f_tot.ncols()
    }
}

/// Build an inpainting mask over a signal of size `n`
///
/// * `n_rem` - number of coordinates to remove (ignored by `Diagonal`)
/// * `mode` - band, random or diagonal
pub fn build_mask<R: Rng + ?Sized>(
    n: usize,
    n_rem: usize,
    mode: MaskMode,
    rng: &mut R,
) -> anyhow::Result<Mask> {
    if n_rem > n {
        anyhow::bail!("cannot remove {} coordinates out of {}", n_rem, n);
    }

    let removed: BTreeSet<usize> = match mode {
        MaskMode::Band => {
            let start = n / 2 - n_rem / 2;
            (start..(start + n_rem)).collect()
        }
        MaskMode::Random => rand::seq::index::sample(rng, n, n_rem).into_iter().collect(),
        MaskMode::Diagonal => {
            if n != IMAGE_SIZE {
                return Err(SetupError::dimension_mismatch("diagonal mask", IMAGE_SIZE, n).into());
            }
            let side = IMAGE_SIDE as i64;
            let mut ret = BTreeSet::new();
            for j in (-DIAGONAL_WIDTH / 2)..(DIAGONAL_WIDTH / 2) {
                for i in 1..(side - 1) {
                    ret.insert((i * side + i + j) as usize);
                    ret.insert((i * side - i - j) as usize);
                }
            }
            ret
        }
    };

    let mask = Mask::from_removed(n, removed);
    if mask.kept.is_empty() {
        anyhow::bail!(
            "the {:?} mask removes all {} coordinates, nothing would be observed",
            mode,
            n
        );
    }
    debug!(
        "mask keeps {} of {} coordinates",
        mask.kept.len(),
        mask.size()
    );
    Ok(mask)
}

/// How the observation is produced from the signal
#[derive(Debug, Clone)]
pub enum SignalChannel {
    /// `y = x + sqrt(delta) * noise`
    Denoising { delta: f64 },
    /// `y = F_obs x`
    Inpainting { mask: Mask },
}

#[derive(Debug, Clone)]
pub struct Observation {
    pub y: Array1<f64>,
    /// full-size view with the removed coordinates set to zero
    pub y_inp: Option<Array1<f64>>,
}

impl SignalChannel {
    pub fn apply<R: Rng + ?Sized>(&self, x: &Array1<f64>, rng: &mut R) -> Observation {
        match self {
            SignalChannel::Denoising { delta } => {
                let sd = delta.max(0.0).sqrt();
                let noise = Array1::from_shape_simple_fn(x.len(), || {
                    let e: f64 = rng.sample(StandardNormal);
                    sd * e
                });
                Observation {
                    y: x + &noise,
                    y_inp: None,
                }
            }
            SignalChannel::Inpainting { mask } => Observation {
                y: mask.f_obs.dot(x),
                y_inp: Some(mask.f_tot.dot(x)),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct GroundTruth {
    pub x: Array1<f64>,
    /// centred, L2-normalized and rescaled by `sqrt(784)` (image data only)
    pub x_spec: Option<Array1<f64>>,
}

/// Pixel values in `[0, 255]` to `[-1, 1]`
pub fn image_signal(pixels: ndarray::ArrayView1<f64>) -> Array1<f64> {
    pixels.mapv(|p| 2.0 * (p / 255.0) - 1.0)
}

/// `(x - mean(x)) / |x - mean(x)| * sqrt(784)`
pub fn spectral_signal(x: &Array1<f64>) -> Array1<f64> {
    let mut row = x.clone().insert_axis(Axis(0));
    row.centre_rows_inplace();
    row.normalize_rows_inplace();
    row.index_axis_move(Axis(0), 0) * (IMAGE_SIZE as f64).sqrt()
}

/// Draw the signal to recover
///
/// * `data` - where the signal comes from
/// * `n` - signal size
/// * `seed` - index of the test image for image data
/// * `data_dir` - root of the image collections
pub fn generate_truth<R: Rng + ?Sized>(
    data: &DataParams,
    n: usize,
    seed: u64,
    data_dir: &str,
    rng: &mut R,
) -> anyhow::Result<GroundTruth> {
    let source = match data {
        DataParams::Gaussian => {
            let x = Array1::from_shape_simple_fn(n, || rng.sample(StandardNormal));
            return Ok(GroundTruth { x, x_spec: None });
        }
        DataParams::Mnist => ImageSource::Mnist,
        DataParams::FashionMnist => ImageSource::FashionMnist,
        DataParams::Gan { kind, id } => {
            return Err(SetupError::not_implemented(format!("GAN data {} {}", kind, id)).into());
        }
        DataParams::Unsupported => {
            return Err(SetupError::not_implemented("data").into());
        }
    };

    if n != IMAGE_SIZE {
        return Err(SetupError::dimension_mismatch(source.dir_name(), IMAGE_SIZE, n).into());
    }

    let images = load_test_images(source, data_dir)?;
    if images.ncols() != IMAGE_SIZE {
        return Err(SetupError::dimension_mismatch("image pixels", IMAGE_SIZE, images.ncols()).into());
    }
    let index = seed as usize;
    if index >= images.nrows() {
        anyhow::bail!("image {} requested, only {} available", index, images.nrows());
    }

    let x = image_signal(images.row(index));
    let x_spec = spectral_signal(&x);
    Ok(GroundTruth {
        x,
        x_spec: Some(x_spec),
    })
}
