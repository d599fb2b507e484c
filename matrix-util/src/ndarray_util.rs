pub use ndarray::prelude::*;
pub use rand::Rng;
pub use rand_distr::StandardNormal;

use crate::traits::*;
use nalgebra::DMatrix;
use num_traits::{Float, FromPrimitive};

impl<T> SampleOps for ndarray::Array2<T>
where
    T: Float + FromPrimitive,
{
    type Mat = Self;
    type Scalar = T;

    fn runif_with<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        Array2::from_shape_simple_fn((dd, nn), || {
            let x: f64 = rng.random();
            T::from_f64(x).unwrap_or_else(T::zero)
        })
    }

    fn rnorm_with<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat {
        Array2::from_shape_simple_fn((dd, nn), || {
            let x: f64 = rng.sample(StandardNormal);
            T::from_f64(x).unwrap_or_else(T::zero)
        })
    }
}

impl<T> MatOps for ndarray::Array2<T>
where
    T: Float + FromPrimitive,
{
    type Mat = Self;
    type Scalar = T;

    fn centre_rows_inplace(&mut self) {
        let ncol = self.ncols();
        if ncol == 0 {
            return;
        }
        let denom = T::from_usize(ncol).unwrap_or_else(T::one);
        for mut x_i in self.rows_mut() {
            let mu = x_i.sum() / denom;
            x_i.mapv_inplace(|x| x - mu);
        }
    }

    fn normalize_rows_inplace(&mut self) {
        for mut x_i in self.rows_mut() {
            let denom = x_i.mapv(|x| x * x).sum().sqrt();
            if denom > T::zero() {
                x_i.mapv_inplace(|x| x / denom);
            }
        }
    }
}

impl<T> ConvertMatOps for ndarray::Array2<T>
where
    T: nalgebra::Scalar + Copy,
{
    type Other = DMatrix<T>;

    fn to_other(&self) -> Self::Other {
        DMatrix::from_fn(self.nrows(), self.ncols(), |i, j| self[(i, j)])
    }

    fn from_other(other: &Self::Other) -> Self {
        Array2::from_shape_fn((other.nrows(), other.ncols()), |(i, j)| other[(i, j)])
    }
}
