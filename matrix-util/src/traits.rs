use rand::Rng;

/// Normalize or centre rows
pub trait MatOps {
    type Mat;
    type Scalar;

    /// `X[i,] <- X[i,] - mean(X[i,])`
    fn centre_rows_inplace(&mut self);

    /// `X[i,] <- X[i,] / norm(X[i,])`, rows with zero norm are left as they are
    fn normalize_rows_inplace(&mut self);
}

/// Operations to sample random matrices, only works for
/// `nalgebra::DMatrix` and `ndarray::Array2`
pub trait SampleOps {
    type Mat;
    type Scalar;

    /// Sample a matrix from a uniform distribution `U(0,1)`
    fn runif_with<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;

    /// Sample a matrix from a normal distribution `N(0,1)`
    fn rnorm_with<R: Rng + ?Sized>(dd: usize, nn: usize, rng: &mut R) -> Self::Mat;
}

/// Convert between `ndarray` and `nalgebra` matrices
pub trait ConvertMatOps {
    type Other;

    fn to_other(&self) -> Self::Other;
    fn from_other(other: &Self::Other) -> Self;
}
