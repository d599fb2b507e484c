use approx::assert_abs_diff_eq;
use matrix_util::ndarray_util::*;
use matrix_util::traits::{ConvertMatOps, MatOps, SampleOps};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn ndarray_row_normalization() {
    let mut xx = Array2::<f64>::runif_with(10, 100, &mut StdRng::seed_from_u64(9));
    xx.centre_rows_inplace();
    xx.normalize_rows_inplace();

    for x_i in xx.rows() {
        assert_abs_diff_eq!(x_i.sum(), 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(x_i.dot(&x_i).sqrt(), 1.0, epsilon = 1e-10);
    }
}

#[test]
fn zero_rows_are_left_alone() {
    let mut xx = Array2::<f64>::zeros((3, 4));
    xx.normalize_rows_inplace();
    assert!(xx.iter().all(|&x| x == 0.0));
}

#[test]
fn seeded_sampling_is_reproducible() {
    let a = Array2::<f64>::rnorm_with(7, 5, &mut StdRng::seed_from_u64(42));
    let b = Array2::<f64>::rnorm_with(7, 5, &mut StdRng::seed_from_u64(42));
    assert_eq!(a, b);

    let u = Array2::<f64>::runif_with(50, 50, &mut StdRng::seed_from_u64(1));
    assert!(u.iter().all(|&x| (0.0..1.0).contains(&x)));
}

#[test]
fn dmatrix_round_trip_keeps_layout() {
    let xx = Array2::from_shape_fn((3, 5), |(i, j)| (i * 10 + j) as f64);
    let dm = xx.to_other();
    assert_eq!(dm.nrows(), 3);
    assert_eq!(dm.ncols(), 5);
    assert_eq!(dm[(2, 4)], 24.0);
    assert_eq!(Array2::from_other(&dm), xx);
}
