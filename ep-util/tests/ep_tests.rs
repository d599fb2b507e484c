use approx::assert_abs_diff_eq;
use ep_util::ensemble::gaussian_ensemble;
use ep_util::metrics::mean_squared_error;
use ep_util::*;
use matrix_util::traits::ConvertMatOps;
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn damp_all(ids: &[&str], coef: f64) -> Vec<VariableDamping> {
    ids.iter()
        .flat_map(|id| {
            [
                VariableDamping::new(id, Direction::Fwd, coef),
                VariableDamping::new(id, Direction::Bwd, coef),
            ]
        })
        .collect()
}

#[test]
fn noiseless_gaussian_denoising_is_exact() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(11);
    let prior = GaussianPrior::new(1000);
    let x = prior.sample(&mut rng);

    let chain = PriorChain::new(prior, "x");
    let model = ChainModel::new(chain, GaussianLikelihood::new(x.clone(), 0.0)?)?;

    let mut ep = ExpectationPropagation::new(&model);
    let mut callback = EarlyStopping::default();
    let summary = ep.iterate(
        &IterateOptions {
            variables_damping: damp_all(&["x"], 0.5),
            ..Default::default()
        },
        &mut callback,
        &Initializer::default(),
        &mut rng,
    )?;

    assert!(summary.n_iter <= 3);
    let data = ep.get_variables_data(&["x"])?;
    let mse = mean_squared_error(&x, &data["x"].r)?;
    assert!(mse < 1e-15, "mse = {}", mse);
    assert!(data["x"].v < 1e-10);
    Ok(())
}

#[test]
fn linear_gaussian_chain_matches_exact_posterior() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(5);
    let (n, m, delta) = (30, 12, 0.3);
    let w = gaussian_ensemble(n, m, &mut rng);

    let chain = PriorChain::new(GaussianPrior::new(m), "z")
        .then(LinearChannel::new(w.clone())?, "x")?;
    let truth = chain.sample(&mut rng);
    let y = GaussianLikelihood::new(Array1::zeros(n), delta)?.sample(&truth["x"], &mut rng);
    let model = ChainModel::new(chain, GaussianLikelihood::new(y.clone(), delta)?)?;

    let mut ep = ExpectationPropagation::new(&model);
    ep.iterate(
        &IterateOptions::default(),
        &mut EarlyStopping::new(1e-12, 0.0),
        &Initializer::default(),
        &mut rng,
    )?;
    let data = ep.get_variables_data(&["z", "x"])?;

    // (I + W'W / Δ)^{-1} W'y / Δ
    let wd: DMatrix<f64> = w.to_other();
    let prec = DMatrix::<f64>::identity(m, m) + wd.transpose() * &wd / delta;
    let sigma = prec.try_inverse().unwrap();
    let rz = &sigma * (wd.transpose() * DVector::from_iterator(n, y.iter().cloned())) / delta;

    for i in 0..m {
        assert_abs_diff_eq!(data["z"].r[i], rz[i], epsilon = 1e-8);
    }
    assert_abs_diff_eq!(data["z"].v, sigma.trace() / m as f64, epsilon = 1e-8);

    let rx = &wd * &rz;
    for i in 0..n {
        assert_abs_diff_eq!(data["x"].r[i], rx[i], epsilon = 1e-8);
    }
    Ok(())
}

#[test]
fn relu_glm_denoising_beats_the_observation_free_guess() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(17);
    let (n, d) = (200, 100);
    let w = gaussian_ensemble(n, d, &mut rng);

    let chain = PriorChain::new(GaussianPrior::new(d), "z0")
        .then(LinearChannel::new(w)?, "Wz0")?
        .then(PiecewiseLinearChannel::relu(n), "s")?
        .then(ReshapeChannel::new(&[n], &[n])?, "x")?;

    let truth = chain.sample(&mut rng);
    let x = truth["x"].clone();
    let delta = 0.01;
    let y = GaussianLikelihood::new(Array1::zeros(n), delta)?.sample(&x, &mut rng);
    let model = ChainModel::new(chain, GaussianLikelihood::new(y, delta)?)?;

    let mut ep = ExpectationPropagation::new(&model);
    let summary = ep.iterate(
        &IterateOptions {
            max_iter: 100,
            variables_damping: damp_all(&["z0", "Wz0", "s", "x"], 0.5),
            ..Default::default()
        },
        &mut EarlyStopping::default(),
        &Initializer::default(),
        &mut rng,
    )?;
    assert!(summary.n_iter >= 1);

    let data = ep.get_variables_data(&["x"])?;
    let mse = mean_squared_error(&x, &data["x"].r)?;
    let baseline = x.mapv(|v| v * v).mean().unwrap();
    assert!(data["x"].r.iter().all(|v| v.is_finite()));
    assert!(mse < 0.5 * baseline, "mse {} vs baseline {}", mse, baseline);
    Ok(())
}

#[test]
fn unknown_damping_variable_is_an_error() -> anyhow::Result<()> {
    let chain = PriorChain::new(GaussianPrior::new(4), "x");
    let model = ChainModel::new(chain, GaussianLikelihood::new(Array1::zeros(4), 1.0)?)?;
    let mut ep = ExpectationPropagation::new(&model);
    let res = ep.iterate(
        &IterateOptions {
            variables_damping: damp_all(&["nope"], 0.5),
            ..Default::default()
        },
        &mut NoCallback,
        &Initializer::default(),
        &mut StdRng::seed_from_u64(0),
    );
    assert!(res.is_err());
    Ok(())
}

#[test]
fn join_callback_runs_every_member() -> anyhow::Result<()> {
    let chain = PriorChain::new(GaussianPrior::new(4), "x");
    let model = ChainModel::new(chain, GaussianLikelihood::new(Array1::ones(4), 1.0)?)?;
    let mut ep = ExpectationPropagation::new(&model);

    let mut callback = JoinCallback::new(vec![
        Box::new(NoCallback),
        Box::new(EarlyStopping::default()),
    ]);
    let summary = ep.iterate(
        &IterateOptions {
            max_iter: 50,
            ..Default::default()
        },
        &mut callback,
        &Initializer::Constant { a: 0.0, b: 0.0 },
        &mut StdRng::seed_from_u64(0),
    )?;
    assert!(summary.stopped_early);

    // N(0,1) prior, N(1,1) likelihood
    let data = ep.get_variables_data(&["x"])?;
    assert_abs_diff_eq!(data["x"].r[0], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(data["x"].v, 0.5, epsilon = 1e-12);
    Ok(())
}

#[test]
fn collapsed_variance_stops_even_with_zero_thresholds() -> anyhow::Result<()> {
    // a noiseless likelihood pins the marginal to the largest precision
    let chain = PriorChain::new(GaussianPrior::new(5), "x");
    let model = ChainModel::new(chain, GaussianLikelihood::new(Array1::ones(5), 0.0)?)?;
    let mut ep = ExpectationPropagation::new(&model);
    let summary = ep.iterate(
        &IterateOptions {
            max_iter: 50,
            ..Default::default()
        },
        &mut EarlyStopping::new(0.0, 0.0),
        &Initializer::default(),
        &mut StdRng::seed_from_u64(0),
    )?;
    assert_eq!(summary.n_iter, 1);
    assert!(summary.stopped_early);
    assert!(!summary.restored);
    Ok(())
}
