use ndarray::Array1;

/// `mean((x - y)^2)`
pub fn mean_squared_error(x: &Array1<f64>, y: &Array1<f64>) -> anyhow::Result<f64> {
    if x.len() != y.len() {
        anyhow::bail!("length mismatch: {} vs {}", x.len(), y.len());
    }
    if x.is_empty() {
        anyhow::bail!("empty vectors");
    }
    Ok((x - y).mapv(|d| d * d).sum() / x.len() as f64)
}

/// `min(mse(x, y), mse(x, -y))` for problems that cannot tell a signal
/// from its negation
pub fn sign_invariant_mse(x: &Array1<f64>, y: &Array1<f64>) -> anyhow::Result<f64> {
    let plus = mean_squared_error(x, y)?;
    let minus = mean_squared_error(x, &(-y))?;
    Ok(plus.min(minus))
}

/// `<x, y> / n`
pub fn overlap(x: &Array1<f64>, y: &Array1<f64>) -> anyhow::Result<f64> {
    if x.len() != y.len() {
        anyhow::bail!("length mismatch: {} vs {}", x.len(), y.len());
    }
    if x.is_empty() {
        anyhow::bail!("empty vectors");
    }
    Ok(x.dot(y) / x.len() as f64)
}
