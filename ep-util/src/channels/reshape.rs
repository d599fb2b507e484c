use super::Channel;
use crate::message::{Message, Moments};
use ndarray::Array1;

/// `x = reshape(z)`. Values are stored flat, so the channel only
/// checks that both shapes hold the same number of entries and then
/// behaves as an identity.
#[derive(Debug, Clone)]
pub struct ReshapeChannel {
    prev_shape: Vec<usize>,
    next_shape: Vec<usize>,
}

impl ReshapeChannel {
    pub fn new(prev_shape: &[usize], next_shape: &[usize]) -> anyhow::Result<Self> {
        let prev: usize = prev_shape.iter().product();
        let next: usize = next_shape.iter().product();
        if prev != next {
            anyhow::bail!(
                "cannot reshape {:?} ({} entries) into {:?} ({} entries)",
                prev_shape,
                prev,
                next_shape,
                next
            );
        }
        Ok(Self {
            prev_shape: prev_shape.to_vec(),
            next_shape: next_shape.to_vec(),
        })
    }
}

impl Channel for ReshapeChannel {
    fn name(&self) -> &str {
        "reshape"
    }

    fn input_size(&self) -> usize {
        self.prev_shape.iter().product()
    }

    fn output_size(&self) -> usize {
        self.next_shape.iter().product()
    }

    fn posterior(&self, to_input: &Message, to_output: &Message) -> (Moments, Moments) {
        let post = to_input.product(to_output).moments();
        (post.clone(), post)
    }

    fn sample(&self, z: &Array1<f64>) -> Array1<f64> {
        z.clone()
    }
}
