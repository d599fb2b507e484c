use super::Channel;
use crate::message::{Message, Moments};
use ndarray::Array1;

/// `x = z + bias`
#[derive(Debug, Clone)]
pub struct BiasChannel {
    bias: Array1<f64>,
}

impl BiasChannel {
    pub fn new(bias: Array1<f64>) -> Self {
        Self { bias }
    }
}

impl Channel for BiasChannel {
    fn name(&self) -> &str {
        "bias"
    }

    fn input_size(&self) -> usize {
        self.bias.len()
    }

    fn output_size(&self) -> usize {
        self.bias.len()
    }

    fn posterior(&self, to_input: &Message, to_output: &Message) -> (Moments, Moments) {
        // exp(-ax (z + β)^2 / 2 + bx (z + β)) in terms of z
        let a = to_input.precision() + to_output.precision();
        let b = &to_input.b + &to_output.b - &self.bias * to_output.precision();
        let rz = b / a;
        let rx = &rz + &self.bias;
        let v = 1.0 / a;
        (Moments { r: rz, v }, Moments { r: rx, v })
    }

    fn sample(&self, z: &Array1<f64>) -> Array1<f64> {
        z + &self.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn shifts_the_posterior_mean() {
        let ch = BiasChannel::new(array![1.0, -1.0]);
        let to_z = Message::new(1.0, array![0.0, 0.0]);
        let to_x = Message::new(1.0, array![2.0, 2.0]);
        let (z, x) = ch.posterior(&to_z, &to_x);
        // z ~ N(0,1), z + β ~ N(2,1) => z | . ~ N((2 - β)/2, 1/2)
        assert_abs_diff_eq!(z.r[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z.r[1], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x.r[0], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x.r[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z.v, 0.5, epsilon = 1e-12);
        assert_eq!(ch.sample(&array![0.0, 0.0]), array![1.0, -1.0]);
    }
}
