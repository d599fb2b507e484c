//! Deterministic channels `x = f(z)` linking two variables of a chain.

pub mod bias;
pub mod linear;
pub mod piecewise;
pub mod reshape;

pub use bias::BiasChannel;
pub use linear::LinearChannel;
pub use piecewise::{Piece, PiecewiseLinearChannel};
pub use reshape::ReshapeChannel;

use crate::message::{Message, Moments};
use ndarray::Array1;

/// A factor `δ(x - f(z))` between an input variable `z` and an output
/// variable `x`.
pub trait Channel: Send + Sync + std::fmt::Debug {
    /// Short label shown when the graph is printed
    fn name(&self) -> &str;

    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    /// Moment-matched posteriors of `(z, x)` given the messages that
    /// `z` and `x` currently send to this factor
    ///
    /// * `to_input` - message from `z` (everything upstream of the factor)
    /// * `to_output` - message from `x` (everything downstream)
    fn posterior(&self, to_input: &Message, to_output: &Message) -> (Moments, Moments);

    /// Push a sample of `z` through the channel
    fn sample(&self, z: &Array1<f64>) -> Array1<f64>;
}
