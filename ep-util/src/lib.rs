//! Expectation propagation on chain-structured factor graphs.
//!
//! A model is a Gaussian prior followed by deterministic channels
//! (linear maps, biases, piecewise linear activations, reshapes) and a
//! Gaussian likelihood on the last variable:
//!
//! ```text
//! z_0 ~ N(0, I)
//! z_k = f_k(z_{k-1})
//! y   ~ N(z_K, Δ I)
//! ```
//!
//! All messages are isotropic Gaussians; non-Gaussian channels are
//! projected back by moment matching.

pub mod callback;
pub mod channels;
pub mod ensemble;
pub mod ep;
pub mod init;
pub mod likelihood;
pub mod message;
pub mod metrics;
pub mod model;
pub mod prior;
pub mod truncated;

pub use callback::{Callback, EarlyStopping, JoinCallback, NoCallback};
pub use channels::{
    BiasChannel, Channel, LinearChannel, Piece, PiecewiseLinearChannel, ReshapeChannel,
};
pub use ep::{
    Direction, ExpectationPropagation, IterateOptions, IterationSummary, VariableDamping,
    VariableData,
};
pub use init::Initializer;
pub use likelihood::GaussianLikelihood;
pub use model::{ChainModel, PriorChain};
pub use prior::GaussianPrior;
