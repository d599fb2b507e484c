pub mod common; // shared constants and re-exports
pub mod datasets; // IDX image collections
pub mod error; // typed setup errors
pub mod experiment; // model assembly, EP driver and evaluation
pub mod params; // experiment configuration
pub mod plot; // PNG output
pub mod prior; // structured priors on the signal
pub mod report; // output file names and run summaries
pub mod sample; // ground truth, masks and observations
pub mod weights; // pretrained decoder weights (HDF5)
