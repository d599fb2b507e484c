pub use log::{debug, info, warn};
pub use ndarray::{Array1, Array2, Axis};

/// Side length of the square images of the supported collections
pub const IMAGE_SIDE: usize = 28;

/// Number of pixels of an image
pub const IMAGE_SIZE: usize = IMAGE_SIDE * IMAGE_SIDE;

/// Variable holding the signal to recover
pub const SIGNAL_ID: &str = "x";

/// Observed variable of the inpainting model
pub const MASKED_ID: &str = "z";
