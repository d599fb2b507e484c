pub mod common_io;
pub mod ndarray_util;
pub mod traits;
