//! Microbenchmark kernels
//!
//! Each module holds the kernels for one family of measurements together
//! with the function that registers them as a benchmark group. The bench
//! targets under `benches/` only wire groups to `benchgate::run()`.

pub mod easing;
pub mod quat;
pub mod system;
pub mod transform;
pub mod util;
