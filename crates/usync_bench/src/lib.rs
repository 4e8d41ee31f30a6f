//! Shared setup for the uSync benchmarks.

pub mod utils;
