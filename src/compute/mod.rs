//! Numeric kernels executed by workers
//!
//! Pure functions consumed by the worker dispatch loop; none of them touch
//! the wire protocol or the coordinator state.

pub mod anagrams;
pub mod matrix;
pub mod primes;

pub use matrix::Matrix;
