//! Analytic-derivative simplex noise kernel.
//!
//! The kernel is a pure function of its coordinates: no state, no heap
//! allocation, and lookup tables that are safe to share across threads.

mod simplex;
pub mod tables;

pub use simplex::{noise2, noise3, noise4, simplex01, simplex11};
