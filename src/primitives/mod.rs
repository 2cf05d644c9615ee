//! Core compute primitives (dense and sparse matrices).
//!
//! These types provide the foundation for the reducer and the clustering
//! algorithms.

mod matrix;
mod sparse;

pub use matrix::{euclidean, squared_euclidean, Matrix};
pub use sparse::CsrMatrix;
