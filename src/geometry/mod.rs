//! # geometry
//!
//! Geometric operations for pose evaluation.

/// Special Euclidean Group 3.
pub mod se3;
/// Special Orthogonal Group 3.
pub mod so3;
/// Geometric utility functions.
pub mod utils;
