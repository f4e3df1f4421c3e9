//! # evaluation
//!
//! Segmentation and pose evaluation.

/// Full-dataset evaluation.
pub mod eval;
/// Pose error metrics and correctness counting.
pub mod pose;
/// Confusion histogram and segmentation statistics.
pub mod segmentation;
