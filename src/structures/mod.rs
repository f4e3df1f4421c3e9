//! # structures
//!
//! Per-sample inputs consumed by the evaluator.

/// Ground truth metadata records.
pub mod metadata;
/// Segmentation and pose predictions.
pub mod segmentation;

use ndarray::Array2;

use crate::error::{EvalError, Result};

/// Convert a row-major nested vector into an `Array2`, rejecting ragged rows.
pub(crate) fn nested_to_array2<T: Clone>(rows: Vec<Vec<T>>) -> Result<Array2<T>> {
    let num_rows = rows.len();
    let num_cols = rows.first().map_or(0, Vec::len);
    if let Some(ragged) = rows.iter().find(|row| row.len() != num_cols) {
        return Err(EvalError::ShapeMismatch {
            expected: vec![num_rows, num_cols],
            found: vec![num_rows, ragged.len()],
        });
    }
    let flat: Vec<T> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((num_rows, num_cols), flat).map_err(|_| EvalError::ShapeMismatch {
        expected: vec![num_rows, num_cols],
        found: vec![num_rows * num_cols],
    })
}
