//! # utils
//!
//! Geometric utilities.

use ndarray::{azip, Array2, ArrayView2};

/// Compute pairwise Euclidean distance between two (N,3) and (M,3) point sets.
/// Returns an (N,M) matrix.
pub fn cdist(x1: &ArrayView2<f64>, x2: &ArrayView2<f64>) -> Array2<f64> {
    let n = x1.shape()[0];
    let m = x2.shape()[0];
    let mut dists = Array2::<f64>::zeros([n, m]);
    azip!((mut d_i in dists.rows_mut(), x_i in x1.rows()) {
        azip!((d_ij in &mut d_i, x_j in x2.rows()) {
            let diff = &x_i - &x_j;
            *d_ij = diff.dot(&diff).sqrt();
        });
    });
    dists
}

/// Euclidean distance between corresponding rows of two (N,3) point sets.
pub fn row_distances(x1: &ArrayView2<f64>, x2: &ArrayView2<f64>) -> Vec<f64> {
    x1.rows()
        .into_iter()
        .zip(x2.rows())
        .map(|(a, b)| {
            let diff = &a - &b;
            diff.dot(&diff).sqrt()
        })
        .collect()
}
