//! Pose error metrics.
//!
//! Rotations are (3,3) matrices, translations (3,) vectors, and reference
//! point clouds (N,3) arrays in the object frame.

use std::collections::HashSet;

use kiddo::{KdTree, SquaredEuclidean};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::geometry::se3::SE3;
use crate::geometry::utils::row_distances;

/// Rotation error in degrees: the geodesic angle between two rotations.
///
/// The cosine is clipped to `[-1, 1]` so round-off never produces `NaN`.
pub fn rotation_error(r_est: &ArrayView2<f64>, r_gt: &ArrayView2<f64>) -> f64 {
    let trace = r_est.t().dot(r_gt).diag().sum();
    let error_cos = ((trace - 1.0) / 2.0).clamp(-1.0, 1.0);
    error_cos.acos().to_degrees()
}

/// Translation error: Euclidean distance between the translations.
pub fn translation_error(t_est: &ArrayView1<f64>, t_gt: &ArrayView1<f64>) -> f64 {
    let diff = t_est - t_gt;
    diff.dot(&diff).sqrt()
}

fn transform(
    rotation: &ArrayView2<f64>,
    translation: &ArrayView1<f64>,
    points: &ArrayView2<f64>,
) -> Array2<f64> {
    SE3 {
        rotation: rotation.to_owned(),
        translation: translation.to_owned(),
    }
    .transform_from(points)
}

/// Average distance of model points (ADD) with index-matched correspondence.
pub fn add(
    r_est: &ArrayView2<f64>,
    t_est: &ArrayView1<f64>,
    r_gt: &ArrayView2<f64>,
    t_gt: &ArrayView1<f64>,
    points: &ArrayView2<f64>,
) -> f64 {
    let pts_est = transform(r_est, t_est, points);
    let pts_gt = transform(r_gt, t_gt, points);
    Array1::from(row_distances(&pts_est.view(), &pts_gt.view()))
        .mean()
        .unwrap_or(f64::NAN)
}

/// Average distance of model points for objects with indistinguishable views (ADI).
///
/// Every ground truth posed point is matched to its nearest estimate posed
/// point, so symmetric geometry is not penalized for an equivalent rotation.
pub fn adi(
    r_est: &ArrayView2<f64>,
    t_est: &ArrayView1<f64>,
    r_gt: &ArrayView2<f64>,
    t_gt: &ArrayView1<f64>,
    points: &ArrayView2<f64>,
) -> f64 {
    let pts_est = transform(r_est, t_est, points);
    let pts_gt = transform(r_gt, t_gt, points);

    // The tree caps how many items may share one position, and repeated
    // points never change a nearest neighbor distance.
    let mut seen = HashSet::with_capacity(pts_est.nrows());
    let mut tree: KdTree<f64, 3> = KdTree::new();
    for (i, p) in pts_est.rows().into_iter().enumerate() {
        // `+ 0.0` folds -0.0 into 0.0.
        let point = [p[0] + 0.0, p[1] + 0.0, p[2] + 0.0];
        if seen.insert(point.map(f64::to_bits)) {
            tree.add(&point, i as u64);
        }
    }
    let nn_dists: Array1<f64> = pts_gt
        .rows()
        .into_iter()
        .map(|p| {
            tree.nearest_one::<SquaredEuclidean>(&[p[0], p[1], p[2]])
                .distance
                .sqrt()
        })
        .collect();
    nn_dists.mean().unwrap_or(f64::NAN)
}
