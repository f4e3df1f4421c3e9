//! # SO(3)
//!
//! Special Orthogonal Group 3 (SO(3)).

use ndarray::{array, Array, ArrayView, Ix1, Ix2};
use rand_distr::{Distribution, StandardNormal};

/// Convert a quaternion in scalar-first format to a 3x3 rotation matrix.
///
/// The quaternion is renormalized first, so near-unit inputs produce an
/// orthonormal matrix.
///
/// Precondition: the quaternion must have non-zero norm.
pub fn quat_to_mat3(quat_wxyz: &ArrayView<f64, Ix1>) -> Array<f64, Ix2> {
    let norm = quat_wxyz.dot(quat_wxyz).sqrt();
    let w = quat_wxyz[0] / norm;
    let x = quat_wxyz[1] / norm;
    let y = quat_wxyz[2] / norm;
    let z = quat_wxyz[3] / norm;

    let e_00 = 1. - 2. * y.powi(2) - 2. * z.powi(2);
    let e_01 = 2. * x * y - 2. * z * w;
    let e_02 = 2. * x * z + 2. * y * w;

    let e_10 = 2. * x * y + 2. * z * w;
    let e_11 = 1. - 2. * x.powi(2) - 2. * z.powi(2);
    let e_12 = 2. * y * z - 2. * x * w;

    let e_20 = 2. * x * z - 2. * y * w;
    let e_21 = 2. * y * z + 2. * x * w;
    let e_22 = 1. - 2. * x.powi(2) - 2. * y.powi(2);

    array![
        [e_00, e_01, e_02],
        [e_10, e_11, e_12],
        [e_20, e_21, e_22],
    ]
}

/// Sample a random unit quaternion.
pub fn sample_random_quat_wxyz() -> Array<f64, Ix1> {
    let distribution = StandardNormal;
    let mut rng = rand::thread_rng();
    let quat_wxyz = Array::<f64, Ix1>::from_shape_fn(4, |_| distribution.sample(&mut rng));
    let norm = quat_wxyz.dot(&quat_wxyz).sqrt();
    let mut versor_wxyz = quat_wxyz / norm;

    // Canonicalize the quaternion.
    if versor_wxyz[0] < 0.0 {
        versor_wxyz *= -1.0;
    }
    versor_wxyz
}
