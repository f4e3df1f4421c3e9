//! # SE(3)
//!
//! Special Euclidean Group 3.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{EvalError, Result};

use super::so3::quat_to_mat3;

/// Special Euclidean Group 3.
/// Rigid transformation parameterized by a rotation and translation in $R^3$.
#[derive(Clone, Debug, PartialEq)]
pub struct SE3 {
    /// (3,3) Orthonormal rotation matrix.
    pub rotation: Array2<f64>,
    /// (3,) Translation vector.
    pub translation: Array1<f64>,
}

impl SE3 {
    /// Identity transformation.
    pub fn identity() -> Self {
        Self {
            rotation: Array2::eye(3),
            translation: Array1::zeros(3),
        }
    }

    /// Build a transformation from a `[qw, qx, qy, qz, tx, ty, tz]` pose vector.
    ///
    /// The quaternion is renormalized before conversion and must have
    /// non-zero norm.
    pub fn from_pose_vector(pose: &ArrayView1<f64>) -> Result<Self> {
        if pose.len() != 7 {
            return Err(EvalError::InvalidPose { len: pose.len() });
        }
        Ok(Self {
            rotation: quat_to_mat3(&pose.slice(s![..4])),
            translation: pose.slice(s![4..7]).to_owned(),
        })
    }

    /// Build a transformation from a (3,4) `[R | t]` matrix.
    pub fn from_rt_matrix(rt: &ArrayView2<f64>) -> Result<Self> {
        if rt.shape() != [3, 4] {
            return Err(EvalError::ShapeMismatch {
                expected: vec![3, 4],
                found: rt.shape().to_vec(),
            });
        }
        Ok(Self {
            rotation: rt.slice(s![.., ..3]).to_owned(),
            translation: rt.slice(s![.., 3]).to_owned(),
        })
    }

    /// Get the (3,4) `[R | t]` matrix associated with the rigid transformation.
    pub fn rt_matrix(&self) -> Array2<f64> {
        let mut rt = Array2::zeros((3, 4));
        rt.slice_mut(s![.., ..3]).assign(&self.rotation);
        rt.slice_mut(s![.., 3]).assign(&self.translation);
        rt
    }

    /// Transform the (N,3) point cloud from its reference frame to the SE(3) destination.
    pub fn transform_from(&self, point_cloud: &ArrayView2<f64>) -> Array2<f64> {
        point_cloud.dot(&self.rotation.t()) + &self.translation
    }
}
