//! Ground truth poses and class ids of a single sample.

use std::path::Path;

use ndarray::{Array3, ArrayD, Axis, Ix3, IxDyn};
use serde::Deserialize;

use crate::error::{EvalError, Result};
use crate::geometry::se3::SE3;

use super::nested_to_array2;

/// Stack of ground truth `[R | t]` matrices with shape (3,4,N).
#[derive(Clone, Debug, PartialEq)]
pub struct PoseStack {
    poses: Array3<f64>,
}

impl PoseStack {
    /// Normalize a rank-2 (3,4) or rank-3 (3,4,N) array into a pose stack.
    ///
    /// A single (3,4) matrix becomes a stack with one trailing instance.
    /// This is the only place where the rank promotion happens.
    pub fn from_array(poses: ArrayD<f64>) -> Result<Self> {
        let shape = poses.shape().to_vec();
        let poses = match shape.as_slice() {
            [3, 4] => poses.insert_axis(Axis(2)),
            [3, 4, _] => poses,
            _ => {
                return Err(EvalError::ShapeMismatch {
                    expected: vec![3, 4, 1],
                    found: shape,
                })
            }
        };
        let poses = poses
            .into_dimensionality::<Ix3>()
            .map_err(|_| EvalError::ShapeMismatch {
                expected: vec![3, 4, 1],
                found: shape.clone(),
            })?;
        Ok(Self { poses })
    }

    /// Number of pose instances.
    pub fn len(&self) -> usize {
        self.poses.shape()[2]
    }

    /// Whether the stack holds no instances.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rigid transform of instance `j`.
    pub fn pose(&self, j: usize) -> Result<SE3> {
        SE3::from_rt_matrix(&self.poses.index_axis(Axis(2), j))
    }
}

/// Ground truth metadata of one sample.
#[derive(Clone, Debug, PartialEq)]
pub struct MetaData {
    /// Ground truth poses.
    pub poses: PoseStack,
    /// Class id of each pose instance; ids `<= 0` are background.
    pub cls_indexes: Vec<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoses {
    Single(Vec<Vec<f64>>),
    Stack(Vec<Vec<Vec<f64>>>),
}

#[derive(Deserialize)]
struct RawMetaData {
    poses: RawPoses,
    cls_indexes: Vec<i64>,
}

impl MetaData {
    /// Build a record, checking that every pose has a class id.
    pub fn new(poses: PoseStack, cls_indexes: Vec<i64>) -> Result<Self> {
        if poses.len() != cls_indexes.len() {
            return Err(EvalError::ShapeMismatch {
                expected: vec![poses.len()],
                found: vec![cls_indexes.len()],
            });
        }
        Ok(Self { poses, cls_indexes })
    }

    /// Read a JSON metadata record with `poses` as a (3,4) or (3,4,N) nested list.
    pub fn from_json(path: &Path) -> Result<Self> {
        let raw: RawMetaData = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let poses = match raw.poses {
            RawPoses::Single(rows) => nested_to_array2(rows)?.into_dyn(),
            RawPoses::Stack(planes) => {
                let num_rows = planes.len();
                let num_cols = planes.first().map_or(0, Vec::len);
                let num_instances = planes
                    .first()
                    .and_then(|plane| plane.first())
                    .map_or(0, Vec::len);
                let mut flat = Vec::with_capacity(num_rows * num_cols * num_instances);
                for plane in planes {
                    let plane = nested_to_array2(plane)?;
                    if plane.dim() != (num_cols, num_instances) {
                        return Err(EvalError::ShapeMismatch {
                            expected: vec![num_cols, num_instances],
                            found: plane.shape().to_vec(),
                        });
                    }
                    flat.extend(plane.iter().copied());
                }
                ArrayD::from_shape_vec(IxDyn(&[num_rows, num_cols, num_instances]), flat)
                    .map_err(|_| EvalError::ShapeMismatch {
                        expected: vec![num_rows, num_cols, num_instances],
                        found: vec![],
                    })?
            }
        };
        Self::new(PoseStack::from_array(poses)?, raw.cls_indexes)
    }

    /// Map class ids into the per-dataset label space: `target` becomes 1, everything else 0.
    pub fn remap_classes(&mut self, target: usize) {
        for cls in self.cls_indexes.iter_mut() {
            *cls = i64::from(*cls == target as i64);
        }
    }
}
