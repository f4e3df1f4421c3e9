//! Segmentation and pose predictions of a single sample.

use std::path::Path;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter};

use crate::error::{EvalError, Result};
use crate::geometry::se3::SE3;
use crate::palette::LabelMap;

use super::nested_to_array2;

/// Which pose output of a region is being scored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumCount, EnumIter, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseVariant {
    /// Pose regressed by the network.
    #[strum(serialize = "raw")]
    Raw,
    /// Pose with refined translation.
    #[strum(serialize = "refined")]
    Refined,
    /// Pose refined by ICP against the depth map.
    #[strum(serialize = "icp")]
    Icp,
}

/// Per-sample model output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SegmentationResult {
    /// (H,W) predicted class indices.
    pub labels: LabelMap,
    /// (N,k) region descriptors; one row per predicted region.
    pub rois: Option<Array2<f64>>,
    /// (N,7) raw poses `[qw, qx, qy, qz, tx, ty, tz]`.
    pub poses: Option<Array2<f64>>,
    /// (N,7) translation refined poses.
    pub poses_refined: Option<Array2<f64>>,
    /// (N,7) ICP refined poses.
    pub poses_icp: Option<Array2<f64>>,
}

#[derive(Deserialize)]
struct RawSegmentationResult {
    labels: Vec<Vec<usize>>,
    #[serde(default)]
    rois: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    poses: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    poses_refined: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    poses_icp: Option<Vec<Vec<f64>>>,
}

impl SegmentationResult {
    /// Segmentation-only result.
    pub fn from_labels(labels: LabelMap) -> Self {
        Self {
            labels,
            ..Default::default()
        }
    }

    /// Read a JSON result holding `labels` and the optional region outputs.
    pub fn from_json(path: &Path) -> Result<Self> {
        let raw: RawSegmentationResult = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let optional = |rows: Option<Vec<Vec<f64>>>| rows.map(nested_to_array2).transpose();
        Ok(Self {
            labels: nested_to_array2(raw.labels)?,
            rois: optional(raw.rois)?,
            poses: optional(raw.poses)?,
            poses_refined: optional(raw.poses_refined)?,
            poses_icp: optional(raw.poses_icp)?,
        })
    }

    /// Whether the result carries regions with raw poses.
    pub fn has_poses(&self) -> bool {
        self.poses.is_some()
    }

    /// Number of predicted regions. Falls back to the raw pose rows without `rois`.
    pub fn num_regions(&self) -> usize {
        self.rois
            .as_ref()
            .or(self.poses.as_ref())
            .map_or(0, Array2::nrows)
    }

    /// Pose array of a variant, if present.
    pub fn pose_array(&self, variant: PoseVariant) -> Option<&Array2<f64>> {
        match variant {
            PoseVariant::Raw => self.poses.as_ref(),
            PoseVariant::Refined => self.poses_refined.as_ref(),
            PoseVariant::Icp => self.poses_icp.as_ref(),
        }
    }

    /// Rigid transform of `region` for `variant`.
    ///
    /// Missing variant arrays or too few rows are contract violations.
    pub fn region_pose(&self, variant: PoseVariant, region: usize) -> Result<SE3> {
        let num_regions = self.num_regions();
        let poses = self
            .pose_array(variant)
            .filter(|poses| poses.nrows() >= num_regions && region < poses.nrows())
            .ok_or_else(|| EvalError::ShapeMismatch {
                expected: vec![num_regions, 7],
                found: self
                    .pose_array(variant)
                    .map_or(vec![0, 7], |poses| poses.shape().to_vec()),
            })?;
        let pose: ArrayView1<f64> = poses.row(region);
        SE3::from_pose_vector(&pose)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ndarray::array;
    use strum::IntoEnumIterator;

    use super::{PoseVariant, SegmentationResult};
    use crate::error::EvalError;
    use crate::geometry::se3::SE3;

    #[test]
    fn test_variant_names() {
        let names: Vec<_> = PoseVariant::iter().map(|v| v.to_string()).collect();
        assert_eq!(names, vec!["raw", "refined", "icp"]);
    }

    #[test]
    fn test_labels_only() {
        let result = SegmentationResult::from_labels(array![[0, 1]]);
        assert!(!result.has_poses());
        assert_eq!(result.num_regions(), 0);
    }

    #[test]
    fn test_read_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0000.json");
        fs::write(
            &path,
            r#"{"labels": [[0, 1], [1, 0]],
                "rois": [[0, 1, 0, 0, 2, 2, 0.9]],
                "poses": [[1, 0, 0, 0, 0, 0, 0.5]]}"#,
        )
        .unwrap();
        let result = SegmentationResult::from_json(&path).unwrap();
        assert_eq!(result.labels, array![[0, 1], [1, 0]]);
        assert_eq!(result.num_regions(), 1);
        let pose = result.region_pose(PoseVariant::Raw, 0).unwrap();
        assert_eq!(pose.rotation, SE3::identity().rotation);
        assert_eq!(pose.translation.to_vec(), vec![0.0, 0.0, 0.5]);
        assert!(result.poses_icp.is_none());
    }

    #[test]
    fn test_missing_variant_is_contract_violation() {
        let result = SegmentationResult {
            labels: array![[0]],
            poses: Some(array![[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]]),
            ..Default::default()
        };
        let err = result.region_pose(PoseVariant::Icp, 0).unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_malformed_pose_vector() {
        let result = SegmentationResult {
            labels: array![[0]],
            poses: Some(array![[1.0, 0.0, 0.0, 0.0, 0.0]]),
            ..Default::default()
        };
        let err = result.region_pose(PoseVariant::Raw, 0).unwrap_err();
        assert!(matches!(err, EvalError::InvalidPose { len: 5 }));
    }
}
