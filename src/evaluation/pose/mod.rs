//! # pose
//!
//! Pose correctness scoring against ground truth instances.

/// Pose error metrics.
pub mod metrics;

use ndarray::ArrayView2;
use serde::Serialize;
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::Display;

use crate::geometry::se3::SE3;
use crate::structures::segmentation::PoseVariant;

use self::metrics::{add, adi, rotation_error, translation_error};

/// Point cloud discrepancy metric of a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum PoseMetric {
    /// Index-matched average distance, for asymmetric objects.
    #[strum(serialize = "ADD")]
    Add,
    /// Nearest-neighbor average distance, for symmetric objects.
    #[strum(serialize = "ADI")]
    Adi,
}

impl PoseMetric {
    /// Discrepancy between the estimated and ground truth poses of `points`.
    pub fn compute(&self, est: &SE3, gt: &SE3, points: &ArrayView2<f64>) -> f64 {
        let metric = match self {
            PoseMetric::Add => add,
            PoseMetric::Adi => adi,
        };
        metric(
            &est.rotation.view(),
            &est.translation.view(),
            &gt.rotation.view(),
            &gt.translation.view(),
            points,
        )
    }
}

/// Errors of one estimated pose against one ground truth pose.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PoseErrors {
    /// Geodesic rotation error in degrees.
    pub rotation_deg: f64,
    /// Translation error.
    pub translation: f64,
    /// ADD or ADI discrepancy.
    pub discrepancy: f64,
}

impl PoseErrors {
    /// Score `est` against `gt`.
    pub fn compute(est: &SE3, gt: &SE3, points: &ArrayView2<f64>, metric: PoseMetric) -> Self {
        Self {
            rotation_deg: rotation_error(&est.rotation.view(), &gt.rotation.view()),
            translation: translation_error(&est.translation.view(), &gt.translation.view()),
            discrepancy: metric.compute(est, gt, points),
        }
    }

    /// A pose is correct when its discrepancy is strictly below `threshold`.
    pub fn is_correct(&self, threshold: f64) -> bool {
        self.discrepancy < threshold
    }
}

/// Number of pose variants.
pub const NUM_POSE_VARIANTS: usize = <PoseVariant as EnumCount>::COUNT;

/// Running pose correctness counters over a dataset pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoseCounters {
    /// Ground truth pose instances considered.
    pub num_instances: usize,
    correct: [usize; NUM_POSE_VARIANTS],
}

impl PoseCounters {
    /// Count one more ground truth instance.
    pub fn add_instance(&mut self) {
        self.num_instances += 1;
    }

    /// Count one correct comparison for `variant`.
    pub fn add_correct(&mut self, variant: PoseVariant) {
        self.correct[variant as usize] += 1;
    }

    /// Correct comparisons of `variant`.
    pub fn correct(&self, variant: PoseVariant) -> usize {
        self.correct[variant as usize]
    }

    /// `correct / num_instances`, or `NaN` when no instance was considered.
    pub fn accuracy(&self, variant: PoseVariant) -> f64 {
        if self.num_instances == 0 {
            f64::NAN
        } else {
            self.correct(variant) as f64 / self.num_instances as f64
        }
    }

    /// Variants in reporting order.
    pub fn variants() -> impl Iterator<Item = PoseVariant> {
        PoseVariant::iter()
    }
}
