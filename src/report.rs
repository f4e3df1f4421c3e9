//! # report
//!
//! Final statistics of an evaluation pass and their on-disk form.

use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::info;
use serde::Serialize;

use crate::constants::{CONFUSION_MATRIX_REPORT, SEGMENTATION_REPORT, SUMMARY_REPORT};
use crate::error::Result;
use crate::evaluation::pose::PoseCounters;
use crate::evaluation::segmentation::ConfusionHistogram;
use crate::structures::segmentation::PoseVariant;

/// Pose accuracy of one variant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VariantSummary {
    /// Scored pose output.
    pub variant: PoseVariant,
    /// Correct comparisons.
    pub correct: usize,
    /// `correct / num_instances`, `NaN` without instances.
    pub accuracy: f64,
}

/// Pose statistics of a pass.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PoseSummary {
    /// Ground truth pose instances considered.
    pub num_instances: usize,
    /// Per-variant accuracy, in reporting order.
    pub variants: Vec<VariantSummary>,
}

/// Dataset-level evaluation statistics.
///
/// `NaN` statistics serialize as `null` in `summary.json`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Class names, background first.
    pub class_names: Vec<String>,
    /// IoU per class, `NaN` for classes absent from both maps.
    pub per_class_iou: Vec<f64>,
    /// Mean IoU over non-`NaN` classes.
    pub mean_iou: f64,
    /// Overall pixel accuracy.
    pub overall_accuracy: f64,
    /// Mean per-class accuracy.
    pub mean_accuracy: f64,
    /// Frequency-weighted IoU.
    pub frequency_weighted_accuracy: f64,
    /// Confusion matrix, rows ground truth, columns prediction.
    pub confusion_matrix: Vec<Vec<u64>>,
    /// Pose statistics, present when pose regression is enabled.
    pub pose: Option<PoseSummary>,
}

impl EvaluationReport {
    /// Report of a confusion histogram and, optionally, pose counters over `variants`.
    pub fn new(
        class_names: Vec<String>,
        histogram: &ConfusionHistogram,
        pose: Option<(&PoseCounters, &[PoseVariant])>,
    ) -> Self {
        let pose = pose.map(|(counters, variants)| PoseSummary {
            num_instances: counters.num_instances,
            variants: variants
                .iter()
                .map(|variant| VariantSummary {
                    variant: *variant,
                    correct: counters.correct(*variant),
                    accuracy: counters.accuracy(*variant),
                })
                .collect(),
        });
        Self {
            class_names,
            per_class_iou: histogram.per_class_iou().to_vec(),
            mean_iou: histogram.mean_iou(),
            overall_accuracy: histogram.overall_accuracy(),
            mean_accuracy: histogram.mean_accuracy(),
            frequency_weighted_accuracy: histogram.frequency_weighted_accuracy(),
            confusion_matrix: histogram.counts().outer_iter().map(|row| row.to_vec()).collect(),
            pose,
        }
    }

    /// One IoU per line.
    pub fn segmentation_text(&self) -> String {
        self.per_class_iou
            .iter()
            .map(|iou| format!("{iou:.6}\n"))
            .collect()
    }

    /// One row per line, entries followed by a space.
    pub fn confusion_matrix_text(&self) -> String {
        self.confusion_matrix
            .iter()
            .map(|row| {
                let entries: String = row.iter().map(|count| format!("{:.6} ", *count as f64)).collect();
                entries + "\n"
            })
            .collect()
    }

    /// Write `segmentation.txt`, `confusion_matrix.txt` and `summary.json` into `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(SEGMENTATION_REPORT), self.segmentation_text())?;
        fs::write(dir.join(CONFUSION_MATRIX_REPORT), self.confusion_matrix_text())?;
        fs::write(dir.join(SUMMARY_REPORT), serde_json::to_string_pretty(self)?)?;
        info!("wrote evaluation reports to {}", dir.display());
        Ok(())
    }

    /// Log the summary statistics.
    pub fn log_summary(&self) {
        info!("overall accuracy {}", self.overall_accuracy);
        info!("mean accuracy {}", self.mean_accuracy);
        info!("per-class IU");
        for (name, iou) in self.class_names.iter().zip(&self.per_class_iou) {
            info!("{name} {iou}");
        }
        info!("mean IU {}", self.mean_iou);
        info!("fwavacc {}", self.frequency_weighted_accuracy);
        info!(
            "confusion matrix\n{}",
            self.confusion_matrix
                .iter()
                .map(|row| row.iter().join(" "))
                .join("\n")
        );
        if let Some(pose) = &self.pose {
            for summary in &pose.variants {
                info!(
                    "{} poses: correct {}, all {}, accuracy {}",
                    summary.variant, summary.correct, pose.num_instances, summary.accuracy
                );
            }
        }
    }
}
