//! # segmentation
//!
//! Dataset-wide confusion histogram and the segmentation statistics derived from it.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{EvalError, Result};

/// Histogram of (ground truth, predicted) label pairs for one image.
///
/// Ground truth labels outside `[0, num_classes)` are ignore labels and are
/// skipped. Predicted labels outside that range are a contract violation.
pub fn fast_hist(
    gt: &ArrayView2<usize>,
    pred: &ArrayView2<usize>,
    num_classes: usize,
) -> Result<Array2<u64>> {
    if gt.shape() != pred.shape() {
        return Err(EvalError::ShapeMismatch {
            expected: gt.shape().to_vec(),
            found: pred.shape().to_vec(),
        });
    }
    let mut bins = vec![0u64; num_classes * num_classes];
    for (&g, &p) in gt.iter().zip(pred.iter()) {
        if g >= num_classes {
            continue;
        }
        if p >= num_classes {
            return Err(EvalError::LabelOutOfRange {
                label: p,
                num_classes,
            });
        }
        bins[num_classes * g + p] += 1;
    }
    Array2::from_shape_vec((num_classes, num_classes), bins).map_err(|_| {
        EvalError::ShapeMismatch {
            expected: vec![num_classes, num_classes],
            found: vec![],
        }
    })
}

/// Mean over the non-`NaN` entries; `NaN` when there are none.
pub fn nanmean(values: &ArrayView1<f64>) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Running (num_classes, num_classes) confusion histogram.
/// Rows are ground truth labels, columns predicted labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionHistogram {
    hist: Array2<u64>,
}

impl ConfusionHistogram {
    /// Empty histogram over `num_classes` labels.
    pub fn new(num_classes: usize) -> Self {
        Self {
            hist: Array2::zeros((num_classes, num_classes)),
        }
    }

    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.hist.nrows()
    }

    /// Raw counts.
    pub fn counts(&self) -> &Array2<u64> {
        &self.hist
    }

    /// Clear all counts.
    pub fn reset(&mut self) {
        self.hist.fill(0);
    }

    /// Fold the label pairs of one image into the histogram.
    /// On error the histogram is left unchanged.
    pub fn accumulate(&mut self, gt: &ArrayView2<usize>, pred: &ArrayView2<usize>) -> Result<()> {
        let hist = fast_hist(gt, pred, self.num_classes())?;
        self.hist += &hist;
        Ok(())
    }

    /// Add the counts of `other`, which must cover the same label space.
    pub fn merge(&mut self, other: &ConfusionHistogram) -> Result<()> {
        if other.hist.dim() != self.hist.dim() {
            return Err(EvalError::ShapeMismatch {
                expected: self.hist.shape().to_vec(),
                found: other.hist.shape().to_vec(),
            });
        }
        self.hist += &other.hist;
        Ok(())
    }

    fn as_f64(&self) -> Array2<f64> {
        self.hist.mapv(|count| count as f64)
    }

    /// Intersection over union per class: `diag / (row_sum + col_sum - diag)`.
    /// Classes absent from both ground truth and prediction are `NaN`.
    pub fn per_class_iou(&self) -> Array1<f64> {
        let hist = self.as_f64();
        let intersection = hist.diag().to_owned();
        let union = hist.sum_axis(Axis(1)) + hist.sum_axis(Axis(0)) - &intersection;
        intersection / union
    }

    /// Mean IoU over classes with a defined IoU.
    pub fn mean_iou(&self) -> f64 {
        nanmean(&self.per_class_iou().view())
    }

    /// Fraction of correctly labelled pixels.
    pub fn overall_accuracy(&self) -> f64 {
        let hist = self.as_f64();
        hist.diag().sum() / hist.sum()
    }

    /// Per-class pixel accuracy (recall); `NaN` for classes absent from the ground truth.
    pub fn per_class_accuracy(&self) -> Array1<f64> {
        let hist = self.as_f64();
        hist.diag().to_owned() / hist.sum_axis(Axis(1))
    }

    /// Mean of the defined per-class accuracies.
    pub fn mean_accuracy(&self) -> f64 {
        nanmean(&self.per_class_accuracy().view())
    }

    /// IoU weighted by ground truth class frequency.
    /// Classes with zero frequency are dropped before weighting.
    pub fn frequency_weighted_accuracy(&self) -> f64 {
        let hist = self.as_f64();
        let total = hist.sum();
        if total == 0.0 {
            return f64::NAN;
        }
        let freq = hist.sum_axis(Axis(1)) / total;
        freq.iter()
            .zip(self.per_class_iou().iter())
            .filter(|(f, _)| **f > 0.0)
            .map(|(f, iu)| f * iu)
            .sum()
    }
}
