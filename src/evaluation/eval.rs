//! # eval
//!
//! Full-dataset evaluation of segmentations and poses.
//!
//! Every predicted region is compared against every ground truth instance of
//! a sample, with no one-to-one matching. This matches the single instance
//! per class layout of LINEMOD; scenes with several instances of one class
//! would count a correct pose once per matching region.

use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::{debug, info};

use crate::constants::THRESHOLD_EXTENT_FRACTION;
use crate::dataloader::AnnotationRecord;
use crate::dataset::{GroundTruthLoader, ObjectClass};
use crate::error::{EvalError, Result};
use crate::evaluation::pose::{PoseCounters, PoseErrors};
use crate::evaluation::segmentation::ConfusionHistogram;
use crate::io::write_rgb_image;
use crate::palette::{ClassPalette, LabelMap};
use crate::report::EvaluationReport;
use crate::structures::metadata::MetaData;
use crate::structures::segmentation::{PoseVariant, SegmentationResult};

/// Evaluation configuration.
#[derive(Clone, Debug)]
pub struct EvaluationCfg {
    /// Score predicted poses when a result carries them.
    pub pose_regression: bool,
    /// Also score the translation refined and ICP refined poses.
    pub pose_refine: bool,
    /// Write color-coded predicted labels to `<output>/images`.
    pub save_label_images: bool,
    /// Correctness threshold as a fraction of the extent norm.
    pub threshold_extent_fraction: f64,
}

impl Default for EvaluationCfg {
    fn default() -> Self {
        Self {
            pose_regression: true,
            pose_refine: false,
            save_label_images: false,
            threshold_extent_fraction: THRESHOLD_EXTENT_FRACTION,
        }
    }
}

impl EvaluationCfg {
    /// Pose variants scored under this configuration.
    pub fn pose_variants(&self) -> Vec<PoseVariant> {
        if self.pose_refine {
            PoseCounters::variants().collect()
        } else {
            vec![PoseVariant::Raw]
        }
    }
}

/// One estimated pose scored against one ground truth instance.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseComparison {
    /// Ground truth instance index within the sample.
    pub gt_instance: usize,
    /// Class of the ground truth instance.
    pub class_index: usize,
    /// Predicted region index.
    pub region: usize,
    /// Scored pose output.
    pub variant: PoseVariant,
    /// Errors against the ground truth.
    pub errors: PoseErrors,
    /// Correctness threshold of the class.
    pub threshold: f64,
    /// `errors.discrepancy < threshold`.
    pub correct: bool,
}

/// Outcome of one sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleEvaluation {
    /// IoU of classes with a non-empty union in this sample.
    pub per_class_iou: Vec<(usize, f64)>,
    /// Ground truth pose instances considered.
    pub num_instances: usize,
    /// Every region/instance/variant comparison.
    pub comparisons: Vec<PoseComparison>,
}

impl SampleEvaluation {
    /// `name: iou` of every class with a non-empty union, comma separated.
    pub fn iou_summary(&self, classes: &[ObjectClass]) -> String {
        self.per_class_iou
            .iter()
            .map(|(i, iou)| {
                let name = classes.get(*i).map_or("?", |c| c.name.as_str());
                format!("{name}: {iou:.4}")
            })
            .join(", ")
    }
}

/// Accumulates segmentation and pose statistics over a dataset pass.
#[derive(Clone, Debug)]
pub struct DatasetEvaluator {
    classes: Vec<ObjectClass>,
    palette: ClassPalette,
    cfg: EvaluationCfg,
    histogram: ConfusionHistogram,
    counters: PoseCounters,
}

impl DatasetEvaluator {
    /// Evaluator over the label space `classes`.
    pub fn new(classes: Vec<ObjectClass>, cfg: EvaluationCfg) -> Result<Self> {
        let palette = ClassPalette::new(classes.iter().map(|c| c.color).collect())?;
        Ok(Self {
            histogram: ConfusionHistogram::new(classes.len()),
            classes,
            palette,
            cfg,
            counters: PoseCounters::default(),
        })
    }

    /// Evaluation configuration.
    pub fn cfg(&self) -> &EvaluationCfg {
        &self.cfg
    }

    /// Running confusion histogram.
    pub fn histogram(&self) -> &ConfusionHistogram {
        &self.histogram
    }

    /// Running pose counters.
    pub fn counters(&self) -> &PoseCounters {
        &self.counters
    }

    /// Clear all accumulated statistics.
    pub fn reset(&mut self) {
        self.histogram.reset();
        self.counters = PoseCounters::default();
    }

    /// Whether poses of `segmentation` are scored.
    pub fn evaluates_poses(&self, segmentation: &SegmentationResult) -> bool {
        self.cfg.pose_regression && segmentation.has_poses()
    }

    /// Fold one sample into the running statistics.
    ///
    /// `meta` is required whenever [`Self::evaluates_poses`] holds for `segmentation`.
    pub fn evaluate_sample(
        &mut self,
        gt_labels: &LabelMap,
        segmentation: &SegmentationResult,
        meta: Option<&MetaData>,
    ) -> Result<SampleEvaluation> {
        let mut sample_hist = ConfusionHistogram::new(self.classes.len());
        sample_hist.accumulate(&gt_labels.view(), &segmentation.labels.view())?;
        let mut sample = SampleEvaluation {
            per_class_iou: sample_hist
                .per_class_iou()
                .iter()
                .enumerate()
                .filter(|(_, iou)| !iou.is_nan())
                .map(|(i, iou)| (i, *iou))
                .collect(),
            ..Default::default()
        };

        let mut counters = self.counters.clone();
        if self.evaluates_poses(segmentation) {
            let meta = meta.ok_or(EvalError::MissingMetadata)?;
            self.evaluate_poses(segmentation, meta, &mut sample, &mut counters)?;
        }

        // Commit only after the whole sample succeeded.
        self.histogram.merge(&sample_hist)?;
        self.counters = counters;
        Ok(sample)
    }

    fn evaluate_poses(
        &self,
        segmentation: &SegmentationResult,
        meta: &MetaData,
        sample: &mut SampleEvaluation,
        counters: &mut PoseCounters,
    ) -> Result<()> {
        let variants = self.cfg.pose_variants();
        for (j, cls) in meta.cls_indexes.iter().enumerate() {
            if *cls <= 0 {
                continue;
            }
            let class_index = *cls as usize;
            let class = self
                .classes
                .get(class_index)
                .ok_or_else(|| EvalError::UnknownClass(format!("class index {cls}")))?;
            let points = class.reference_points()?;
            let metric = class.metric();
            let threshold = class.threshold(self.cfg.threshold_extent_fraction);
            let gt = meta.poses.pose(j)?;
            counters.add_instance();
            sample.num_instances += 1;
            debug!("{} gt pose\n{}", class.name, gt.rt_matrix());

            for region in 0..segmentation.num_regions() {
                for variant in &variants {
                    let est = segmentation.region_pose(*variant, region)?;
                    let errors = PoseErrors::compute(&est, &gt, &points, metric);
                    let correct = errors.is_correct(threshold);
                    if correct {
                        counters.add_correct(*variant);
                    }
                    debug!(
                        "region {region} {variant} pose\n{}\nrotation error: {}, translation error: {}, {metric} error: {}, threshold: {threshold}",
                        est.rt_matrix(),
                        errors.rotation_deg,
                        errors.translation,
                        errors.discrepancy,
                    );
                    sample.comparisons.push(PoseComparison {
                        gt_instance: j,
                        class_index,
                        region,
                        variant: *variant,
                        errors,
                        threshold,
                        correct,
                    });
                }
            }
        }
        Ok(())
    }

    /// Evaluate every sample and return the dataset report.
    ///
    /// Statistics are reset first. Any error aborts the run.
    pub fn evaluate<G: GroundTruthLoader + ?Sized>(
        &mut self,
        loader: &G,
        records: &[AnnotationRecord],
        segmentations: &[SegmentationResult],
        output_dir: Option<&Path>,
    ) -> Result<EvaluationReport> {
        self.evaluate_with_progress(loader, records, segmentations, output_dir, |_| {})
    }

    /// [`Self::evaluate`], calling `on_sample` after every sample.
    pub fn evaluate_with_progress<G, F>(
        &mut self,
        loader: &G,
        records: &[AnnotationRecord],
        segmentations: &[SegmentationResult],
        output_dir: Option<&Path>,
        mut on_sample: F,
    ) -> Result<EvaluationReport>
    where
        G: GroundTruthLoader + ?Sized,
        F: FnMut(usize),
    {
        info!("evaluating segmentations");
        if records.len() != segmentations.len() {
            return Err(EvalError::ShapeMismatch {
                expected: vec![records.len()],
                found: vec![segmentations.len()],
            });
        }
        self.reset();

        let image_dir = match (output_dir, self.cfg.save_label_images) {
            (Some(dir), true) => {
                let image_dir = dir.join("images");
                fs::create_dir_all(&image_dir)?;
                Some(image_dir)
            }
            _ => None,
        };

        for (i, (record, segmentation)) in records.iter().zip(segmentations).enumerate() {
            let gt_labels = loader.load_labels(record)?;
            let meta = if self.evaluates_poses(segmentation) {
                Some(loader.load_metadata(record)?)
            } else {
                None
            };
            let sample = self.evaluate_sample(&gt_labels, segmentation, meta.as_ref())?;
            debug!("sample {i} {}: {}", record.label.display(), sample.iou_summary(&self.classes));

            if let Some(image_dir) = &image_dir {
                let label_image = self.palette.encode(&segmentation.labels.view());
                write_rgb_image(&image_dir.join(format!("{i:04}.png")), &label_image.view())?;
            }
            on_sample(i);
        }
        Ok(self.report())
    }

    /// Report of the statistics accumulated so far.
    pub fn report(&self) -> EvaluationReport {
        let class_names = self.classes.iter().map(|c| c.name.clone()).collect();
        let variants = self.cfg.pose_variants();
        let pose = self
            .cfg
            .pose_regression
            .then_some((&self.counters, variants.as_slice()));
        EvaluationReport::new(class_names, &self.histogram, pose)
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2, ArrayD, IxDyn};

    use super::{DatasetEvaluator, EvaluationCfg};
    use crate::dataloader::AnnotationRecord;
    use crate::dataset::{GroundTruthLoader, ObjectClass};
    use crate::error::{EvalError, Result};
    use crate::geometry::se3::SE3;
    use crate::palette::{ClassPalette, LabelMap};
    use crate::structures::metadata::{MetaData, PoseStack};
    use crate::structures::segmentation::{PoseVariant, SegmentationResult};

    fn classes(object: &str) -> Vec<ObjectClass> {
        let points = array![[0.1, 0.0, 0.0], [0.0, 0.1, 0.0], [0.0, 0.0, 0.1], [-0.1, 0.0, 0.0]];
        vec![
            ObjectClass::new("__background__", [255, 255, 255], 1.0, array![0.0, 0.0, 0.0]),
            ObjectClass::new(object, [255, 0, 0], 100.0, array![0.3, 0.4, 0.0]).with_points(points),
        ]
    }

    fn identity_meta(cls_indexes: Vec<i64>) -> MetaData {
        let n = cls_indexes.len();
        let mut poses = ArrayD::<f64>::zeros(IxDyn(&[3, 4, n]));
        for j in 0..n {
            for i in 0..3 {
                poses[[i, i, j]] = 1.0;
            }
        }
        MetaData::new(PoseStack::from_array(poses).unwrap(), cls_indexes).unwrap()
    }

    fn pose_row(tz: f64) -> Vec<f64> {
        vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, tz]
    }

    fn result_with_poses(raw: &[f64], refined: &[f64], icp: &[f64]) -> SegmentationResult {
        let rows = |tzs: &[f64]| {
            let flat: Vec<f64> = tzs.iter().flat_map(|tz| pose_row(*tz)).collect();
            Array2::from_shape_vec((tzs.len(), 7), flat).unwrap()
        };
        SegmentationResult {
            labels: array![[0, 1], [1, 0]],
            rois: Some(Array2::zeros((raw.len(), 6))),
            poses: Some(rows(raw)),
            poses_refined: Some(rows(refined)),
            poses_icp: Some(rows(icp)),
        }
    }

    #[test]
    fn test_segmentation_only_sample() {
        let mut evaluator = DatasetEvaluator::new(classes("ape"), EvaluationCfg::default()).unwrap();
        let gt = array![[0, 1], [1, 0]];
        let sample = evaluator
            .evaluate_sample(&gt, &SegmentationResult::from_labels(gt.clone()), None)
            .unwrap();
        assert_eq!(sample.per_class_iou, vec![(0, 1.0), (1, 1.0)]);
        assert_eq!(evaluator.histogram().counts(), &array![[2, 0], [0, 2]]);
        assert_eq!(evaluator.counters().num_instances, 0);
        let report = evaluator.report();
        assert_eq!(report.overall_accuracy, 1.0);
        assert!(report.pose.as_ref().unwrap().variants[0].accuracy.is_nan());
    }

    #[test]
    fn test_per_sample_iou_summary() {
        let mut evaluator = DatasetEvaluator::new(classes("ape"), EvaluationCfg::default()).unwrap();
        let gt = array![[0, 0], [1, 1]];
        let pred = array![[0, 1], [1, 1]];
        let sample = evaluator
            .evaluate_sample(&gt, &SegmentationResult::from_labels(pred), None)
            .unwrap();
        assert_eq!(
            sample.iou_summary(&classes("ape")),
            "__background__: 0.5000, ape: 0.6667"
        );

        // Classes absent from both maps are left out.
        let sample = evaluator
            .evaluate_sample(&array![[1]], &SegmentationResult::from_labels(array![[1]]), None)
            .unwrap();
        assert_eq!(sample.iou_summary(&classes("ape")), "ape: 1.0000");
    }

    #[test]
    fn test_identity_pose_is_correct() {
        let mut evaluator = DatasetEvaluator::new(classes("ape"), EvaluationCfg::default()).unwrap();
        let gt = array![[0, 1], [1, 0]];
        let segmentation = result_with_poses(&[0.0], &[0.0], &[0.0]);
        let sample = evaluator
            .evaluate_sample(&gt, &segmentation, Some(&identity_meta(vec![1])))
            .unwrap();
        assert_eq!(sample.num_instances, 1);
        assert_eq!(sample.comparisons.len(), 1);
        let comparison = &sample.comparisons[0];
        assert_eq!(comparison.variant, PoseVariant::Raw);
        assert_eq!(comparison.errors.rotation_deg, 0.0);
        assert_eq!(comparison.errors.translation, 0.0);
        assert_eq!(comparison.errors.discrepancy, 0.0);
        assert!(comparison.correct);
        assert_eq!(evaluator.counters().accuracy(PoseVariant::Raw), 1.0);
    }

    #[test]
    fn test_variants_scored_independently() {
        // Extent (0.3, 0.4, 0) has norm 0.5, so the threshold is 0.05.
        let cfg = EvaluationCfg {
            pose_refine: true,
            ..Default::default()
        };
        let mut evaluator = DatasetEvaluator::new(classes("ape"), cfg).unwrap();
        let gt = array![[0, 1], [1, 0]];
        let segmentation = result_with_poses(&[0.06], &[0.04], &[0.2]);
        let sample = evaluator
            .evaluate_sample(&gt, &segmentation, Some(&identity_meta(vec![1])))
            .unwrap();
        assert_eq!(sample.comparisons.len(), 3);
        assert!((sample.comparisons[0].threshold - 0.05).abs() < 1e-12);
        let counters = evaluator.counters();
        assert_eq!(counters.correct(PoseVariant::Raw), 0);
        assert_eq!(counters.correct(PoseVariant::Refined), 1);
        assert_eq!(counters.correct(PoseVariant::Icp), 0);
    }

    #[test]
    fn test_every_region_against_every_instance() {
        let cfg = EvaluationCfg {
            pose_refine: true,
            ..Default::default()
        };
        let mut evaluator = DatasetEvaluator::new(classes("ape"), cfg).unwrap();
        let gt = array![[0, 1], [1, 0]];
        let segmentation = result_with_poses(&[0.0, 1.0], &[0.0, 0.0], &[1.0, 1.0]);
        // Background instance is skipped.
        let meta = identity_meta(vec![1, 0, 1]);
        let sample = evaluator.evaluate_sample(&gt, &segmentation, Some(&meta)).unwrap();
        assert_eq!(sample.num_instances, 2);
        assert_eq!(sample.comparisons.len(), 2 * 2 * 3);
        let counters = evaluator.counters();
        assert_eq!(counters.num_instances, 2);
        assert_eq!(counters.correct(PoseVariant::Raw), 2);
        assert_eq!(counters.correct(PoseVariant::Refined), 4);
        assert_eq!(counters.correct(PoseVariant::Icp), 0);
    }

    #[test]
    fn test_symmetric_class_uses_nearest_points() {
        let mut evaluator = DatasetEvaluator::new(classes("eggbox"), EvaluationCfg::default()).unwrap();
        let gt = array![[1]];
        // Half turn about z maps (0.1,0,0) onto (-0.1,0,0).
        let mut segmentation = result_with_poses(&[0.0], &[0.0], &[0.0]);
        segmentation.labels = array![[1]];
        segmentation.poses = Some(array![[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]]);
        let sample = evaluator
            .evaluate_sample(&gt, &segmentation, Some(&identity_meta(vec![1])))
            .unwrap();
        let errors = sample.comparisons[0].errors;
        assert!((errors.rotation_deg - 180.0).abs() < 1e-9);
        assert!(errors.discrepancy < 0.05);
        assert!(sample.comparisons[0].correct);
    }

    #[test]
    fn test_failed_sample_leaves_statistics_unchanged() {
        let mut evaluator = DatasetEvaluator::new(classes("ape"), EvaluationCfg::default()).unwrap();
        let gt = array![[0, 1], [1, 0]];
        let mut segmentation = result_with_poses(&[0.0], &[0.0], &[0.0]);
        segmentation.poses = Some(array![[1.0, 0.0, 0.0]]);
        let err = evaluator
            .evaluate_sample(&gt, &segmentation, Some(&identity_meta(vec![1])))
            .unwrap_err();
        assert!(matches!(err, EvalError::InvalidPose { len: 3 }));
        assert_eq!(evaluator.histogram().counts().sum(), 0);
        assert_eq!(evaluator.counters().num_instances, 0);
    }

    #[test]
    fn test_pose_regression_disabled() {
        let cfg = EvaluationCfg {
            pose_regression: false,
            ..Default::default()
        };
        let mut evaluator = DatasetEvaluator::new(classes("ape"), cfg).unwrap();
        let gt = array![[0, 1], [1, 0]];
        let segmentation = result_with_poses(&[0.0], &[0.0], &[0.0]);
        let sample = evaluator.evaluate_sample(&gt, &segmentation, None).unwrap();
        assert!(sample.comparisons.is_empty());
        assert!(evaluator.report().pose.is_none());
    }

    struct InMemory {
        labels: Vec<LabelMap>,
        meta: MetaData,
    }

    impl GroundTruthLoader for InMemory {
        fn load_labels(&self, record: &AnnotationRecord) -> Result<LabelMap> {
            let i: usize = record.label.to_str().unwrap().parse().unwrap();
            Ok(self.labels[i].clone())
        }

        fn load_metadata(&self, _record: &AnnotationRecord) -> Result<MetaData> {
            Ok(self.meta.clone())
        }
    }

    fn record(i: usize) -> AnnotationRecord {
        AnnotationRecord {
            image: format!("{i}").into(),
            depth: format!("{i}").into(),
            label: format!("{i}").into(),
            meta_data: format!("{i}").into(),
            class_colors: ClassPalette::new(vec![[255, 255, 255], [255, 0, 0]]).unwrap(),
            class_weights: vec![1.0, 100.0],
            flipped: false,
        }
    }

    #[test]
    fn test_dataset_pass_resets_and_reports() {
        let loader = InMemory {
            labels: vec![array![[0, 1], [1, 0]], array![[1, 1], [0, 0]]],
            meta: identity_meta(vec![1]),
        };
        let records = vec![record(0), record(1)];
        let segmentations = vec![
            result_with_poses(&[0.0], &[0.0], &[0.0]),
            SegmentationResult::from_labels(array![[1, 0], [0, 0]]),
        ];
        let mut evaluator = DatasetEvaluator::new(classes("ape"), EvaluationCfg::default()).unwrap();
        let gt = SE3::identity();
        assert_eq!(identity_meta(vec![1]).poses.pose(0).unwrap(), gt);

        let mut seen = Vec::new();
        for _ in 0..2 {
            seen.clear();
            let report = evaluator
                .evaluate_with_progress(&loader, &records, &segmentations, None, |i| seen.push(i))
                .unwrap();
            assert_eq!(report.confusion_matrix, vec![vec![4, 0], vec![1, 3]]);
            assert_eq!(report.overall_accuracy, 7.0 / 8.0);
            let pose = report.pose.unwrap();
            assert_eq!(pose.num_instances, 1);
            assert_eq!(pose.variants[0].correct, 1);
        }
        assert_eq!(seen, vec![0, 1]);
    }

    #[test]
    fn test_record_count_mismatch() {
        let loader = InMemory {
            labels: vec![],
            meta: identity_meta(vec![1]),
        };
        let mut evaluator = DatasetEvaluator::new(classes("ape"), EvaluationCfg::default()).unwrap();
        let err = evaluator.evaluate(&loader, &[record(0)], &[], None).unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch { .. }));
    }
}
