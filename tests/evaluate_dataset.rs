//! End-to-end evaluation of a small on-disk LINEMOD image set.

use std::fs;
use std::path::Path;

use image::GrayImage;
use ndarray::array;
use tempfile::tempdir;

use linemod_eval::{
    dataloader::AnnotationCache,
    dataset::LinemodDataset,
    evaluation::eval::{DatasetEvaluator, EvaluationCfg},
    structures::segmentation::SegmentationResult,
};

const META: &str = r#"{"poses": [[1, 0, 0, 0], [0, 1, 0, 0], [0, 0, 1, 0.5]], "cls_indexes": [1]}"#;

fn write_label(path: &Path, pixels: Vec<u8>) {
    GrayImage::from_raw(2, 2, pixels).unwrap().save(path).unwrap();
}

fn write_linemod(root: &Path) {
    for dir in ["data", "indexes", "models"] {
        fs::create_dir_all(root.join(dir)).unwrap();
    }
    // ape extent first, threshold 0.1.
    let mut extents = vec!["0.0 0.0 1.0".to_string()];
    extents.extend((0..7).map(|_| "0.1 0.1 0.1".to_string()));
    fs::write(root.join("extents.txt"), extents.join("\n")).unwrap();
    fs::write(
        root.join("models/ape.xyz"),
        "0.01 0.0 0.0\n0.0 0.01 0.0\n0.0 0.0 0.01\n",
    )
    .unwrap();
    fs::write(root.join("indexes/test.txt"), "000000\n000001\n").unwrap();

    for id in ["000000", "000001"] {
        fs::write(root.join(format!("data/{id}-color.png")), b"").unwrap();
        fs::write(root.join(format!("data/{id}-depth.png")), b"").unwrap();
        fs::write(root.join(format!("data/{id}-meta.json")), META).unwrap();
    }
    // Dataset-wide indices: 1 is ape, 3 is another object.
    write_label(&root.join("data/000000-label.png"), vec![0, 1, 3, 1]);
    write_label(&root.join("data/000001-label.png"), vec![1, 1, 0, 0]);
}

#[test]
fn evaluate_test_image_set() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("LINEMOD");
    write_linemod(&root);

    let dataset = LinemodDataset::new(&root, "ape", "test").unwrap();
    let cache = AnnotationCache::new(dir.path().join("cache"));
    let records = dataset.gt_roidb(&cache).unwrap();
    assert_eq!(records.len(), 2);
    assert!(cache.path_for("linemod_ape_test").exists());

    let prediction = dir.path().join("0000.json");
    fs::write(
        &prediction,
        r#"{"labels": [[0, 1], [0, 1]], "poses": [[1, 0, 0, 0, 0, 0, 0.5]]}"#,
    )
    .unwrap();
    let segmentations = vec![
        SegmentationResult::from_json(&prediction).unwrap(),
        SegmentationResult::from_labels(array![[0, 1], [0, 0]]),
    ];

    let cfg = EvaluationCfg {
        save_label_images: true,
        ..Default::default()
    };
    let mut evaluator = DatasetEvaluator::new(dataset.classes().to_vec(), cfg).unwrap();
    let output = dir.path().join("output");
    let report = evaluator
        .evaluate(&dataset, &records, &segmentations, Some(output.as_path()))
        .unwrap();

    assert_eq!(report.confusion_matrix, vec![vec![4, 0], vec![1, 3]]);
    assert_eq!(report.overall_accuracy, 7.0 / 8.0);
    assert_eq!(report.per_class_iou[0], 0.8);
    assert_eq!(report.per_class_iou[1], 0.75);
    let pose = report.pose.as_ref().unwrap();
    assert_eq!(pose.num_instances, 1);
    assert_eq!(pose.variants.len(), 1);
    assert_eq!(pose.variants[0].accuracy, 1.0);

    assert!(output.join("images/0000.png").exists());
    assert!(output.join("images/0001.png").exists());

    report.write(&output).unwrap();
    let segmentation = fs::read_to_string(output.join("segmentation.txt")).unwrap();
    assert_eq!(segmentation, "0.800000\n0.750000\n");
    assert!(output.join("confusion_matrix.txt").exists());
    assert!(output.join("summary.json").exists());

    // Second pass reads the cache.
    let cached = dataset.gt_roidb(&cache).unwrap();
    assert_eq!(cached, records);
}

#[test]
fn missing_label_image_aborts() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("LINEMOD");
    write_linemod(&root);
    fs::remove_file(root.join("data/000001-label.png")).unwrap();

    let dataset = LinemodDataset::new(&root, "ape", "test").unwrap();
    let err = dataset
        .gt_roidb(&AnnotationCache::new(dir.path().join("cache")))
        .unwrap_err();
    assert!(err.to_string().contains("label image"));
}
