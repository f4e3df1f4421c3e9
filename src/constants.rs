//! # constants
//!
//! Common constants used throughout the library.

use once_cell::sync::Lazy;

/// Name of the background class. Always class index 0.
pub const BACKGROUND_CLASS: &str = "__background__";

/// Every LINEMOD object, in dataset-wide class index order.
/// Index 0 is the background.
pub const LINEMOD_CLASSES: [&str; 9] = [
    BACKGROUND_CLASS,
    "ape",
    "can",
    "cat",
    "driller",
    "duck",
    "eggbox",
    "glue",
    "holepuncher",
];

/// Objects whose geometry is rotationally symmetric.
/// These are scored with ADI instead of ADD.
pub const SYMMETRIC_CLASSES: [&str; 2] = ["eggbox", "glue"];

/// Display colors of the per-dataset label space (background, object).
pub const CLASS_COLORS: [[u8; 3]; 2] = [[255, 255, 255], [255, 0, 0]];

/// Loss weights of the per-dataset label space (background, object).
pub const CLASS_WEIGHTS: [f64; 2] = [1.0, 100.0];

/// Upper bound on computed class weights.
pub const MAX_CLASS_WEIGHT: f64 = 10.0;

/// Fraction of the object extent norm used as the pose correctness threshold.
pub const THRESHOLD_EXTENT_FRACTION: f64 = 0.1;

/// Image set whose ground truth labels hold dataset-wide class indices.
pub const TEST_IMAGE_SET: &str = "test";

/// Image set whose index file is named after the object class.
pub const TRAIN_IMAGE_SET: &str = "train";

/// File name suffixes of a sample, appended to its index identifier.
pub const COLOR_SUFFIX: &str = "-color.png";
/// Depth image suffix.
pub const DEPTH_SUFFIX: &str = "-depth.png";
/// Label image suffix.
pub const LABEL_SUFFIX: &str = "-label.png";
/// Metadata record suffix.
pub const METADATA_SUFFIX: &str = "-meta.json";

/// Per-class IoU report file name.
pub const SEGMENTATION_REPORT: &str = "segmentation.txt";
/// Confusion matrix report file name.
pub const CONFUSION_MATRIX_REPORT: &str = "confusion_matrix.txt";
/// Machine readable summary file name.
pub const SUMMARY_REPORT: &str = "summary.json";

/// Object names without the background, in the row order of `extents.txt`.
pub static OBJECT_CLASSES: Lazy<Vec<&str>> = Lazy::new(|| LINEMOD_CLASSES[1..].to_vec());
