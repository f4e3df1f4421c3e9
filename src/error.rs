//! # error
//!
//! Error types shared across the library.

use std::path::PathBuf;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised while loading ground truth or evaluating predictions.
///
/// Every variant is fatal for the evaluation run. Numeric degeneracies
/// (empty classes, zero pose instances) are reported as `NaN` instead.
#[derive(thiserror::Error, Debug)]
pub enum EvalError {
    /// A file or directory required by the dataset does not exist.
    #[error("{kind} does not exist: {path:?}")]
    MissingPath {
        /// What the path was expected to hold (e.g. `label image`).
        kind: &'static str,
        /// Offending path.
        path: PathBuf,
    },
    /// Two arrays that must agree in shape do not.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Observed shape.
        found: Vec<usize>,
    },
    /// A pose vector does not hold `[qw, qx, qy, qz, tx, ty, tz]`.
    #[error("pose vector must have 7 elements, found {len}")]
    InvalidPose {
        /// Observed vector length.
        len: usize,
    },
    /// A predicted label lies outside `[0, num_classes)`.
    #[error("predicted label {label} is outside [0, {num_classes})")]
    LabelOutOfRange {
        /// Offending label.
        label: usize,
        /// Number of classes in the label space.
        num_classes: usize,
    },
    /// Poses were to be scored but no ground truth metadata was given.
    #[error("pose evaluation requires ground truth metadata")]
    MissingMetadata,
    /// Class name not present in the object table.
    #[error("unknown object class `{0}`")]
    UnknownClass(String),
    /// Class has no usable reference point cloud.
    #[error("no reference points configured for class `{0}`")]
    MissingPoints(String),
    /// Palette colors must be pairwise distinct.
    #[error("palette color {0:?} is used by more than one class")]
    DuplicateColor([u8; 3]),
    /// A whitespace separated numeric table could not be parsed.
    #[error("malformed table {path:?}: {reason}")]
    MalformedTable {
        /// Table path.
        path: PathBuf,
        /// Parse failure detail.
        reason: String,
    },
    /// An existing annotation cache file could not be decoded.
    #[error("cannot decode annotation cache {path:?}")]
    CacheDecode {
        /// Cache file path.
        path: PathBuf,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Image decoding or encoding failure.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}
