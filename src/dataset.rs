//! # dataset
//!
//! LINEMOD single-object dataset: class definitions, sample path layout, and
//! ground truth loading in the per-dataset label space.

use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2};

use crate::constants::{
    BACKGROUND_CLASS, CLASS_COLORS, CLASS_WEIGHTS, COLOR_SUFFIX, DEPTH_SUFFIX, LABEL_SUFFIX,
    LINEMOD_CLASSES, METADATA_SUFFIX, OBJECT_CLASSES, SYMMETRIC_CLASSES, TEST_IMAGE_SET,
    TRAIN_IMAGE_SET,
};
use crate::dataloader::{
    load_annotations, load_extents, load_reference_points, AnnotationCache, AnnotationRecord,
};
use crate::error::{EvalError, Result};
use crate::evaluation::pose::PoseMetric;
use crate::io::{read_index_image, read_label_image, LabelImage};
use crate::palette::{ClassPalette, LabelMap};
use crate::path::{ensure_exists, read_image_set_index};
use crate::structures::metadata::MetaData;

/// Files making up one sample.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplePaths {
    /// RGB image.
    pub image: PathBuf,
    /// Depth image.
    pub depth: PathBuf,
    /// Label image.
    pub label: PathBuf,
    /// Metadata record.
    pub metadata: PathBuf,
}

/// Resolves the files of every sample of a dataset split.
pub trait SampleSource {
    /// Dataset name, used as the annotation cache key.
    fn name(&self) -> &str;
    /// Number of samples.
    fn len(&self) -> usize;
    /// Whether the split has no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Paths of sample `i`. Fails if any referenced file is missing.
    fn sample_paths(&self, i: usize) -> Result<SamplePaths>;
    /// Class colors of the label space.
    fn palette(&self) -> &ClassPalette;
    /// Class loss weights of the label space.
    fn class_weights(&self) -> &[f64];
}

/// Loads ground truth of a sample, already aligned to the evaluated label space.
pub trait GroundTruthLoader {
    /// Ground truth class indices.
    fn load_labels(&self, record: &AnnotationRecord) -> Result<LabelMap>;
    /// Ground truth poses and class ids.
    fn load_metadata(&self, record: &AnnotationRecord) -> Result<MetaData>;
}

/// Definition of one class of the evaluated label space.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectClass {
    /// Class name.
    pub name: String,
    /// Display color.
    pub color: [u8; 3],
    /// Loss weight.
    pub weight: f64,
    /// Rotationally symmetric geometry; selects ADI over ADD.
    pub is_symmetric: bool,
    /// (3,) bounding box size. Zero for the background.
    pub extent: Array1<f64>,
    /// (N,3) reference point cloud, if the class has one.
    pub points: Option<Array2<f64>>,
}

impl ObjectClass {
    /// Build a class, resolving symmetry from the class table.
    pub fn new(name: &str, color: [u8; 3], weight: f64, extent: Array1<f64>) -> Self {
        Self {
            name: name.to_string(),
            color,
            weight,
            is_symmetric: SYMMETRIC_CLASSES.contains(&name),
            extent,
            points: None,
        }
    }

    /// Attach a reference point cloud.
    pub fn with_points(mut self, points: Array2<f64>) -> Self {
        self.points = Some(points);
        self
    }

    /// Pose discrepancy metric used for this class.
    pub fn metric(&self) -> PoseMetric {
        if self.is_symmetric {
            PoseMetric::Adi
        } else {
            PoseMetric::Add
        }
    }

    /// Correctness threshold: `fraction` of the extent's Euclidean norm.
    pub fn threshold(&self, fraction: f64) -> f64 {
        fraction * self.extent.dot(&self.extent).sqrt()
    }

    /// Reference points, or `MissingPoints` when the class has none.
    pub fn reference_points(&self) -> Result<ArrayView2<'_, f64>> {
        self.points
            .as_ref()
            .map(Array2::view)
            .ok_or_else(|| EvalError::MissingPoints(self.name.clone()))
    }
}

/// One object of LINEMOD, evaluated as a two-class (background, object) problem.
#[derive(Clone, Debug)]
pub struct LinemodDataset {
    name: String,
    class_name: String,
    image_set: String,
    root_dir: PathBuf,
    data_dir: PathBuf,
    cls_index: usize,
    classes: Vec<ObjectClass>,
    palette: ClassPalette,
    class_weights: Vec<f64>,
    image_index: Vec<String>,
}

impl LinemodDataset {
    /// Open the `image_set` split of object `class_name` under `root_dir`.
    ///
    /// Expects `data/`, `indexes/`, `models/<class>.xyz`, and `extents.txt`.
    pub fn new(root_dir: impl AsRef<Path>, class_name: &str, image_set: &str) -> Result<Self> {
        let root_dir = ensure_exists("linemod path", root_dir.as_ref())?;
        let data_dir = ensure_exists("data path", root_dir.join("data"))?;
        let cls_index = LINEMOD_CLASSES
            .iter()
            .position(|name| *name == class_name && *name != BACKGROUND_CLASS)
            .ok_or_else(|| EvalError::UnknownClass(class_name.to_string()))?;

        let class_names = [BACKGROUND_CLASS, class_name];
        let extents = load_extents(&root_dir.join("extents.txt"), &OBJECT_CLASSES, &class_names)?;
        let points = load_reference_points(
            &root_dir.join("models").join(format!("{class_name}.xyz")),
            class_name,
        )?;
        let background = ObjectClass::new(
            BACKGROUND_CLASS,
            CLASS_COLORS[0],
            CLASS_WEIGHTS[0],
            extents.row(0).to_owned(),
        );
        let object = ObjectClass::new(
            class_name,
            CLASS_COLORS[1],
            CLASS_WEIGHTS[1],
            extents.row(1).to_owned(),
        )
        .with_points(points);
        let classes = vec![background, object];

        let index_name = if image_set == TRAIN_IMAGE_SET {
            class_name
        } else {
            image_set
        };
        let image_index =
            read_image_set_index(&root_dir.join("indexes").join(format!("{index_name}.txt")))?;
        let name = format!("linemod_{class_name}_{image_set}");
        info!(
            "{name}: {} samples, class index {cls_index}, symmetric {}",
            image_index.len(),
            classes[1].is_symmetric
        );

        Ok(Self {
            name,
            class_name: class_name.to_string(),
            image_set: image_set.to_string(),
            root_dir,
            data_dir,
            cls_index,
            palette: ClassPalette::new(classes.iter().map(|c| c.color).collect())?,
            class_weights: classes.iter().map(|c| c.weight).collect(),
            classes,
            image_index,
        })
    }

    /// Dataset root directory.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Evaluated object name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Image set name (e.g. `train`, `test`).
    pub fn image_set(&self) -> &str {
        &self.image_set
    }

    /// Dataset-wide class index of the evaluated object.
    pub fn cls_index(&self) -> usize {
        self.cls_index
    }

    /// Classes of the evaluated label space.
    pub fn classes(&self) -> &[ObjectClass] {
        &self.classes
    }

    /// Number of classes of the evaluated label space.
    pub fn num_classes(&self) -> usize {
        self.classes.len()
    }

    /// Sample identifiers.
    pub fn image_index(&self) -> &[String] {
        &self.image_index
    }

    fn sample_file(&self, kind: &'static str, i: usize, suffix: &str) -> Result<PathBuf> {
        let index = self.image_index.get(i).ok_or(EvalError::ShapeMismatch {
            expected: vec![self.image_index.len()],
            found: vec![i + 1],
        })?;
        ensure_exists(kind, self.data_dir.join(format!("{index}{suffix}")))
    }

    /// RGB image of sample `i`.
    pub fn image_path_at(&self, i: usize) -> Result<PathBuf> {
        self.sample_file("image", i, COLOR_SUFFIX)
    }

    /// Depth image of sample `i`.
    pub fn depth_path_at(&self, i: usize) -> Result<PathBuf> {
        self.sample_file("depth image", i, DEPTH_SUFFIX)
    }

    /// Label image of sample `i`.
    pub fn label_path_at(&self, i: usize) -> Result<PathBuf> {
        self.sample_file("label image", i, LABEL_SUFFIX)
    }

    /// Metadata record of sample `i`.
    pub fn metadata_path_at(&self, i: usize) -> Result<PathBuf> {
        self.sample_file("metadata", i, METADATA_SUFFIX)
    }

    /// Annotation records of every sample, read from or written to `cache`.
    pub fn gt_roidb(&self, cache: &AnnotationCache) -> Result<Vec<AnnotationRecord>> {
        load_annotations(self, cache)
    }

    /// Class weights from label pixel frequencies: `min(count[0] / count[i], max_weight)`.
    pub fn compute_class_weights(&self, max_weight: f64) -> Result<Vec<f64>> {
        info!("computing class weights");
        let mut counts = vec![0u64; self.num_classes()];
        for i in 0..self.len() {
            let labels = read_index_image(&self.label_path_at(i)?)?;
            for label in labels.iter() {
                if let Some(count) = counts.get_mut(*label) {
                    *count += 1;
                }
            }
        }
        let weights = counts
            .iter()
            .map(|count| (counts[0] as f64 / *count as f64).min(max_weight))
            .collect::<Vec<_>>();
        for (class, weight) in self.classes.iter().zip(&weights) {
            info!("{} {weight}", class.name);
        }
        Ok(weights)
    }
}

impl SampleSource for LinemodDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.image_index.len()
    }

    fn sample_paths(&self, i: usize) -> Result<SamplePaths> {
        Ok(SamplePaths {
            image: self.image_path_at(i)?,
            depth: self.depth_path_at(i)?,
            label: self.label_path_at(i)?,
            metadata: self.metadata_path_at(i)?,
        })
    }

    fn palette(&self) -> &ClassPalette {
        &self.palette
    }

    fn class_weights(&self) -> &[f64] {
        &self.class_weights
    }
}

impl GroundTruthLoader for LinemodDataset {
    /// Color-coded labels are decoded with the record's palette. Index labels
    /// of the test set hold dataset-wide indices and are reduced to object vs
    /// background.
    fn load_labels(&self, record: &AnnotationRecord) -> Result<LabelMap> {
        match read_label_image(&record.label)? {
            LabelImage::Color(image) => record.class_colors.decode(&image.view()),
            LabelImage::Index(mut labels) => {
                if self.image_set == TEST_IMAGE_SET {
                    labels.mapv_inplace(|label| usize::from(label == self.cls_index));
                }
                Ok(labels)
            }
        }
    }

    fn load_metadata(&self, record: &AnnotationRecord) -> Result<MetaData> {
        let path = ensure_exists("metadata", &record.meta_data)?;
        let mut meta = MetaData::from_json(&path)?;
        meta.remap_classes(self.cls_index);
        debug!("{:?}: {} gt poses", path, meta.poses.len());
        Ok(meta)
    }
}
