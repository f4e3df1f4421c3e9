//! # dataloader
//!
//! Ground truth annotation store: the cached per-sample record list, reference
//! point clouds, and object extents.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use crate::dataset::SampleSource;
use crate::error::{EvalError, Result};
use crate::io::read_table;
use crate::palette::ClassPalette;
use crate::path::ensure_exists;

/// Ground truth record of one sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// RGB image path.
    pub image: PathBuf,
    /// Depth image path.
    pub depth: PathBuf,
    /// Label image path.
    pub label: PathBuf,
    /// Metadata record path.
    pub meta_data: PathBuf,
    /// Display color of every class.
    pub class_colors: ClassPalette,
    /// Loss weight of every class.
    pub class_weights: Vec<f64>,
    /// Whether the sample is horizontally mirrored.
    pub flipped: bool,
}

/// On-disk cache of annotation record lists, one JSON file per dataset name.
#[derive(Clone, Debug)]
pub struct AnnotationCache {
    cache_dir: PathBuf,
}

impl AnnotationCache {
    /// Cache rooted at `cache_dir`. The directory is created on first store.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Cache file of a dataset.
    pub fn path_for(&self, dataset_name: &str) -> PathBuf {
        self.cache_dir.join(format!("{dataset_name}_gt_roidb.json"))
    }

    /// Read the cached records of a dataset.
    ///
    /// Returns `None` when no cache file exists. An existing file that fails to
    /// decode is an error and is left untouched.
    pub fn load(&self, dataset_name: &str) -> Result<Option<Vec<AnnotationRecord>>> {
        let path = self.path_for(dataset_name);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        let records = serde_json::from_str(&contents)
            .map_err(|source| EvalError::CacheDecode { path, source })?;
        Ok(Some(records))
    }

    /// Write the records of a dataset. The file is replaced atomically.
    pub fn store(&self, dataset_name: &str, records: &[AnnotationRecord]) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir)?;
        let path = self.path_for(dataset_name);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_vec(records)?)?;
        fs::rename(&tmp_path, &path)?;
        Ok(path)
    }
}

/// Build one record for every sample of `source`, reusing the cache when possible.
pub fn load_annotations<S: SampleSource + ?Sized>(
    source: &S,
    cache: &AnnotationCache,
) -> Result<Vec<AnnotationRecord>> {
    let name = source.name();
    if let Some(records) = cache.load(name)? {
        info!(
            "{name} gt roidb loaded from {:?}",
            cache.path_for(name)
        );
        if let Some(first) = records.first() {
            info!("class weights: {:?}", first.class_weights);
        }
        return Ok(records);
    }

    let records = (0..source.len())
        .map(|i| {
            let paths = source.sample_paths(i)?;
            Ok(AnnotationRecord {
                image: paths.image,
                depth: paths.depth,
                label: paths.label,
                meta_data: paths.metadata,
                class_colors: source.palette().clone(),
                class_weights: source.class_weights().to_vec(),
                flipped: false,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let path = cache.store(name, &records)?;
    info!("wrote gt roidb to {path:?}");
    Ok(records)
}

/// Load the (N,3) reference point cloud of an object from a `.xyz` table.
///
/// Extra columns (e.g. normals) are dropped.
pub fn load_reference_points(path: &Path, class_name: &str) -> Result<Array2<f64>> {
    let path = ensure_exists("object point file", path)?;
    let table = read_table(&path)?;
    if table.nrows() == 0 || table.ncols() < 3 {
        return Err(EvalError::MissingPoints(class_name.to_string()));
    }
    Ok(table.slice(s![.., ..3]).to_owned())
}

/// Load per-class bounding box sizes for the label space `classes`.
///
/// `extents.txt` holds one row per object in `object_table` order. Row 0 of the
/// result is the background and stays zero.
pub fn load_extents(path: &Path, object_table: &[&str], classes: &[&str]) -> Result<Array2<f64>> {
    let path = ensure_exists("extents file", path)?;
    let table = read_table(&path)?;
    if table.nrows() != object_table.len() || table.ncols() != 3 {
        return Err(EvalError::ShapeMismatch {
            expected: vec![object_table.len(), 3],
            found: table.shape().to_vec(),
        });
    }
    let mut extents = Array2::<f64>::zeros((classes.len(), 3));
    for (i, class_name) in classes.iter().enumerate().skip(1) {
        let row = object_table
            .iter()
            .position(|name| name == class_name)
            .ok_or_else(|| EvalError::UnknownClass(class_name.to_string()))?;
        extents.row_mut(i).assign(&table.row(row));
    }
    Ok(extents)
}
