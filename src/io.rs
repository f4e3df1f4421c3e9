//! # io
//!
//! Reading and writing operations.

use std::fs;
use std::path::Path;

use image::{GrayImage, ImageBuffer, Rgb, RgbImage};
use ndarray::{Array2, Array3, ArrayView3};

use crate::error::{EvalError, Result};
use crate::palette::LabelMap;
use crate::path::ensure_exists;

/// Read a whitespace separated numeric table (one row per line) into an (N,M) array.
/// Blank lines and `#` comments are skipped.
pub fn read_table(path: &Path) -> Result<Array2<f64>> {
    let malformed = |reason: String| EvalError::MalformedTable {
        path: path.to_path_buf(),
        reason,
    };
    let contents = fs::read_to_string(path)?;
    let mut num_cols = None;
    let mut values = Vec::new();
    let mut num_rows = 0;
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| malformed(format!("line {}: {err}", line_no + 1)))?;
        match num_cols {
            None => num_cols = Some(row.len()),
            Some(n) if n != row.len() => {
                return Err(malformed(format!(
                    "line {} has {} columns, expected {n}",
                    line_no + 1,
                    row.len()
                )))
            }
            _ => {}
        }
        values.extend(row);
        num_rows += 1;
    }
    Array2::from_shape_vec((num_rows, num_cols.unwrap_or(0)), values)
        .map_err(|err| malformed(err.to_string()))
}

/// Label image as stored on disk.
#[derive(Clone, Debug, PartialEq)]
pub enum LabelImage {
    /// (H,W,3) color-coded labels, decoded through a class palette.
    Color(Array3<u8>),
    /// Single channel image whose pixel values are class indices.
    Index(LabelMap),
}

fn rgb_to_array(image: RgbImage) -> Result<Array3<u8>> {
    let (width, height) = image.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), image.into_raw()).map_err(|_| {
        EvalError::ShapeMismatch {
            expected: vec![height as usize, width as usize, 3],
            found: vec![],
        }
    })
}

fn luma_to_labels(image: GrayImage) -> Result<LabelMap> {
    let (width, height) = image.dimensions();
    let labels: Vec<usize> = image.into_raw().into_iter().map(usize::from).collect();
    LabelMap::from_shape_vec((height as usize, width as usize), labels).map_err(|_| {
        EvalError::ShapeMismatch {
            expected: vec![height as usize, width as usize],
            found: vec![],
        }
    })
}

/// Read an RGB image into an (H,W,3) `u8` array. Alpha channels are dropped.
pub fn read_rgb_image(path: &Path) -> Result<Array3<u8>> {
    let path = ensure_exists("image", path)?;
    rgb_to_array(image::open(&path)?.to_rgb8())
}

/// Read a single channel image whose pixel values are class indices.
pub fn read_index_image(path: &Path) -> Result<LabelMap> {
    let path = ensure_exists("label image", path)?;
    luma_to_labels(image::open(&path)?.to_luma8())
}

/// Read a label image, keeping color-coded and index encodings apart.
///
/// Images with three or more channels are color-coded; alpha is dropped.
pub fn read_label_image(path: &Path) -> Result<LabelImage> {
    let path = ensure_exists("label image", path)?;
    let image = image::open(&path)?;
    if image.color().channel_count() >= 3 {
        Ok(LabelImage::Color(rgb_to_array(image.to_rgb8())?))
    } else {
        Ok(LabelImage::Index(luma_to_labels(image.to_luma8())?))
    }
}

/// Write an (H,W,3) `u8` array as an RGB PNG.
pub fn write_rgb_image(path: &Path, image: &ArrayView3<u8>) -> Result<()> {
    let (height, width, _) = image.dim();
    let raw: Vec<u8> = image.iter().copied().collect();
    let buffer = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width as u32, height as u32, raw)
        .ok_or_else(|| EvalError::ShapeMismatch {
            expected: vec![height, width, 3],
            found: image.shape().to_vec(),
        })?;
    buffer.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use ndarray::array;

    use super::{
        read_index_image, read_label_image, read_rgb_image, read_table, write_rgb_image, LabelImage,
    };
    use crate::error::EvalError;

    #[test]
    fn test_read_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extents.txt");
        fs::write(&path, "0.1 0.2 0.3\n\n 1e-1   2 3\n").unwrap();
        let table = read_table(&path).unwrap();
        assert_eq!(table, array![[0.1, 0.2, 0.3], [0.1, 2.0, 3.0]]);
    }

    #[test]
    fn test_read_ragged_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ape.xyz");
        fs::write(&path, "0 0 0\n1 1\n").unwrap();
        let err = read_table(&path).unwrap_err();
        assert!(matches!(err, EvalError::MalformedTable { .. }));
    }

    #[test]
    fn test_rgb_image_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0000.png");
        let image = array![
            [[255u8, 255, 255], [255, 0, 0], [0, 0, 255]],
            [[255, 0, 0], [0, 255, 0], [255, 255, 255]]
        ];
        write_rgb_image(&path, &image.view()).unwrap();
        assert_eq!(read_rgb_image(&path).unwrap(), image);
    }

    #[test]
    fn test_read_index_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("000000-label.png");
        image::GrayImage::from_raw(3, 1, vec![0, 6, 1])
            .unwrap()
            .save(&path)
            .unwrap();
        assert_eq!(read_index_image(&path).unwrap(), array![[0, 6, 1]]);
    }

    #[test]
    fn test_missing_label_image() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_index_image(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, EvalError::MissingPath { kind: "label image", .. }));
    }

    #[test]
    fn test_read_label_image_encodings() {
        let dir = tempfile::tempdir().unwrap();
        let color = dir.path().join("color-label.png");
        let pixels = array![[[255u8, 255, 255], [255, 0, 0]]];
        write_rgb_image(&color, &pixels.view()).unwrap();
        assert_eq!(read_label_image(&color).unwrap(), LabelImage::Color(pixels));

        let index = dir.path().join("index-label.png");
        image::GrayImage::from_raw(2, 1, vec![3, 0]).unwrap().save(&index).unwrap();
        assert_eq!(read_label_image(&index).unwrap(), LabelImage::Index(array![[3, 0]]));
    }

    #[test]
    fn test_missing_rgb_image() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_rgb_image(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, EvalError::MissingPath { kind: "image", .. }));
    }
}
