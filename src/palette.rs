//! # palette
//!
//! Bidirectional mapping between per-class display colors and class indices.

use std::collections::{HashMap, HashSet};

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Dense per-pixel class indices, shape (height, width).
pub type LabelMap = Array2<usize>;

/// Ordered class colors. Entry `i` is the RGB color of class `i`; class 0 is the background.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[u8; 3]>", into = "Vec<[u8; 3]>")]
pub struct ClassPalette {
    colors: Vec<[u8; 3]>,
}

impl ClassPalette {
    /// Build a palette, rejecting colors shared by two classes.
    pub fn new(colors: Vec<[u8; 3]>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(colors.len());
        for color in &colors {
            if !seen.insert(Self::color_key(*color)) {
                return Err(EvalError::DuplicateColor(*color));
            }
        }
        Ok(Self { colors })
    }

    /// Composite integer of an RGB triple: `r + 256 * g + 256^2 * b`.
    /// Both palette entries and image pixels go through this function.
    #[inline]
    pub fn color_key(rgb: [u8; 3]) -> u32 {
        rgb[0] as u32 + 256 * rgb[1] as u32 + 256 * 256 * rgb[2] as u32
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the palette holds no classes.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colors in class index order.
    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    /// Decode an (H,W,3) RGB label image into class indices.
    ///
    /// Pixels matching no palette color are background (index 0).
    pub fn decode(&self, label_image: &ArrayView3<u8>) -> Result<LabelMap> {
        let shape = label_image.shape();
        if shape[2] != 3 {
            return Err(EvalError::ShapeMismatch {
                expected: vec![shape[0], shape[1], 3],
                found: shape.to_vec(),
            });
        }
        let key_to_index: HashMap<u32, usize> = self
            .colors
            .iter()
            .enumerate()
            .map(|(i, color)| (Self::color_key(*color), i))
            .collect();

        let mut label_index = LabelMap::zeros((shape[0], shape[1]));
        for ((row, col), label) in label_index.indexed_iter_mut() {
            let pixel = label_image.slice(ndarray::s![row, col, ..]);
            let key = Self::color_key([pixel[0], pixel[1], pixel[2]]);
            if let Some(index) = key_to_index.get(&key) {
                *label = *index;
            }
        }
        Ok(label_index)
    }

    /// Encode class indices into an (H,W,3) RGB image for visualization.
    /// Labels without a palette entry are drawn black.
    pub fn encode(&self, labels: &ArrayView2<usize>) -> Array3<u8> {
        let (height, width) = labels.dim();
        let mut image = Array3::<u8>::zeros((height, width, 3));
        for (mut pixel, label) in image
            .lanes_mut(Axis(2))
            .into_iter()
            .zip(labels.iter())
        {
            if let Some(color) = self.colors.get(*label) {
                pixel.assign(&ndarray::aview1(color));
            }
        }
        image
    }
}

impl TryFrom<Vec<[u8; 3]>> for ClassPalette {
    type Error = EvalError;

    fn try_from(colors: Vec<[u8; 3]>) -> Result<Self> {
        Self::new(colors)
    }
}

impl From<ClassPalette> for Vec<[u8; 3]> {
    fn from(palette: ClassPalette) -> Self {
        palette.colors
    }
}
