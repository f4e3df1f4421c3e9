//! # linemod_eval
//!
//! Segmentation and 6-DoF pose evaluation on the LINEMOD dataset.

#![warn(missing_docs)]

pub mod constants;
pub mod dataloader;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod geometry;
pub mod io;
pub mod palette;
pub mod path;
pub mod report;
pub mod structures;

pub use error::{EvalError, Result};
