//! # evaluate_linemod
//!
//! Scores a directory of per-sample predictions against a LINEMOD image set.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use linemod_eval::{
    constants::TEST_IMAGE_SET,
    dataloader::AnnotationCache,
    dataset::LinemodDataset,
    evaluation::eval::{DatasetEvaluator, EvaluationCfg},
    structures::segmentation::SegmentationResult,
};

#[macro_use]
extern crate log;

#[derive(Parser, Debug)]
#[command(about = "Evaluate LINEMOD segmentations and poses")]
struct Args {
    /// LINEMOD root containing `data/`, `models/` and `indexes/`.
    #[arg(long)]
    root: PathBuf,
    /// Object class, e.g. `ape`.
    #[arg(long)]
    class: String,
    /// Image set to evaluate.
    #[arg(long, default_value = TEST_IMAGE_SET)]
    image_set: String,
    /// Directory of the annotation cache.
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,
    /// Directory of `%04d.json` predictions, one per image set entry.
    #[arg(long)]
    predictions: PathBuf,
    /// Output directory of the reports.
    #[arg(long)]
    output: PathBuf,
    /// Also score refined and ICP poses.
    #[arg(long)]
    pose_refine: bool,
    /// Skip pose evaluation.
    #[arg(long)]
    no_pose: bool,
    /// Write color-coded predicted labels.
    #[arg(long)]
    save_images: bool,
}

/// Script entrypoint.
pub fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let dataset = LinemodDataset::new(&args.root, &args.class, &args.image_set)
        .with_context(|| format!("cannot open LINEMOD dataset at {}", args.root.display()))?;
    let records = dataset.gt_roidb(&AnnotationCache::new(&args.cache_dir))?;

    let segmentations = (0..records.len())
        .map(|i| {
            let path = args.predictions.join(format!("{i:04}.json"));
            SegmentationResult::from_json(&path)
                .with_context(|| format!("cannot read prediction {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let cfg = EvaluationCfg {
        pose_regression: !args.no_pose,
        pose_refine: args.pose_refine,
        save_label_images: args.save_images,
        ..Default::default()
    };
    let mut evaluator = DatasetEvaluator::new(dataset.classes().to_vec(), cfg)?;

    let bar = ProgressBar::new(records.len() as u64);
    let report = evaluator.evaluate_with_progress(
        &dataset,
        &records,
        &segmentations,
        Some(args.output.as_path()),
        |_| bar.inc(1),
    )?;
    bar.finish();

    report.log_summary();
    report.write(&args.output)?;
    info!("evaluated {} samples of {}", records.len(), args.class);
    Ok(())
}
