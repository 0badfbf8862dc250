//! `convert`: batch AVIF conversion.

use super::ConvertArgs;
use crate::config::{ImageConfig, PerfConfig};
use crate::image::{AvifEncoder, Conversion, ImageError, QualityEncoder, convert, is_image_file};
use crate::logger::ProgressLine;
use crate::utils::size::{format_bytes, savings_percent};
use crate::{debug, log};
use anyhow::{Result, bail};
use jwalk::WalkDir;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Totals across one batch.
#[derive(Debug, Default)]
struct Tally {
    converted: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    before: AtomicU64,
    after: AtomicU64,
}

impl Tally {
    fn record(&self, conversion: &Conversion) {
        self.converted.fetch_add(1, Ordering::Relaxed);
        self.before.fetch_add(conversion.original_size, Ordering::Relaxed);
        self.after.fetch_add(conversion.size, Ordering::Relaxed);
    }
}

/// Expand directories into the convertible files under them.
fn collect_files(paths: &[PathBuf], config: &ImageConfig) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = paths
        .iter()
        .flat_map(|path| -> Vec<PathBuf> {
            if path.is_dir() {
                WalkDir::new(path)
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_file())
                    .map(|e| e.path())
                    .filter(|p| is_image_file(p) && accepts(p, config))
                    .collect()
            } else {
                vec![path.clone()]
            }
        })
        .collect();
    files.sort();
    files.dedup();
    files
}

fn accepts(path: &Path, config: &ImageConfig) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| config.accepts(ext))
}

fn convert_one(
    path: &Path,
    config: &ImageConfig,
    encoder: &dyn QualityEncoder,
    replace: bool,
    tally: &Tally,
) {
    match convert(path, config, encoder) {
        Ok(conversion) if conversion.quality.is_none() => {
            debug!("convert"; "{} already {}", path.display(), encoder.extension());
            tally.skipped.fetch_add(1, Ordering::Relaxed);
        }
        Ok(conversion) => {
            debug!(
                "convert";
                "{} -> {} (quality {}, saved {:.1}%)",
                path.display(),
                conversion.output.display(),
                conversion.quality.unwrap_or_default(),
                savings_percent(conversion.original_size, conversion.size)
            );
            tally.record(&conversion);
            if replace && let Err(err) = fs::remove_file(path) {
                log!("error"; "failed to remove {}: {}", path.display(), err);
            }
        }
        Err(ImageError::NoSmallerCandidate { .. }) => {
            debug!("convert"; "{} kept, no smaller encoding", path.display());
            tally.skipped.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            log!("error"; "{}: {}", path.display(), err);
            tally.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

pub fn convert_images(args: &ConvertArgs, config: &PerfConfig) -> Result<()> {
    let files = collect_files(&args.paths, &config.image);
    if files.is_empty() {
        log!("convert"; "no images found");
        return Ok(());
    }

    let encoder = AvifEncoder::new(config.image.speed);
    let tally = Tally::default();
    let progress = ProgressLine::new("convert", &[("images", files.len())]);

    files.par_iter().for_each(|path| {
        convert_one(path, &config.image, &encoder, args.replace, &tally);
        progress.inc("images");
    });
    progress.finish();

    let before = tally.before.load(Ordering::Relaxed);
    let after = tally.after.load(Ordering::Relaxed);
    log!(
        "convert";
        "converted {}, skipped {}, failed {}; {} -> {} ({:.1}% smaller)",
        tally.converted.load(Ordering::Relaxed),
        tally.skipped.load(Ordering::Relaxed),
        tally.failed.load(Ordering::Relaxed),
        format_bytes(i64::try_from(before).unwrap_or(i64::MAX)),
        format_bytes(i64::try_from(after).unwrap_or(i64::MAX)),
        savings_percent(before, after)
    );

    let failed = tally.failed.load(Ordering::Relaxed);
    if failed > 0 {
        bail!("{failed} image(s) failed to convert");
    }
    Ok(())
}
