//! Image conversion.
//!
//! # Modules
//!
//! - [`encoder`]: quality-driven encoders (AVIF via `ravif`)
//! - [`search`]: try each quality, keep the smallest result below the source

pub mod encoder;
pub mod search;

pub use encoder::{AvifEncoder, QualityEncoder};
pub use search::{Conversion, convert, select_quality};

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions treated as images when scanning directories.
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("source image not found: {0}")]
    MissingSource(PathBuf),

    #[error("unsupported image type: {0}")]
    Unsupported(PathBuf),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("encoder failed at quality {quality}: {message}")]
    Encode { quality: u8, message: String },

    #[error("no quality produced a file smaller than the original ({original} bytes)")]
    NoSmallerCandidate { original: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Whether `path` has a raster image extension (case-insensitive).
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}
