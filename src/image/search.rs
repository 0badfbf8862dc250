//! Quality search.
//!
//! Every candidate quality is encoded into a temporary file beside the
//! destination. The smallest file strictly below the source size wins and is
//! persisted; every other temporary is removed when its guard drops, on
//! success and on every error path.

use super::{ImageError, QualityEncoder};
use crate::config::ImageConfig;
use crate::debug;
use image::RgbaImage;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Result of converting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub source: PathBuf,
    pub output: PathBuf,
    /// `None` when the source was already in the target format.
    pub quality: Option<u8>,
    pub original_size: u64,
    pub size: u64,
}

impl Conversion {
    pub fn saved_bytes(&self) -> u64 {
        self.original_size.saturating_sub(self.size)
    }
}

/// A candidate kept on disk until a smaller one replaces it.
struct Candidate {
    quality: u8,
    size: u64,
    file: NamedTempFile,
}

/// Encode `pixels` at each quality in order and persist the smallest result
/// below `original_size` to `dest`. Ties keep the earlier quality.
pub fn select_quality(
    encoder: &dyn QualityEncoder,
    pixels: &RgbaImage,
    original_size: u64,
    qualities: &[u8],
    dest: &Path,
) -> Result<(u8, u64), ImageError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut best: Option<Candidate> = None;
    for &quality in qualities {
        let bytes = encoder.encode(pixels, quality)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&bytes)?;
        file.flush()?;
        let size = file.as_file().metadata()?.len();
        debug!("convert"; "quality {} -> {} bytes", quality, size);

        if size >= original_size || best.as_ref().is_some_and(|b| size >= b.size) {
            continue;
        }
        // Replacing the previous best drops, and so deletes, its file.
        best = Some(Candidate { quality, size, file });
    }

    let best = best.ok_or(ImageError::NoSmallerCandidate {
        original: original_size,
    })?;
    best.file.persist(dest).map_err(|err| err.error)?;
    Ok((best.quality, best.size))
}

/// Output path for `source` under `encoder`.
fn output_path(source: &Path, encoder: &dyn QualityEncoder) -> PathBuf {
    source.with_extension(encoder.extension())
}

/// Convert `source` next to itself, trying `config.qualities` in order.
///
/// A source already in the target format comes back unchanged.
pub fn convert(
    source: &Path,
    config: &ImageConfig,
    encoder: &dyn QualityEncoder,
) -> Result<Conversion, ImageError> {
    if !source.is_file() {
        return Err(ImageError::MissingSource(source.to_path_buf()));
    }
    let original_size = fs::metadata(source)?.len();

    let ext = source
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    if ext.eq_ignore_ascii_case(encoder.extension()) {
        return Ok(Conversion {
            source: source.to_path_buf(),
            output: source.to_path_buf(),
            quality: None,
            original_size,
            size: original_size,
        });
    }
    if !config.accepts(ext) {
        return Err(ImageError::Unsupported(source.to_path_buf()));
    }

    let pixels = image::open(source)
        .map_err(|err| ImageError::Decode {
            path: source.to_path_buf(),
            source: err,
        })?
        .to_rgba8();

    let output = output_path(source, encoder);
    let (quality, size) = select_quality(encoder, &pixels, original_size, &config.qualities, &output)?;

    Ok(Conversion {
        source: source.to_path_buf(),
        output,
        quality: Some(quality),
        original_size,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use rustc_hash::FxHashMap;
    use tempfile::TempDir;

    /// Produces a file of a fixed size per quality.
    struct FixedSizes(FxHashMap<u8, usize>);

    impl FixedSizes {
        fn new(pairs: &[(u8, usize)]) -> Self {
            Self(pairs.iter().copied().collect())
        }
    }

    impl QualityEncoder for FixedSizes {
        fn extension(&self) -> &'static str {
            "avif"
        }

        fn encode(&self, _pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError> {
            let size = self.0.get(&quality).copied().ok_or(ImageError::Encode {
                quality,
                message: "no size configured".into(),
            })?;
            Ok(vec![0; size])
        }
    }

    const QUALITIES: [u8; 5] = [70, 60, 80, 50, 90];

    fn pixels() -> RgbaImage {
        RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]))
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_smallest_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("photo.avif");
        let encoder = FixedSizes::new(&[(70, 9000), (60, 9500), (80, 8000), (50, 12000), (90, 7000)]);

        let (quality, size) = select_quality(&encoder, &pixels(), 10_000, &QUALITIES, &dest).unwrap();
        assert_eq!((quality, size), (90, 7000));
        assert_eq!(fs::metadata(&dest).unwrap().len(), 7000);
        assert_eq!(dir_entries(dir.path()), ["photo.avif"]);
    }

    #[test]
    fn test_no_smaller_candidate_fails_clean() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("photo.avif");
        let encoder = FixedSizes::new(&[(70, 10_000), (60, 10_500), (80, 12_000), (50, 11_000), (90, 15_000)]);

        let err = select_quality(&encoder, &pixels(), 10_000, &QUALITIES, &dest).unwrap_err();
        assert!(matches!(err, ImageError::NoSmallerCandidate { original: 10_000 }));
        assert!(!dest.exists());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_encoder_error_removes_temporaries() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("photo.avif");
        // 50 has no size, so the search stops after three candidates.
        let encoder = FixedSizes::new(&[(70, 900), (60, 800), (80, 700)]);

        let err = select_quality(&encoder, &pixels(), 10_000, &QUALITIES, &dest).unwrap_err();
        assert!(matches!(err, ImageError::Encode { quality: 50, .. }));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_tie_keeps_first_quality() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("x.avif");
        let encoder = FixedSizes::new(&[(70, 500), (60, 500)]);
        let (quality, _) = select_quality(&encoder, &pixels(), 1000, &[70, 60], &dest).unwrap();
        assert_eq!(quality, 70);
    }

    #[test]
    fn test_convert_png() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.png");
        RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255]))
            .save(&source)
            .unwrap();
        // Pad the source so every candidate is smaller.
        let mut bytes = fs::read(&source).unwrap();
        bytes.resize(50_000, 0);
        fs::write(&source, &bytes).unwrap();

        let encoder = FixedSizes::new(&[(70, 900), (60, 950), (80, 800), (50, 1200), (90, 700)]);
        let conversion = convert(&source, &ImageConfig::default(), &encoder).unwrap();
        assert_eq!(conversion.output, dir.path().join("photo.avif"));
        assert_eq!(conversion.quality, Some(90));
        assert_eq!(conversion.saved_bytes(), 50_000 - 700);
        assert_eq!(dir_entries(dir.path()), ["photo.avif", "photo.png"]);
    }

    #[test]
    fn test_avif_source_returned_unchanged() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("hero.avif");
        fs::write(&source, b"avif").unwrap();

        let encoder = FixedSizes::new(&[]);
        let conversion = convert(&source, &ImageConfig::default(), &encoder).unwrap();
        assert_eq!(conversion.output, source);
        assert_eq!(conversion.quality, None);
    }

    #[test]
    fn test_rejected_sources() {
        let dir = TempDir::new().unwrap();
        let encoder = FixedSizes::new(&[]);
        let config = ImageConfig::default();

        let gif = dir.path().join("anim.gif");
        fs::write(&gif, b"GIF89a").unwrap();
        assert!(matches!(convert(&gif, &config, &encoder), Err(ImageError::Unsupported(_))));

        let missing = dir.path().join("missing.jpg");
        assert!(matches!(
            convert(&missing, &config, &encoder),
            Err(ImageError::MissingSource(_))
        ));
    }
}
