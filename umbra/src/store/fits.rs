//! FITS-backed store using `fitsio` (cfitsio).

use std::path::{Path, PathBuf};

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;

use common::buffer2::Buffer2;
use common::file_utils;

use super::{FrameStore, StoreError};
use crate::image_buffer::{HeaderValue, ImageBuffer, Metadata};

/// Header keys read on load. Other keys are ignored.
pub const HEADER_KEYS: &[&str] = &[
    "TARGET", "OBJECT", "IMAGETYP", "BAYERPAT", "FILTER", "INSTRUME", "DATE-OBS", "EXPTIME",
];

/// Keys stored as numbers rather than strings.
const NUMERIC_KEYS: &[&str] = &["EXPTIME"];

/// Longest keyword FITS allows without the HIERARCH convention.
const MAX_KEY_LEN: usize = 8;

/// Stores single-plane frames as float FITS images.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitsStore;

impl FitsStore {
    pub fn new() -> Self {
        Self
    }
}

fn invalid(path: &Path, reason: impl ToString) -> StoreError {
    StoreError::InvalidFormat {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn write_error(path: &Path, err: fitsio::errors::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source: std::io::Error::other(err.to_string()),
    }
}

fn read_metadata(hdu: &FitsHdu, fptr: &mut FitsFile) -> Metadata {
    let mut metadata = Metadata::new();
    for &key in HEADER_KEYS {
        let value = if NUMERIC_KEYS.contains(&key) {
            hdu.read_key::<f64>(fptr, key).ok().map(HeaderValue::Float)
        } else {
            hdu.read_key::<String>(fptr, key)
                .ok()
                .map(|s| HeaderValue::Str(s.trim().to_string()))
        };
        if let Some(value) = value {
            metadata.insert(key.to_string(), value);
        }
    }
    metadata
}

impl FrameStore for FitsStore {
    fn load(&self, path: &Path) -> Result<ImageBuffer, StoreError> {
        if !path.is_file() {
            return Err(StoreError::NotFound {
                path: path.display().to_string(),
            });
        }

        let mut fptr = FitsFile::open(path).map_err(|e| invalid(path, e))?;
        let hdu = fptr.primary_hdu().map_err(|e| invalid(path, e))?;

        // Shape is [NAXIS2, NAXIS1] = [height, width].
        let (height, width) = match &hdu.info {
            HduInfo::ImageInfo { shape, .. } if shape.len() == 2 => (shape[0], shape[1]),
            HduInfo::ImageInfo { shape, .. } => {
                return Err(invalid(
                    path,
                    format!("expected a 2D image, got {} axes", shape.len()),
                ));
            }
            _ => return Err(invalid(path, "primary HDU is not an image")),
        };

        let mut pixels: Vec<f32> = hdu.read_image(&mut fptr).map_err(|e| invalid(path, e))?;
        if pixels.len() != width * height {
            return Err(invalid(
                path,
                format!("{} pixels for a {width}x{height} image", pixels.len()),
            ));
        }

        let mut replaced = 0usize;
        for p in pixels.iter_mut().filter(|p| !p.is_finite()) {
            *p = 0.0;
            replaced += 1;
        }
        if replaced > 0 {
            tracing::warn!(path = %path.display(), replaced, "Replaced non-finite pixels with 0");
        }

        let metadata = read_metadata(&hdu, &mut fptr);
        tracing::debug!(path = %path.display(), width, height, "Loaded FITS frame");

        Ok(ImageBuffer::new(
            Buffer2::new(width, height, pixels),
            file_utils::file_stem_string(path),
        )
        .with_metadata(metadata))
    }

    fn persist(&self, frame: &ImageBuffer, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        // cfitsio refuses to overwrite.
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| StoreError::io(path, e))?;
        }

        let description = ImageDescription {
            data_type: ImageType::Float,
            dimensions: &[frame.height(), frame.width()],
        };
        let mut fptr = FitsFile::create(path)
            .with_custom_primary(&description)
            .open()
            .map_err(|e| write_error(path, e))?;
        let hdu = fptr.primary_hdu().map_err(|e| write_error(path, e))?;
        hdu.write_image(&mut fptr, frame.pixels())
            .map_err(|e| write_error(path, e))?;

        let mut keys: Vec<(&String, &HeaderValue)> = frame.metadata.iter().collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in keys {
            if key.len() > MAX_KEY_LEN {
                tracing::debug!(key, "Header key too long for FITS, not written");
                continue;
            }
            let written = match value {
                HeaderValue::Str(s) => hdu.write_key(&mut fptr, key, s.as_str()),
                HeaderValue::Int(v) => hdu.write_key(&mut fptr, key, *v),
                HeaderValue::Float(v) => hdu.write_key(&mut fptr, key, *v),
                HeaderValue::Bool(v) => hdu.write_key(&mut fptr, key, if *v { "T" } else { "F" }),
            };
            written.map_err(|e| write_error(path, e))?;
        }

        tracing::debug!(path = %path.display(), origin = %frame.origin, "Persisted FITS frame");
        Ok(())
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        file_utils::fits_files(dir).map_err(|e| StoreError::io(dir, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::{FrameKind, BAYER_PATTERN_KEY};
    use common::test_utils::test_output_path;

    #[test]
    fn test_persist_then_load() {
        let dir = test_output_path("fits_store_round_trip");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("flat_001.fits");

        let frame = ImageBuffer::from_fn(5, 3, "flat_001", |x, y| (x * 10 + y) as f32 + 0.5)
            .with_header("IMAGETYP", "flat")
            .with_header(BAYER_PATTERN_KEY, "RGGB")
            .with_header("EXPTIME", 2.5);
        let store = FitsStore::new();
        store.persist(&frame, &path).unwrap();
        // overwrite is allowed
        store.persist(&frame, &path).unwrap();

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.origin, "flat_001");
        assert_eq!(loaded.shape(), frame.shape());
        assert_eq!(loaded.pixels(), frame.pixels());
        assert_eq!(loaded.frame_kind(), Some(FrameKind::Flat));
        assert_eq!(
            loaded.header("EXPTIME").and_then(HeaderValue::as_f64),
            Some(2.5)
        );

        let listed = store.list(&dir).unwrap();
        assert_eq!(listed, vec![path]);
    }

    #[test]
    fn test_missing_file() {
        let err = FitsStore::new()
            .load(Path::new("/definitely/not/here.fits"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_not_a_fits_file() {
        let path = test_output_path("not_fits.fits");
        std::fs::write(&path, b"plain text").unwrap();
        let err = FitsStore::new().load(&path).unwrap_err();
        assert!(matches!(err, StoreError::InvalidFormat { .. }));
    }
}
