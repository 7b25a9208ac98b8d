//! File listing helpers for frame directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Recognised FITS file extensions.
pub const FITS_EXTENSIONS: &[&str] = &["fit", "fits", "fts"];

/// Paths of all regular files in `dir` whose extension is in `extensions`,
/// matched case-insensitively and sorted by path.
///
/// A missing directory is an error, not an empty listing.
pub fn files_with_extensions(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if extensions.contains(&ext.as_str()) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Paths of all FITS files in `dir`, sorted.
pub fn fits_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    files_with_extensions(dir, FITS_EXTENSIONS)
}

/// File stem of `path` as an owned string, or an empty string.
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}
