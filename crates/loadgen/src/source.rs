//! Source-file discovery and the per-delivery sampling policy.

use std::io;
use std::path::{Path, PathBuf};

use rand::RngExt;

/// List the regular files directly inside `dir`, sorted by path.
pub fn list_source_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Pick one file uniformly at random. No state is kept between calls, so the
/// same file may be picked repeatedly.
///
/// Returns `None` only for an empty list.
pub fn pick(files: &[PathBuf]) -> Option<&Path> {
    if files.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..files.len());
    Some(files[index].as_path())
}
