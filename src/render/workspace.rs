//! Scratch directories that must not outlive a render.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Removes its directories when dropped, on every exit path.
///
/// Removal failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct ScratchGuard {
    dirs: Vec<PathBuf>,
}

impl ScratchGuard {
    /// Take ownership of `dirs`, clearing leftovers from an interrupted run.
    pub fn acquire(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        let guard = Self {
            dirs: dirs.into_iter().collect(),
        };
        guard.clear();
        guard
    }

    fn clear(&self) {
        for dir in &self.dirs {
            remove_dir(dir);
        }
    }
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        self.clear();
    }
}

fn remove_dir(dir: &Path) {
    if !dir.exists() {
        return;
    }
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!("Removed scratch directory {:?}", dir),
        Err(e) => warn!("Failed to remove scratch directory {:?}: {}", dir, e),
    }
}

/// Recursively search `dir` for a file named `file_name`.
pub fn find_file(dir: &Path, file_name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry.file_name().to_string_lossy() == file_name {
            return Some(path);
        }
    }

    subdirs.iter().find_map(|sub| find_file(sub, file_name))
}

/// Move a file, copying when a rename across filesystems is refused.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}
