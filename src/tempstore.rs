//! RAII lifecycle for the `<output>.tmpStore` scratch directory kept
//! alongside the `.frg` output for the duration of a run. A clean run
//! removes it; a panic or an early error return leaves it on disk for
//! postmortem inspection.

use std::fs;
use std::path::{Path, PathBuf};

/// Creates `<output>.tmpStore` on construction. Only removes it on drop if
/// [`TempStoreGuard::finish_successfully`] was called first — an aborted run
/// leaves the directory behind.
pub struct TempStoreGuard {
    path: PathBuf,
    succeeded: bool,
}

impl TempStoreGuard {
    /// Derive the scratch directory path from the final output path and
    /// create it.
    pub fn new(output: &Path) -> std::io::Result<Self> {
        let mut name = output.as_os_str().to_owned();
        name.push(".tmpStore");
        let path = PathBuf::from(name);
        fs::create_dir_all(&path)?;
        Ok(Self {
            path,
            succeeded: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mark the run as having completed successfully, so `Drop` cleans up
    /// the scratch directory.
    pub fn finish_successfully(&mut self) {
        self.succeeded = true;
    }
}

impl Drop for TempStoreGuard {
    fn drop(&mut self) {
        if self.succeeded {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
