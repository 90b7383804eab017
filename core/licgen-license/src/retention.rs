//! Retention of issued license files.
//!
//! Only the most recently modified `.lic` files of a directory are kept;
//! older ones are deleted on a best-effort basis.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::LicenseResult;

/// File extension of license packet files.
pub const LICENSE_EXTENSION: &str = "lic";

/// Number of license files kept by default.
pub const DEFAULT_KEEP: usize = 5;

/// How many license files survive a prune.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub keep: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { keep: DEFAULT_KEEP }
    }
}

impl RetentionPolicy {
    #[must_use]
    pub const fn new(keep: usize) -> Self {
        Self { keep }
    }

    /// Deletes all but the `keep` most recently modified license files in
    /// `dir` and returns the paths that were removed.
    ///
    /// Failures are logged and skipped; this never fails the caller.
    pub fn prune(&self, dir: &Path) -> Vec<PathBuf> {
        let files = match list_license_files(dir) {
            Ok(files) => files,
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Failed to list license files for retention"
                );
                return Vec::new();
            }
        };

        let mut removed = Vec::new();
        for path in files.into_iter().skip(self.keep) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(path = %path.display(), "Removed old license file");
                    removed.push(path);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove old license file");
                }
            }
        }
        removed
    }
}

/// Lists the `.lic` files in `dir`, most recently modified first.
///
/// A missing directory yields an empty list.
pub fn list_license_files(dir: &Path) -> LicenseResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !is_license_file(&path) {
            continue;
        }
        // Entries can disappear between read_dir and stat.
        let Ok(metadata) = entry.metadata() else {
            debug!(path = %path.display(), "Skipping unreadable license file");
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        files.push((metadata.modified()?, path));
    }

    files.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn is_license_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == LICENSE_EXTENSION)
}
