// Dweve Parka - Typed Command Server
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Request-scoped temporary files.
//!
//! Every file written while ingesting a file-backed parameter is registered
//! with the request's [`TempFileManager`]. [`TempFileManager::close`] deletes
//! them all and reports failures; it is idempotent and also runs on drop.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Outcome of a cleanup pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CleanupReport {
    /// Number of files removed.
    pub removed: usize,
    /// Paths that could not be removed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    /// True when every registered file was removed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Tracks temp files for one request.
#[derive(Debug, Default)]
pub struct TempFileManager {
    dir: Option<PathBuf>,
    paths: Mutex<Vec<PathBuf>>,
}

impl TempFileManager {
    /// Manager writing into the system temp directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager writing into `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            paths: Mutex::new(Vec::new()),
        }
    }

    /// Write `bytes` to a new temp file and register it.
    ///
    /// The file keeps the extension of `filename_hint` so that format
    /// sniffing still works on the materialized path.
    pub fn create(&self, filename_hint: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let suffix = Path::new(filename_hint)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let mut builder = tempfile::Builder::new();
        builder.prefix("parka-").suffix(&suffix);
        let mut file = match &self.dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(bytes)?;
        file.flush()?;

        let path = file.into_temp_path().keep().map_err(|e| e.error)?;
        debug!(path = %path.display(), bytes = bytes.len(), "created temp file");
        self.register(path.clone());
        Ok(path)
    }

    /// Register an externally created path for deletion.
    pub fn register(&self, path: PathBuf) {
        self.lock().push(path);
    }

    /// Currently registered paths.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Delete every registered file.
    ///
    /// Failures are logged and collected; a path that is already gone counts
    /// as removed.
    pub fn close(&self) -> CleanupReport {
        let paths: Vec<PathBuf> = std::mem::take(&mut *self.lock());
        let mut report = CleanupReport::default();
        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => report.removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to remove temp file");
                    report.failures.push((path, e.to_string()));
                }
            }
        }
        if report.removed > 0 {
            debug!(removed = report.removed, "temp files cleaned up");
        }
        report
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.paths.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TempFileManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::in_dir(dir.path());

        let a = manager.create("config.yaml", b"a: 1").unwrap();
        let b = manager.create("notes", b"hello").unwrap();
        assert!(a.exists());
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("yaml"));
        assert_eq!(std::fs::read(&b).unwrap(), b"hello");
        assert_eq!(manager.len(), 2);

        let report = manager.close();
        assert!(report.is_clean());
        assert_eq!(report.removed, 2);
        assert!(!a.exists());
        assert!(!b.exists());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::in_dir(dir.path());
        manager.create("x.json", b"{}").unwrap();
        assert_eq!(manager.close().removed, 1);
        assert_eq!(manager.close().removed, 0);
    }

    #[test]
    fn test_drop_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = {
            let manager = TempFileManager::in_dir(dir.path());
            manager.create("x.json", b"{}").unwrap()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TempFileManager::in_dir(dir.path());
        // A directory cannot be removed with remove_file.
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        manager.register(sub.clone());

        let report = manager.close();
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].0, sub);
    }
}
