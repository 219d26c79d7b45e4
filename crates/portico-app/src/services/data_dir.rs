// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-aware data directory resolution.

use std::path::{Path, PathBuf};

use tracing::warn;

/// Return the application data directory, creating it if needed.
///
/// On desktop this uses a conventional location. Mobile hosts pass their
/// own files directory to the router instead.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join("portico");
    ensure(&dir);
    dir
}

/// Return a subdirectory inside the data dir (e.g. "cache").
pub fn data_subdir(name: &str) -> PathBuf {
    let dir = data_dir().join(name);
    ensure(&dir);
    dir
}

fn ensure(dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(path = %dir.display(), error = %e, "could not create directory");
    }
}

fn base_dir() -> PathBuf {
    // XDG data dir, then the home fallback
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
