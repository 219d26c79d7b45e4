// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `config.json` in the data directory.

use std::path::Path;

use portico_core::config::ShellConfig;
use portico_core::error::Result;
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

/// Load the stored configuration. A missing file is written out with the
/// defaults so it can be edited; an unreadable one falls back to defaults.
pub fn load_or_init(data_dir: &Path) -> ShellConfig {
    let path = data_dir.join(CONFIG_FILE);
    match std::fs::read_to_string(&path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(config) => {
                info!(path = %path.display(), "configuration loaded");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid configuration; using defaults");
                ShellConfig::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let config = ShellConfig::default();
            if let Err(e) = persist_config(data_dir, &config) {
                warn!(path = %path.display(), error = %e, "could not write default configuration");
            }
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read configuration; using defaults");
            ShellConfig::default()
        }
    }
}

pub fn persist_config(data_dir: &Path, config: &ShellConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
