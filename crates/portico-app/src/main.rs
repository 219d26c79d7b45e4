// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Portico: web shell capability bridge
//
// Entry point. Initialises logging, loads the shell configuration, wires the
// router to the lifecycle coordinator and drives it from stdin. Logs go to
// stderr; stdout carries only protocol lines.

mod host;
mod services;

use std::sync::{Arc, Mutex};

use portico_runtime::{BridgeRouter, LifecycleCoordinator};
use tokio::io::BufReader;

use host::{Host, SharedOutput};
use services::{config_store, data_dir};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Portico starting");

    let dir = data_dir::data_dir();
    let config = config_store::load_or_init(&dir);
    tracing::info!(path = %dir.display(), "data directory ready");

    let lifecycle = LifecycleCoordinator::spawn(config.max_queued_outcomes);
    let router = BridgeRouter::new(
        portico_bridge::platform_bridge(),
        lifecycle.proxy(),
        config,
        data_dir::data_subdir("cache"),
    );
    tracing::info!(platform = router.platform_name(), "bridge ready");

    let out: SharedOutput = Arc::new(Mutex::new(std::io::stdout()));
    let mut host = Host::new(router, lifecycle, out);
    if let Err(e) = host.run(BufReader::new(tokio::io::stdin())).await {
        tracing::error!(error = %e, "stdin read failed");
        std::process::exit(1);
    }

    tracing::info!("Portico stopped");
}
