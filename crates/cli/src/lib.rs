// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! obctl - command-line front end for the outbound delivery pipeline.
//!
//! Each invocation opens the pipeline described by the settings file, runs
//! one action, waits a bounded time for the queue to drain, and exits.
//! Anything still queued is delivered by the next invocation.

mod cli;
mod commands;

pub mod error;
pub mod settings;

pub use cli::{Cli, Command};
pub use error::{Error, Result};
pub use settings::Settings;

use std::time::Duration;

/// Execute a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref())?;
    tracing::debug!(data_dir = %settings.data_dir.display(), "settings loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(commands::execute(
        &settings,
        cli.command,
        Duration::from_secs(cli.wait_secs),
    ))
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
