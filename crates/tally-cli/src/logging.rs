// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::APP_NAME;

pub fn default_log_dir() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("TALLY_LOG_DIR") {
        return Ok(PathBuf::from(path));
    }
    let data_root = dirs::data_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set TALLY_LOG_DIR to a writable directory")
    })?;
    Ok(data_root.join(APP_NAME).join("logs"))
}

/// `RUST_LOG` wins; otherwise `[log].level` applies to every tally crate.
pub fn env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).with_context(|| format!("invalid [log].level {level:?}"))
}

/// Logs go to a daily file because the console owns the terminal. Keep the
/// guard alive until exit so buffered lines are flushed.
pub fn init(level: &str, dir: &Path) -> Result<WorkerGuard> {
    let filter = env_filter(level)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(dir, APP_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .context("install log subscriber")?;
    Ok(guard)
}
