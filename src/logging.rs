//! Tracing setup for the `chi-form` binary.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "chi_form=info";

pub struct LogConfig {
    /// Interactive mode owns the terminal, so events go to a file instead.
    pub tui_mode: bool,
}

/// Log file path: `CHI_FORM_LOG_FILE`, or `chi-form.log` in the temp dir.
pub fn log_file_path() -> PathBuf {
    std::env::var("CHI_FORM_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("chi-form.log"))
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env("CHI_FORM_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

pub fn init_logging(config: LogConfig) -> Result<()> {
    if config.tui_mode {
        let path = log_file_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .map_err(|e| anyhow::anyhow!("initializing logging: {e}"))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("initializing logging: {e}"))?;
    }
    Ok(())
}
