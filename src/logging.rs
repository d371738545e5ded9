//! Tracing subscriber setup.
//!
//! The TUI owns the terminal, so interactive runs only log when a log file
//! is given. Headless runs fall back to stderr.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Returns whether one was installed.
pub fn init(log_file: Option<&Path>, interactive: bool) -> Result<bool> {
    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
                .with(env_filter())
                .try_init()
                .context("tracing subscriber already installed")?;
            Ok(true)
        }
        None if !interactive => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(env_filter())
                .try_init()
                .context("tracing subscriber already installed")?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_layer_writes_events() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let subscriber = tracing_subscriber::registry().with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file.reopen().unwrap())),
        );
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(files = 3, "scan finished");
        });
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("scan finished"));
        assert!(contents.contains("files=3"));
    }
}
