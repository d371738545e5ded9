//! Typed errors for the scan and clipboard boundaries.
//!
//! Orchestration code works in `anyhow::Result` and converts these with `?`.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a directory scan produced no tree.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The scan root is missing or is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The scan root could not be listed
    #[error("Cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// More candidate files than the configured cap
    #[error(
        "The selected directory contains over {limit} files. \
         Please select a smaller, more specific project folder."
    )]
    TooManyFiles { limit: usize },
}

/// Copying to the system clipboard failed. In-memory state is unaffected.
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Could not copy to clipboard: content too large or inaccessible ({0})")]
    Unavailable(String),
}

impl From<io::Error> for ClipboardError {
    fn from(err: io::Error) -> Self {
        ClipboardError::Unavailable(err.to_string())
    }
}

impl From<arboard::Error> for ClipboardError {
    fn from(err: arboard::Error) -> Self {
        ClipboardError::Unavailable(err.to_string())
    }
}
