use crate::file_scanner::{DEFAULT_MAX_FILES, ScanOptions};
use clap::Parser;
use std::path::PathBuf;

/// codeprompt – pick files from a tree and copy them as one LLM prompt
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Root to scan (defaults to CWD)
    #[arg(value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Include files ignored by .gitignore
    #[arg(long)]
    pub include_ignored: bool,

    /// Glob patterns to preselect files (e.g., "src/**/*.rs", "tests/test_*.py").
    /// Paths are relative to the root directory.
    /// Can be specified multiple times using --preselect <PATTERN_1> --preselect <PATTERN_2> ...
    #[arg(long, value_name = "PATTERN")]
    pub preselect: Vec<String>,

    /// Run in headless mode: select files based on --preselect and exit without TUI.
    #[arg(long, requires = "preselect")]
    pub headless: bool,

    /// Write the document to stdout instead of the clipboard (headless mode).
    #[arg(long, requires = "headless")]
    pub print: bool,

    /// Abort the scan when the tree holds more candidate files than this.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_FILES)]
    pub max_files: usize,

    /// Write logs to this file (RUST_LOG controls the level).
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            include_ignored: self.include_ignored,
            max_files: self.max_files,
        }
    }
}
