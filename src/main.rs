mod cli;
mod clipboard;
mod content_loader;
mod error;
mod file_scanner;
mod logging;
mod path_index;
mod prompt;
mod selection;
mod session;
mod tree_builder;
mod tree_model;
mod tui;
mod utils;
mod worker;
mod workflow;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    // The clipboard daemon is a re-exec of this binary; it must not parse the CLI.
    if clipboard::check_and_run_daemon_if_requested()? {
        return Ok(());
    }

    let cli_args = cli::Cli::parse();
    logging::init(cli_args.log_file.as_deref(), !cli_args.headless)?;

    workflow::run_codeprompt(cli_args)
}
