use crate::session::{ScanOutcome, Session};
use crate::{cli, clipboard, file_scanner, tui};
use anyhow::{Context, Result, bail};
use glob::Pattern;
use std::path::PathBuf;
use tracing::info;

/// Resolve the scan root; canonical when possible so documents carry a real
/// directory name even for `.`.
fn determine_scan_root(cli_args: &cli::Cli) -> PathBuf {
    cli_args
        .root
        .canonicalize()
        .unwrap_or_else(|_| cli_args.root.clone())
}

// Compile --preselect strings; any invalid pattern is a hard error.
fn compile_preselect_patterns(raw: &[String]) -> Result<Vec<Pattern>> {
    raw.iter()
        .map(|s| Pattern::new(s).with_context(|| format!("invalid --preselect pattern '{}'", s)))
        .collect()
}

// Scan, preselect, load and emit the document without a TUI.
fn run_headless_mode(
    cli_args: &cli::Cli,
    scan_root: PathBuf,
    patterns: &[Pattern],
) -> Result<()> {
    let mut session = Session::new();
    let ticket = session.begin_scan(scan_root);
    let result = file_scanner::scan_tree(&ticket.root, &cli_args.scan_options());
    match session.finish_scan(ticket.generation, result) {
        ScanOutcome::Loaded { files } => info!(files, "headless scan loaded"),
        ScanOutcome::Failed(msg) => bail!(msg),
        ScanOutcome::Stale => bail!("scan result was discarded"),
    }

    let matched = session.preselect(patterns);
    if matched == 0 {
        bail!("No files matched the --preselect patterns.");
    }
    session.aggregate_now();

    perform_final_action(&session, cli_args.print)
}

// Print or copy the finished document and report the metrics.
fn perform_final_action(session: &Session, print_only: bool) -> Result<()> {
    let document = session.document();
    let (count, tokens) = session
        .metrics()
        .map(|m| (m.file_count, m.estimated_tokens))
        .unwrap_or((0, 0));

    if print_only {
        println!("{}", document);
        eprintln!("({} files, ≈ {} tokens)", count, tokens);
    } else {
        clipboard::copy_text_to_clipboard(document)?;
        println!(
            "✅ Copied {} files (≈ {} tokens) to the clipboard.",
            count, tokens
        );
    }
    Ok(())
}

// Main orchestrator: headless pipeline or interactive TUI.
pub fn run_codeprompt(cli_args: cli::Cli) -> Result<()> {
    let scan_root = determine_scan_root(&cli_args);
    let patterns = compile_preselect_patterns(&cli_args.preselect)?;

    if cli_args.headless {
        run_headless_mode(&cli_args, scan_root, &patterns)
    } else {
        tui::run_tui(scan_root, cli_args.scan_options(), patterns)
    }
}
