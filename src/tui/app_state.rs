#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub(super) enum AppMode {
    Normal,
    Filtering,
}

/// Modal box drawn over the main layout; any key dismisses it.
#[derive(PartialEq, Eq, Debug, Clone)]
pub(super) enum Popup {
    Help,
    Error(String),
}

pub(super) const HELP_TEXT: &str = "\
1. The directory given on the command line is scanned on start (r: rescan).
2. Check/uncheck files and directories on the left (Space/Enter).
   A partially checked directory [-] becomes fully checked on the next press.
3. The generated prompt appears on the right (PgUp/PgDn to scroll).
4. Press y to copy it to the clipboard.

This tool creates a single text block from your codebase,
ready to paste into a Large Language Model.";
