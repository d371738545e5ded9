use crate::content_loader::{AggregationJob, AggregationOutput, ContentCache};
use crate::error::ScanError;
use crate::path_index::NodeId;
use crate::prompt::EMPTY_SELECTION_PLACEHOLDER;
use crate::selection::{SelectionEngine, ToggleAction};
use crate::tree_model::TreeModel;
use crate::utils::{estimate_tokens, format_thousands};
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Handed to the scan worker; its `generation` identifies the result.
#[derive(Debug, Clone)]
pub struct ScanTicket {
    pub generation: u64,
    pub root: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Loaded { files: usize },
    Failed(String),
    /// A newer scan or a clear happened in the meantime; result discarded.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub file_count: usize,
    pub total_chars: usize,
    pub estimated_tokens: usize,
}

/// Single owner of the tree, the selection, the content cache and the
/// published document.
///
/// Only the controlling thread touches a `Session`. Background work is
/// described by tickets/jobs going out and results coming back, each tagged
/// with the scan generation that produced it so late results from a
/// discarded scan are dropped.
#[derive(Debug)]
pub struct Session {
    generation: u64,
    root: Option<PathBuf>,
    scanning: bool,
    engine: Option<SelectionEngine>,
    cache: ContentCache,
    document: String,
    metrics: Option<Metrics>,
    /// Generation of the aggregation pass currently running, if any.
    in_flight: Option<u64>,
    rerun_requested: bool,
    notice: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            generation: 0,
            root: None,
            scanning: false,
            engine: None,
            cache: ContentCache::default(),
            document: EMPTY_SELECTION_PLACEHOLDER.to_string(),
            metrics: None,
            in_flight: None,
            rerun_requested: false,
            notice: None,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops tree, selection, selected paths and cache as one unit and
    /// invalidates any background work still running.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.root = None;
        self.scanning = false;
        self.engine = None;
        self.cache.clear();
        self.document = EMPTY_SELECTION_PLACEHOLDER.to_string();
        self.metrics = None;
        self.in_flight = None;
        self.rerun_requested = false;
        self.notice = None;
    }

    pub fn begin_scan(&mut self, root: PathBuf) -> ScanTicket {
        self.reset();
        info!(root = %root.display(), generation = self.generation, "scan requested");
        self.root = Some(root.clone());
        self.scanning = true;
        ScanTicket {
            generation: self.generation,
            root,
        }
    }

    pub fn finish_scan(
        &mut self,
        generation: u64,
        result: Result<TreeModel, ScanError>,
    ) -> ScanOutcome {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale scan result");
            return ScanOutcome::Stale;
        }
        match result {
            Ok(tree) => {
                let files = tree.file_count();
                self.scanning = false;
                self.engine = Some(SelectionEngine::new(tree));
                ScanOutcome::Loaded { files }
            }
            Err(e) => {
                warn!(error = %e, "scan failed");
                self.reset();
                ScanOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn engine(&self) -> Option<&SelectionEngine> {
        self.engine.as_ref()
    }

    pub fn tree(&self) -> Option<&TreeModel> {
        self.engine.as_ref().map(SelectionEngine::tree)
    }

    #[cfg(test)]
    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn metrics(&self) -> Option<Metrics> {
        self.metrics
    }

    pub fn is_aggregating(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn toggle(&mut self, id: NodeId) -> Option<ToggleAction> {
        let action = self.engine.as_mut()?.toggle_node(id);
        self.notice = None;
        action
    }

    pub fn select_all(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.select_all();
            self.notice = None;
        }
    }

    pub fn deselect_all(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.deselect_all();
            self.notice = None;
        }
    }

    /// Selects every file whose root-relative path matches one of `patterns`.
    pub fn preselect(&mut self, patterns: &[Pattern]) -> usize {
        let Some(engine) = self.engine.as_mut() else {
            return 0;
        };
        engine.select_matching(|rel| patterns.iter().any(|p| p.matches_path(rel)))
    }

    /// Starts a content pass over the live selection.
    ///
    /// Returns `None` when nothing needs to run in the background: no tree,
    /// an empty selection (the placeholder is published right away) or a
    /// pass already in flight. In the last case the request is remembered
    /// and handed out again by [`Session::finish_aggregation`].
    pub fn begin_aggregation(&mut self) -> Option<AggregationJob> {
        let engine = self.engine.as_ref()?;
        if self.in_flight.is_some() {
            self.rerun_requested = true;
            return None;
        }
        let selected = engine.selected_paths().clone();
        if selected.is_empty() {
            self.document = EMPTY_SELECTION_PLACEHOLDER.to_string();
            self.metrics = None;
            return None;
        }
        let scan_root = engine.tree().root_path().to_path_buf();
        let cached = self.cache.snapshot(&selected);
        debug!(files = selected.len(), cached = cached.len(), "aggregation started");
        self.in_flight = Some(self.generation);
        Some(AggregationJob {
            generation: self.generation,
            scan_root,
            selected,
            cached,
        })
    }

    /// Publishes a finished pass. Returns the follow-up job when the
    /// selection changed while it was running.
    pub fn finish_aggregation(&mut self, output: AggregationOutput) -> Option<AggregationJob> {
        if output.generation != self.generation {
            debug!(generation = output.generation, "dropping stale aggregation");
            return None;
        }
        self.cache.extend(output.loaded);
        self.document = output.document;
        self.metrics = Some(Metrics {
            file_count: output.file_count,
            total_chars: output.total_chars,
            estimated_tokens: estimate_tokens(output.total_chars),
        });
        self.in_flight = None;
        info!(
            files = output.file_count,
            chars = output.total_chars,
            "document ready"
        );

        if self.rerun_requested {
            self.rerun_requested = false;
            return self.begin_aggregation();
        }
        None
    }

    /// Drops the pass handed out by [`Session::begin_aggregation`] when it
    /// could not be started, so the guard does not stay armed. The last
    /// published document is kept; its metrics no longer apply.
    pub fn abandon_aggregation(&mut self) {
        warn!(generation = self.generation, "aggregation pass abandoned");
        self.in_flight = None;
        self.rerun_requested = false;
        self.metrics = None;
    }

    /// Synchronous pass for headless use.
    pub fn aggregate_now(&mut self) {
        if let Some(job) = self.begin_aggregation() {
            self.finish_aggregation(job.run());
        }
    }

    pub fn note(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn status_line(&self) -> String {
        let mut line = if self.scanning {
            let root = self.root().unwrap_or(Path::new(""));
            format!("Scanning {}...", root.display())
        } else if let Some(engine) = &self.engine {
            let count = engine.selected_count();
            if self.in_flight.is_some() {
                format!("Selected Files: {} | Estimated Tokens: Calculating...", count)
            } else if let Some(m) = self.metrics {
                format!(
                    "Selected Files: {} | Estimated Tokens: ~{} | Total Chars: {}",
                    m.file_count,
                    format_thousands(m.estimated_tokens),
                    format_thousands(m.total_chars)
                )
            } else {
                format!("Selected Files: {}", count)
            }
        } else {
            "No directory loaded".to_string()
        };
        if let Some(notice) = &self.notice {
            line.push_str(" | ");
            line.push_str(notice);
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::tempdir;

    fn fixture() -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let root = dir.path().join("proj");
        fs::create_dir_all(root.join("sub")).unwrap();
        File::create(root.join("a.py")).unwrap().write_all(b"print(1)\n").unwrap();
        File::create(root.join("sub/b.py")).unwrap().write_all(b"print(2)\n").unwrap();
        (dir, root)
    }

    fn loaded_session(root: &Path) -> Session {
        let mut session = Session::new();
        let ticket = session.begin_scan(root.to_path_buf());
        let tree = crate::file_scanner::scan_tree(&ticket.root, &Default::default());
        assert_eq!(
            session.finish_scan(ticket.generation, tree),
            ScanOutcome::Loaded { files: 2 }
        );
        session
    }

    fn id(session: &Session, path: &Path) -> NodeId {
        session.tree().unwrap().id_of(path).unwrap()
    }

    #[test]
    fn stale_scan_results_are_dropped() {
        let (_dir, root) = fixture();
        let mut session = Session::new();
        let old = session.begin_scan(root.clone());
        let new = session.begin_scan(root.clone());

        let tree = crate::file_scanner::scan_tree(&root, &Default::default());
        assert_eq!(session.finish_scan(old.generation, tree), ScanOutcome::Stale);
        assert!(session.engine().is_none());
        assert!(session.is_scanning());

        let tree = crate::file_scanner::scan_tree(&root, &Default::default());
        assert!(matches!(
            session.finish_scan(new.generation, tree),
            ScanOutcome::Loaded { .. }
        ));
        assert!(!session.is_scanning());
    }

    #[test]
    fn failed_scan_resets_everything() {
        let (_dir, root) = fixture();
        let mut session = loaded_session(&root);
        let ticket = session.begin_scan(root.join("missing"));
        let result = crate::file_scanner::scan_tree(&ticket.root, &Default::default());
        let outcome = session.finish_scan(ticket.generation, result);

        assert!(matches!(outcome, ScanOutcome::Failed(msg) if msg.starts_with("Not a directory")));
        assert!(session.engine().is_none());
        assert!(session.root().is_none());
        assert_eq!(session.document(), EMPTY_SELECTION_PLACEHOLDER);
    }

    #[test]
    fn aggregation_publishes_document_and_fills_cache() {
        let (_dir, root) = fixture();
        let mut session = loaded_session(&root);
        let a = id(&session, &root.join("a.py"));
        session.toggle(a);

        let job = session.begin_aggregation().unwrap();
        assert!(session.is_aggregating());
        assert!(session.status_line().ends_with("Calculating..."));

        assert!(session.finish_aggregation(job.run()).is_none());
        assert!(session.cache().contains(&root.join("a.py")));
        assert!(session.document().contains("<document path=\"proj/a.py\">\nprint(1)\n\n</document>"));
        let m = session.metrics().unwrap();
        assert_eq!(m.file_count, 1);
        assert_eq!(m.total_chars, 9);
        assert_eq!(m.estimated_tokens, 3);
        assert_eq!(
            session.status_line(),
            "Selected Files: 1 | Estimated Tokens: ~3 | Total Chars: 9"
        );
    }

    #[test]
    fn toggles_during_a_pass_are_picked_up_by_the_next_one() {
        let (_dir, root) = fixture();
        let mut session = loaded_session(&root);
        session.toggle(id(&session, &root.join("a.py")));
        let first = session.begin_aggregation().unwrap();

        session.toggle(id(&session, &root.join("sub/b.py")));
        assert!(session.begin_aggregation().is_none());

        let second = session
            .finish_aggregation(first.run())
            .expect("rerun queued");
        assert_eq!(second.selected.len(), 2);
        assert!(second.cached.contains_key(&root.join("a.py")));

        assert!(session.finish_aggregation(second.run()).is_none());
        assert_eq!(session.metrics().unwrap().file_count, 2);
        assert!(!session.is_aggregating());
    }

    #[test]
    fn abandoned_pass_releases_the_guard() {
        let (_dir, root) = fixture();
        let mut session = loaded_session(&root);
        session.select_all();
        let _never_run = session.begin_aggregation().unwrap();
        session.toggle(id(&session, &root.join("a.py")));
        assert!(session.begin_aggregation().is_none());

        session.abandon_aggregation();
        assert!(!session.is_aggregating());
        assert_eq!(session.status_line(), "Selected Files: 1");

        let job = session.begin_aggregation().expect("guard released");
        assert!(session.finish_aggregation(job.run()).is_none());
        assert_eq!(session.metrics().unwrap().file_count, 1);
    }

    #[test]
    fn output_from_before_a_reset_is_ignored() {
        let (_dir, root) = fixture();
        let mut session = loaded_session(&root);
        session.select_all();
        let job = session.begin_aggregation().unwrap();

        session.reset();
        assert!(session.finish_aggregation(job.run()).is_none());
        assert!(session.cache().is_empty());
        assert_eq!(session.document(), EMPTY_SELECTION_PLACEHOLDER);
        assert_eq!(session.status_line(), "No directory loaded");
    }

    #[test]
    fn empty_selection_publishes_placeholder_without_a_job() {
        let (_dir, root) = fixture();
        let mut session = loaded_session(&root);
        session.select_all();
        session.aggregate_now();
        assert!(session.metrics().is_some());

        session.deselect_all();
        assert!(session.begin_aggregation().is_none());
        assert_eq!(session.document(), EMPTY_SELECTION_PLACEHOLDER);
        assert_eq!(session.status_line(), "Selected Files: 0");
    }

    #[test]
    fn preselect_matches_relative_globs() {
        let (_dir, root) = fixture();
        let mut session = loaded_session(&root);
        let patterns = vec![Pattern::new("sub/*.py").unwrap()];
        assert_eq!(session.preselect(&patterns), 1);
        assert!(session.engine().unwrap().is_selected(&root.join("sub/b.py")));
    }

    #[test]
    fn notices_are_appended_and_cleared_by_the_next_change() {
        let (_dir, root) = fixture();
        let mut session = loaded_session(&root);
        session.note("Copied to clipboard!");
        assert_eq!(session.status_line(), "Selected Files: 0 | Copied to clipboard!");
        session.select_all();
        assert!(!session.status_line().contains("Copied"));
    }
}
