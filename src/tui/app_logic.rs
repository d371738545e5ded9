use super::app_state::{AppMode, Popup};
use crate::clipboard;
use crate::content_loader::AggregationJob;
use crate::file_scanner::ScanOptions;
use crate::path_index::NodeId;
use crate::session::{ScanOutcome, Session};
use crate::tree_model::TreeModel;
use crate::worker::{self, WorkerEvent};
use crossterm::event::{KeyCode, KeyEvent};
use glob::Pattern;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{info, warn};

const PREVIEW_PAGE: u16 = 10;

// --- TuiApp struct and impl ---
pub struct TuiApp {
    pub(super) session: Session,
    scan_root: PathBuf,
    scan_options: ScanOptions,
    preselect: Vec<Pattern>,
    tx: Sender<WorkerEvent>,
    rx: Receiver<WorkerEvent>,
    /// Expansion flag per node index of the current tree.
    pub(super) expanded: Vec<bool>,
    pub(super) current: Option<NodeId>,
    pub(super) scroll_offset: usize,
    pub(super) preview_scroll: u16,
    pub(super) quit: bool,
    pub(super) mode: AppMode,
    pub(super) popup: Option<Popup>,
    pub(super) filter_input: String,
    pub(super) filter_cursor_pos: usize,
    pub(super) list_viewport_height: usize,
}

impl TuiApp {
    pub fn new(scan_root: PathBuf, scan_options: ScanOptions, preselect: Vec<Pattern>) -> Self {
        let (tx, rx) = mpsc::channel();
        TuiApp {
            session: Session::new(),
            scan_root,
            scan_options,
            preselect,
            tx,
            rx,
            expanded: Vec::new(),
            current: None,
            scroll_offset: 0,
            preview_scroll: 0,
            quit: false,
            mode: AppMode::Normal,
            popup: None,
            filter_input: String::new(),
            filter_cursor_pos: 0,
            list_viewport_height: 0, // Will be updated by ui_renderer
        }
    }

    // --- Background work ---
    pub(super) fn start_scan(&mut self) {
        self.reset_view();
        let ticket = self.session.begin_scan(self.scan_root.clone());
        if let Err(e) = worker::spawn_scan(ticket, self.scan_options.clone(), self.tx.clone()) {
            self.scan_not_started(&e);
        }
    }

    fn dispatch_aggregation(&mut self, job: AggregationJob) {
        if let Err(e) = worker::spawn_aggregation(job, self.tx.clone()) {
            self.aggregation_not_started(&e);
        }
    }

    fn scan_not_started(&mut self, err: &io::Error) {
        self.session.reset();
        self.reset_view();
        self.popup = Some(Popup::Error(format!("Could not start the scan: {}", err)));
    }

    fn aggregation_not_started(&mut self, err: &io::Error) {
        self.session.abandon_aggregation();
        self.popup = Some(Popup::Error(format!(
            "Could not start loading file contents: {}",
            err
        )));
    }

    /// Applies every completion message that has arrived so far.
    pub(super) fn drain_worker_events(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle_worker_event(event);
        }
    }

    pub(super) fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::ScanFinished { generation, result } => {
                match self.session.finish_scan(generation, result) {
                    ScanOutcome::Loaded { files } => {
                        info!(files, "tree ready");
                        self.on_tree_loaded();
                    }
                    ScanOutcome::Failed(msg) => {
                        self.reset_view();
                        self.popup = Some(Popup::Error(msg));
                    }
                    ScanOutcome::Stale => {}
                }
            }
            WorkerEvent::ContentReady(output) => {
                if let Some(job) = self.session.finish_aggregation(output) {
                    self.dispatch_aggregation(job);
                }
            }
        }
    }

    fn on_tree_loaded(&mut self) {
        let Some(tree) = self.session.tree() else {
            return;
        };
        self.expanded = vec![true; tree.len()];
        self.current = Some(tree.root());
        self.scroll_offset = 0;
        if !self.preselect.is_empty() && self.session.preselect(&self.preselect) > 0 {
            self.trigger_content_update();
        }
    }

    fn trigger_content_update(&mut self) {
        self.preview_scroll = 0;
        if let Some(job) = self.session.begin_aggregation() {
            self.dispatch_aggregation(job);
        }
    }

    fn reset_view(&mut self) {
        self.expanded.clear();
        self.current = None;
        self.scroll_offset = 0;
        self.preview_scroll = 0;
    }

    // --- Selection ---
    pub(super) fn toggle_current_item_selection(&mut self) {
        let Some(id) = self.current else {
            return;
        };
        if self.session.toggle(id).is_some() {
            self.trigger_content_update();
        }
    }

    pub(super) fn select_all_items(&mut self) {
        self.session.select_all();
        self.trigger_content_update();
    }

    pub(super) fn deselect_all_items(&mut self) {
        self.session.deselect_all();
        self.trigger_content_update();
    }

    pub(super) fn clear_all(&mut self) {
        self.session.reset();
        self.reset_view();
    }

    pub(super) fn copy_document(&mut self) {
        let has_selection = self
            .session
            .engine()
            .is_some_and(|e| e.selected_count() > 0);
        if !has_selection {
            return;
        }
        if self.session.is_aggregating() {
            self.session.note("Still generating, try again");
            return;
        }
        match clipboard::copy_text_to_clipboard(self.session.document()) {
            Ok(()) => self.session.note("Copied to clipboard!"),
            Err(e) => {
                warn!(error = %e, "clipboard copy failed");
                self.popup = Some(Popup::Error(e.to_string()));
            }
        }
    }

    // --- Expansion ---
    pub(super) fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.get(id.index()).copied().unwrap_or(false)
    }

    pub(super) fn expand_all_directories(&mut self) {
        self.expanded.iter_mut().for_each(|e| *e = true);
        self.ensure_selection_is_visible();
    }

    pub(super) fn collapse_all_directories(&mut self) {
        let root = self.session.tree().map(TreeModel::root);
        for (i, flag) in self.expanded.iter_mut().enumerate() {
            *flag = root.is_some_and(|r| r.index() == i);
        }
        self.ensure_selection_is_visible();
    }

    pub(super) fn toggle_expansion_and_adjust_selection(&mut self) {
        let Some(id) = self.current else {
            return;
        };
        let is_dir = self.session.tree().is_some_and(|t| t.node(id).is_dir);
        if is_dir {
            if let Some(flag) = self.expanded.get_mut(id.index()) {
                *flag = !*flag;
            }
            self.ensure_selection_is_visible();
        }
    }

    // --- Visibility and navigation ---

    /// Rows in display order: ancestors expanded and, when filtering, the
    /// node or one of its descendants matches.
    pub(super) fn visible_rows(&self) -> Vec<NodeId> {
        let Some(tree) = self.session.tree() else {
            return Vec::new();
        };
        let matches = self.filter_matches(tree);
        let mut rows = Vec::new();
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            if matches.as_ref().is_some_and(|m| !m[id.index()]) {
                continue;
            }
            rows.push(id);
            if self.is_expanded(id) {
                stack.extend(tree.node(id).children.iter().rev().copied());
            }
        }
        rows
    }

    fn filter_matches(&self, tree: &TreeModel) -> Option<Vec<bool>> {
        if self.filter_input.is_empty() {
            return None;
        }
        let needle = self.filter_input.to_lowercase();
        let mut matches = vec![false; tree.len()];
        // Descendants have larger ids, so they are settled first.
        for id in tree.ids().rev() {
            let node = tree.node(id);
            matches[id.index()] = node.name.to_lowercase().contains(&needle)
                || node.children.iter().any(|c| matches[c.index()]);
        }
        Some(matches)
    }

    pub(super) fn select_next_visible_item(&mut self) {
        self.move_selection_in_visible_list(1);
    }

    pub(super) fn select_previous_visible_item(&mut self) {
        self.move_selection_in_visible_list(-1);
    }

    pub(super) fn move_selection_in_visible_list(&mut self, delta: i32) {
        let visible = self.visible_rows();
        if visible.is_empty() {
            return;
        }
        let position = self
            .current
            .and_then(|cur| visible.iter().position(|&id| id == cur));
        let new_position = match position {
            Some(pos) => (pos as i32 + delta).rem_euclid(visible.len() as i32) as usize,
            None if delta > 0 => 0,
            None => visible.len() - 1,
        };
        self.current = Some(visible[new_position]);
    }

    /// Moves the cursor to the nearest visible ancestor (or the first row)
    /// when the current node got hidden, then fixes the viewport.
    pub(super) fn ensure_selection_is_visible(&mut self) {
        let visible = self.visible_rows();
        if let (Some(cur), Some(tree)) = (self.current, self.session.tree()) {
            if !visible.contains(&cur) {
                self.current = tree
                    .ancestors(cur)
                    .find(|a| visible.contains(a))
                    .or_else(|| visible.first().copied());
            }
        } else {
            self.current = visible.first().copied();
        }
        self.ensure_selection_is_visible_in_viewport();
    }

    pub(super) fn ensure_selection_is_visible_in_viewport(&mut self) {
        if self.list_viewport_height == 0 {
            return;
        }
        let visible = self.visible_rows();
        if visible.is_empty() {
            self.scroll_offset = 0;
            return;
        }

        let list_height = self.list_viewport_height;
        let position = self
            .current
            .and_then(|cur| visible.iter().position(|&id| id == cur));
        if let Some(pos) = position {
            if pos < self.scroll_offset {
                self.scroll_offset = pos;
            } else if pos >= self.scroll_offset + list_height {
                self.scroll_offset = pos + 1 - list_height;
            }
        }

        if visible.len() <= list_height {
            self.scroll_offset = 0;
        } else {
            self.scroll_offset = self.scroll_offset.min(visible.len() - list_height);
        }
    }

    // --- Event handling sub-methods ---
    pub(super) fn handle_key(&mut self, key_event: KeyEvent) {
        if self.popup.is_some() {
            self.popup = None;
            return;
        }
        match self.mode {
            AppMode::Normal => self.handle_normal_mode_input(key_event),
            AppMode::Filtering => self.handle_filtering_mode_input(key_event),
        }
    }

    pub(super) fn handle_normal_mode_input(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Char('/') => {
                self.mode = AppMode::Filtering;
            }
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('y') => self.copy_document(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next_visible_item(),
            KeyCode::Up | KeyCode::Char('k') => self.select_previous_visible_item(),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_current_item_selection(),
            KeyCode::Char('o') | KeyCode::Tab => self.toggle_expansion_and_adjust_selection(),
            KeyCode::Char('*') => self.expand_all_directories(),
            KeyCode::Char('-') => self.collapse_all_directories(),
            KeyCode::Char('a') => self.select_all_items(),
            KeyCode::Char('d') => self.deselect_all_items(),
            KeyCode::Char('x') => self.clear_all(),
            KeyCode::Char('r') => self.start_scan(),
            KeyCode::Char('?') => self.popup = Some(Popup::Help),
            KeyCode::PageDown => {
                self.preview_scroll = self.preview_scroll.saturating_add(PREVIEW_PAGE);
            }
            KeyCode::PageUp => {
                self.preview_scroll = self.preview_scroll.saturating_sub(PREVIEW_PAGE);
            }
            _ => {}
        }
    }

    pub(super) fn handle_filtering_mode_input(&mut self, key_event: KeyEvent) {
        match key_event.code {
            KeyCode::Enter => {
                self.mode = AppMode::Normal;
                self.ensure_selection_is_visible();
            }
            KeyCode::Esc => {
                self.mode = AppMode::Normal;
                self.filter_input.clear();
                self.filter_cursor_pos = 0;
                self.ensure_selection_is_visible();
            }
            KeyCode::Char(c) => {
                self.filter_input.insert(self.filter_cursor_pos, c);
                self.filter_cursor_pos += c.len_utf8();
                self.ensure_selection_is_visible();
            }
            KeyCode::Backspace => {
                if let Some(c) = self.filter_input[..self.filter_cursor_pos].chars().last() {
                    self.filter_cursor_pos -= c.len_utf8();
                    self.filter_input.remove(self.filter_cursor_pos);
                    self.ensure_selection_is_visible();
                }
            }
            KeyCode::Left => {
                if let Some(c) = self.filter_input[..self.filter_cursor_pos].chars().last() {
                    self.filter_cursor_pos -= c.len_utf8();
                }
            }
            KeyCode::Right => {
                if let Some(c) = self.filter_input[self.filter_cursor_pos..].chars().next() {
                    self.filter_cursor_pos += c.len_utf8();
                }
            }
            _ => {}
        }
    }
}
