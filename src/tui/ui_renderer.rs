use super::app_logic::TuiApp;
use super::app_state::{AppMode, HELP_TEXT, Popup};
use crate::selection::CheckState;
use crate::utils::format_size;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

fn draw_help_block(f: &mut Frame, _app: &TuiApp, area: Rect) {
    let help_text_lines_content = vec![
        Line::from("Arrows/jk: Nav | Space/Enter: Sel | Tab/o: Fold | y: Copy | ?: Help | q/Esc: Quit"),
        Line::from("a: Sel All | d: Desel All | *: Expand All | -: Collapse All | /: Filter | x: Clear | r: Rescan"),
    ];
    let help_paragraph = Paragraph::new(help_text_lines_content).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Codebase to Prompt"),
    );
    f.render_widget(help_paragraph, area);
}

fn draw_filter_input_block(f: &mut Frame, app: &TuiApp, area: Rect) {
    let input_text = format!("/{}", app.filter_input);
    let filter_paragraph = Paragraph::new(input_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Filter (Esc to cancel, Enter to apply)"),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(filter_paragraph, area);
    let cursor_col = app.filter_input[..app.filter_cursor_pos].chars().count() as u16;
    f.set_cursor_position((area.x + 1 + cursor_col + 1, area.y + 1));
}

fn checkbox(state: CheckState) -> &'static str {
    match state {
        CheckState::Unchecked => "[ ] ",
        CheckState::Mixed => "[-] ",
        CheckState::Checked => "[x] ",
    }
}

fn draw_tree_block(f: &mut Frame, app: &mut TuiApp, area: Rect) {
    app.list_viewport_height = area.height.saturating_sub(2) as usize;
    app.ensure_selection_is_visible_in_viewport();

    let list_title = if !app.filter_input.is_empty() && app.mode == AppMode::Normal {
        format!("Files (Filter: '{}')", app.filter_input)
    } else {
        "Select files/directories".to_string()
    };
    let block = Block::default().borders(Borders::ALL).title(list_title);

    let Some(engine) = app.session.engine() else {
        let message = if app.session.is_scanning() {
            "Scanning..."
        } else {
            "Nothing loaded. Press r to scan."
        };
        f.render_widget(Paragraph::new(message).block(block), area);
        return;
    };
    let tree = engine.tree();

    let visible = app.visible_rows();
    let end = (app.scroll_offset + app.list_viewport_height).min(visible.len());
    let window = visible.get(app.scroll_offset..end).unwrap_or(&[]);

    let list_items: Vec<ListItem> = window
        .iter()
        .map(|&id| {
            let node = tree.node(id);
            let indent = "  ".repeat(tree.depth(id));
            let fold = if node.is_dir {
                if app.is_expanded(id) { "▾ " } else { "▸ " }
            } else {
                "  "
            };
            let label = if node.is_dir {
                format!("{}/", node.name)
            } else {
                format!("{} ({})", node.name, format_size(node.size.unwrap_or(0)))
            };
            ListItem::new(format!(
                "{}{}{}{}",
                indent,
                fold,
                checkbox(engine.state(id)),
                label
            ))
        })
        .collect();

    let list_widget = List::new(list_items)
        .block(block)
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("❯ ");

    let mut list_state = ListState::default();
    if let Some(pos) = app
        .current
        .and_then(|cur| window.iter().position(|&id| id == cur))
    {
        list_state.select(Some(pos));
    }
    f.render_stateful_widget(list_widget, area, &mut list_state);
}

fn draw_preview_block(f: &mut Frame, app: &mut TuiApp, area: Rect) {
    let text = if app.session.is_aggregating() {
        "Loading..."
    } else {
        app.session.document()
    };
    let max_scroll = (text.lines().count() as u16).saturating_sub(1);
    app.preview_scroll = app.preview_scroll.min(max_scroll);

    let preview = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Selected Files (y: copy, PgUp/PgDn: scroll)"),
        )
        .scroll((app.preview_scroll, 0));
    f.render_widget(preview, area);
}

fn draw_status_bar(f: &mut Frame, app: &TuiApp, area: Rect) {
    f.render_widget(
        Paragraph::new(app.session.status_line()).style(Style::default().fg(Color::Gray)),
        area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn draw_popup(f: &mut Frame, popup: &Popup) {
    let (title, body, color) = match popup {
        Popup::Help => ("Help", HELP_TEXT.to_string(), Color::Cyan),
        Popup::Error(msg) => ("Error", msg.clone(), Color::Red),
    };
    let area = centered_rect(60, 40, f.area());
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color))
                    .title(format!("{} (any key to close)", title)),
            ),
        area,
    );
}

pub(super) fn ui_frame(frame: &mut Frame, app: &mut TuiApp) {
    let help_lines = 2;
    let filter_input_height = if app.mode == AppMode::Filtering { 3 } else { 0 };
    let top_block_container_height = (help_lines + 2) + filter_input_height;

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(top_block_container_height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let top_content_constraints = if app.mode == AppMode::Filtering {
        vec![
            Constraint::Length(help_lines + 2),
            Constraint::Length(filter_input_height),
        ]
    } else {
        vec![Constraint::Length(help_lines + 2)]
    };
    let top_content_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(top_content_constraints)
        .split(main_chunks[0]);

    draw_help_block(frame, app, top_content_chunks[0]);
    if app.mode == AppMode::Filtering {
        draw_filter_input_block(frame, app, top_content_chunks[1]);
    }

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(main_chunks[1]);
    draw_tree_block(frame, app, panes[0]);
    draw_preview_block(frame, app, panes[1]);
    draw_status_bar(frame, app, main_chunks[2]);

    if let Some(popup) = &app.popup {
        draw_popup(frame, popup);
    }
}
