use super::app_logic::TuiApp;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use std::time::Duration;

/// One tick of the loop: worker completions first, then at most one key.
pub(super) fn handle_events(app: &mut TuiApp) -> Result<()> {
    app.drain_worker_events();
    if event::poll(Duration::from_millis(50))? {
        if let Event::Key(key_event) = event::read()? {
            if key_event.kind == KeyEventKind::Press {
                app.handle_key(key_event);
            }
        }
    }
    Ok(())
}
