mod bars;
mod content;
pub mod highlight;
mod overlay;
mod styles;

use crate::app::App;
use highlight::Highlighter;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

/// Render the entire UI
pub fn draw(f: &mut Frame, app: &App, hl: &Highlighter) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(bars::TOP_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(bars::BOTTOM_HEIGHT),
        ])
        .split(f.area());

    bars::render_top(f, outer[0], app);
    content::render(f, outer[1], app, hl);
    bars::render_bottom(f, outer[2], app);

    if app.page.search.visible {
        overlay::render_search_panel(f, outer[1], app);
    }

    if let Some(pane) = &app.popup {
        overlay::render_popup(f, f.area(), app, pane);
    }
}

/// Visible content rows, for page-wise scrolling.
pub fn content_viewport_height(total: u16) -> usize {
    total
        .saturating_sub(bars::TOP_HEIGHT + bars::BOTTOM_HEIGHT)
        .max(1) as usize
}
