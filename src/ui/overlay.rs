use super::styles;
use crate::app::{App, PopupPane};
use crate::page::{PanelBody, Row, Span as PageSpan};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Render the in-page search results panel (incremental mode). Sits over
/// the lower part of the content area, like the sliding panel it stands
/// in for.
pub fn render_search_panel(f: &mut Frame, area: Rect, app: &App) {
    let height = (area.height / 3).max(5);
    let panel = Rect {
        x: area.x,
        y: area.y + area.height - height,
        width: area.width,
        height,
    };
    f.render_widget(Clear, panel);

    // Search-result links come after breadcrumb and content links in the
    // page's link order.
    let mut link_idx = app.page.links().len();
    if let PanelBody::Rows(rows) = &app.page.search.body {
        link_idx -= rows
            .iter()
            .flat_map(|r| r.spans.iter())
            .filter(|s| matches!(s, PageSpan::Link(_)))
            .count();
    }

    let lines = panel_lines(&app.page.search.body, app, &mut link_idx);
    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(styles::BORDER))
        .title(Span::styled(" results ", styles::key_hint_style()));
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .style(Style::default().bg(styles::PANEL)),
        panel,
    );
}

/// Render the popup-mode secondary window as a centered overlay.
pub fn render_popup(f: &mut Frame, area: Rect, app: &App, pane: &PopupPane) {
    let width = (area.width * 3 / 4).max(30);
    let height = (area.height * 2 / 3).max(8);
    let popup = centered_rect(width, height, area);
    f.render_widget(Clear, popup);

    // Popup rows are display-only; no link cursor inside them.
    let mut link_idx = usize::MAX;
    let lines = panel_lines(&pane.body, app, &mut link_idx);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(styles::BORDER))
        .title(Span::styled(
            format!(" {} ", pane.name),
            styles::key_hint_style(),
        ));
    f.render_widget(
        Paragraph::new(lines)
            .block(block)
            .style(Style::default().bg(styles::PANEL)),
        popup,
    );
}

fn panel_lines<'a>(body: &'a PanelBody, app: &App, link_idx: &mut usize) -> Vec<Line<'a>> {
    match body {
        PanelBody::Progress(msg) => {
            vec![Line::from(Span::styled(msg.as_str(), styles::dim_style()))]
        }
        PanelBody::Rows(rows) if rows.is_empty() => {
            vec![Line::from(Span::styled("no matches", styles::dim_style()))]
        }
        PanelBody::Rows(rows) => rows.iter().map(|row| row_line(row, app, link_idx)).collect(),
    }
}

fn row_line<'a>(row: &'a Row, app: &App, link_idx: &mut usize) -> Line<'a> {
    let mut spans = Vec::new();
    for span in &row.spans {
        match span {
            PageSpan::Text(text) => spans.push(Span::styled(
                text.as_str(),
                Style::default().fg(styles::TEXT),
            )),
            PageSpan::Link(link) => {
                let style = if *link_idx == app.link_cursor {
                    styles::link_cursor_style()
                } else {
                    styles::link_style(link.class)
                };
                if *link_idx != usize::MAX {
                    *link_idx += 1;
                }
                spans.push(Span::styled(link.text.as_str(), style));
            }
        }
    }
    Line::from(spans)
}

fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(r.height.saturating_sub(height) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(r.width.saturating_sub(width) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1])[1]
}
