use super::styles;
use crate::app::{App, InputMode};
use crate::nav::NavMode;
use crate::page::Span as PageSpan;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

pub const TOP_HEIGHT: u16 = 2;
pub const BOTTOM_HEIGHT: u16 = 2;

/// Top bar:
///   Row 1: LXR  tree / path / crumbs              [version]
///   Row 2: navigation mode · print link · window name
pub fn render_top(f: &mut Frame, area: Rect, app: &App) {
    let panel = Style::default().bg(styles::PANEL);

    let mut crumbs: Vec<Span> = vec![Span::styled(
        " LXR ",
        Style::default()
            .fg(styles::BG)
            .bg(styles::BLUE)
            .add_modifier(ratatui::style::Modifier::BOLD),
    )];
    crumbs.push(Span::raw(" "));
    let mut bc_link = 0usize;
    for (i, span) in app.page.breadcrumb.iter().enumerate() {
        if i > 0 {
            crumbs.push(Span::styled(" / ", styles::dim_style()));
        }
        match span {
            PageSpan::Text(text) => crumbs.push(Span::styled(text.as_str(), styles::surface_style())),
            PageSpan::Link(link) => {
                let style = if bc_link == app.link_cursor {
                    styles::link_cursor_style()
                } else {
                    styles::link_style(link.class)
                };
                bc_link += 1;
                crumbs.push(Span::styled(link.text.as_str(), style));
            }
        }
    }

    let version = if app.page.selected_version.is_empty() {
        "work tree".to_string()
    } else {
        app.page.selected_version.clone()
    };
    let right = format!(
        " {}/{} [{}] ",
        app.page
            .versions
            .iter()
            .position(|v| *v == app.page.selected_version)
            .map(|i| i + 1)
            .unwrap_or(0),
        app.page.versions.len().max(1),
        version
    );
    let pad = (area.width as usize)
        .saturating_sub(width(&crumbs) + right.chars().count());
    crumbs.push(Span::styled(" ".repeat(pad), panel));
    crumbs.push(Span::styled(right, Style::default().fg(styles::CYAN)));

    let mode = match app.nav.mode() {
        NavMode::Incremental => "incremental",
        NavMode::Popup => "popup",
        NavMode::Off => "plain",
    };
    let mut info: Vec<Span> = vec![
        Span::styled(format!(" {mode} "), styles::key_hint_style()),
        Span::styled("· ", styles::dim_style()),
    ];
    if app.page.print.visible {
        info.push(Span::styled("print view available", styles::dim_style()));
    }
    if let Some(name) = &app.page.window_name {
        info.push(Span::styled(format!("  {name}"), styles::dim_style()));
    }

    let lines = vec![Line::from(crumbs), Line::from(info)];
    f.render_widget(Paragraph::new(lines).style(panel), area);
}

/// Bottom bar:
///   Row 1: address line (or the active input buffer, or a notice)
///   Row 2: key hints
pub fn render_bottom(f: &mut Frame, area: Rect, app: &App) {
    let row1 = match &app.input {
        InputMode::Address(buf) => Line::from(vec![
            Span::styled(" goto ", styles::key_hint_style()),
            Span::styled(format!("#{buf}"), Style::default().fg(styles::BRIGHT)),
            Span::styled("█", Style::default().fg(styles::BLUE)),
        ]),
        InputMode::Search(buf) => Line::from(vec![
            Span::styled(" search ", styles::key_hint_style()),
            Span::styled(buf.as_str(), Style::default().fg(styles::BRIGHT)),
            Span::styled("█", Style::default().fg(styles::BLUE)),
        ]),
        InputMode::Normal => {
            if let Some((msg, _)) = &app.notice {
                Line::from(Span::styled(
                    format!(" {msg}"),
                    Style::default().fg(styles::YELLOW),
                ))
            } else {
                Line::from(vec![
                    Span::styled(" #", styles::dim_style()),
                    Span::styled(
                        app.page.fragment.as_str(),
                        Style::default().fg(styles::TEXT),
                    ),
                ])
            }
        }
    };

    let hints = match app.input {
        InputMode::Normal => {
            " tab/S-tab links · enter open · g goto · / search · [ ] version · b/f history · r reload · q quit"
        }
        _ => " enter submit · esc cancel",
    };
    let row2 = Line::from(Span::styled(hints, styles::key_hint_style()));

    f.render_widget(
        Paragraph::new(vec![row1, row2]).style(Style::default().bg(styles::SURFACE)),
        area,
    );
}

fn width(spans: &[Span]) -> usize {
    spans.iter().map(|s| s.content.chars().count()).sum()
}
