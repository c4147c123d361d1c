use super::highlight::Highlighter;
use super::styles;
use crate::app::App;
use crate::page::{Block, Content, FragState, Row, Span as PageSpan};
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// Render the main listing area: directory rows or source rows, with a
/// line-number gutter, styled links and placeholders for fragments that
/// are still on their way.
pub fn render(f: &mut Frame, area: Rect, app: &App, hl: &Highlighter) {
    let listing = match &app.page.content {
        Content::Progress(msg) => {
            let line = Line::from(Span::styled(msg.clone(), styles::dim_style()));
            f.render_widget(Paragraph::new(line).style(styles::default_style()), area);
            return;
        }
        Content::Listing(listing) => listing,
    };

    // Links before the content area (the breadcrumb) shift the cursor index.
    let mut link_idx = app
        .page
        .breadcrumb
        .iter()
        .filter(|s| matches!(s, PageSpan::Link(_)))
        .count();

    let mut lines: Vec<Line> = Vec::new();
    let mut display_row = 0usize;
    let window = app.scroll..app.scroll + area.height as usize;

    for block in &listing.blocks {
        match block {
            Block::Fragment {
                state: FragState::Pending,
                ..
            } => {
                if window.contains(&display_row) {
                    lines.push(placeholder_line());
                }
                display_row += 1;
            }
            Block::Rows(rows) | Block::Fragment { rows, .. } => {
                for row in rows {
                    if window.contains(&display_row) {
                        lines.push(render_row(row, app, hl, &mut link_idx));
                    } else {
                        link_idx += row
                            .spans
                            .iter()
                            .filter(|s| matches!(s, PageSpan::Link(_)))
                            .count();
                    }
                    display_row += 1;
                }
            }
        }
    }

    f.render_widget(
        Paragraph::new(lines).style(styles::default_style()),
        area,
    );
}

fn placeholder_line() -> Line<'static> {
    Line::from(vec![
        Span::raw("      "),
        Span::styled("... loading ...", styles::dim_style()),
    ])
}

fn render_row<'a>(
    row: &'a Row,
    app: &App,
    hl: &Highlighter,
    link_idx: &mut usize,
) -> Line<'a> {
    let mut spans: Vec<Span> = Vec::new();

    if app.cfg.display.line_numbers {
        if let Some(n) = row.id.as_deref().and_then(|id| id.strip_prefix('L')) {
            spans.push(Span::styled(format!("{n:>5} "), styles::gutter_style()));
        } else {
            spans.push(Span::raw("      "));
        }
    }

    // A pure-text source row gets syntax highlighting; anything carrying
    // links renders span by span so link styling survives.
    let pure_text = matches!(row.spans.as_slice(), [PageSpan::Text(_)]);
    if pure_text && app.cfg.display.syntax_highlight && row.id.is_some() {
        if let PageSpan::Text(text) = &row.spans[0] {
            spans.extend(hl.highlight_line(text, &app.current.file));
        }
        return Line::from(spans);
    }

    for span in &row.spans {
        match span {
            PageSpan::Text(text) => spans.push(Span::styled(text.as_str(), styles::default_style())),
            PageSpan::Link(link) => {
                let style = if *link_idx == app.link_cursor {
                    styles::link_cursor_style()
                } else {
                    styles::link_style(link.class)
                };
                spans.push(Span::styled(link.text.as_str(), style));
                *link_idx += 1;
            }
        }
    }
    Line::from(spans)
}
