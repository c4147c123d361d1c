use crate::page::LinkClass;
use ratatui::style::{Color, Modifier, Style};

// ── Background colors ──
pub const BG: Color = Color::Rgb(12, 12, 12);
pub const SURFACE: Color = Color::Rgb(20, 20, 20);
pub const PANEL: Color = Color::Rgb(26, 26, 26);
pub const BORDER: Color = Color::Rgb(42, 42, 42);

// ── Text colors ──
pub const TEXT: Color = Color::Rgb(200, 200, 200);
pub const DIM: Color = Color::Rgb(102, 102, 102);
pub const MUTED: Color = Color::Rgb(136, 136, 136);
pub const BRIGHT: Color = Color::Rgb(232, 232, 232);

// ── Accent colors ──
pub const BLUE: Color = Color::Rgb(96, 165, 250);
pub const CYAN: Color = Color::Rgb(34, 211, 238);
pub const GREEN: Color = Color::Rgb(74, 222, 128);
pub const YELLOW: Color = Color::Rgb(250, 204, 21);
pub const RED: Color = Color::Rgb(248, 113, 113);
pub const PURPLE: Color = Color::Rgb(167, 139, 250);

// ── Composed styles ──

pub fn default_style() -> Style {
    Style::default().fg(TEXT).bg(BG)
}

pub fn surface_style() -> Style {
    Style::default().fg(TEXT).bg(SURFACE)
}

pub fn dim_style() -> Style {
    Style::default().fg(DIM)
}

pub fn key_hint_style() -> Style {
    Style::default().fg(MUTED).add_modifier(Modifier::BOLD)
}

/// Gutter style for the line-number column.
pub fn gutter_style() -> Style {
    Style::default().fg(DIM)
}

/// How each link class renders: file references blue, single-definition
/// symbol references green, ambiguous ones yellow, line anchors dim.
pub fn link_style(class: LinkClass) -> Style {
    match class {
        LinkClass::Fref => Style::default().fg(BLUE),
        LinkClass::Sref => Style::default()
            .fg(GREEN)
            .add_modifier(Modifier::UNDERLINED),
        LinkClass::Falt => Style::default()
            .fg(YELLOW)
            .add_modifier(Modifier::UNDERLINED),
        LinkClass::Line => Style::default().fg(DIM),
        LinkClass::Plain => Style::default().fg(CYAN),
    }
}

/// Style of the link currently under the cursor.
pub fn link_cursor_style() -> Style {
    Style::default()
        .fg(BRIGHT)
        .bg(Color::Rgb(26, 42, 58))
        .add_modifier(Modifier::BOLD)
}
