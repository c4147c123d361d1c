use ratatui::style::{Color, Style};
use ratatui::text::Span;
use syntect::easy::HighlightLines;
use syntect::highlighting::Theme;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use two_face::theme::EmbeddedThemeName;

/// Cached syntax highlighting state — loaded once, reused for all files.
/// Uses the extended two-face syntax pack so kernel-style trees (Makefiles,
/// Kconfig, assembler) highlight too.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new() -> Self {
        let syntax_set = two_face::syntax::extra_newlines();
        let theme = two_face::theme::extra()
            .get(EmbeddedThemeName::Base16OceanDark)
            .clone();
        Highlighter { syntax_set, theme }
    }

    fn syntax_for(&self, path: &str) -> &SyntaxReference {
        let name = path.rsplit('/').next().unwrap_or(path);
        let ext = name.rsplit('.').next().unwrap_or("");
        self.syntax_set
            .find_syntax_by_extension(ext)
            .or_else(|| self.syntax_set.find_syntax_by_extension(name))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
    }

    /// Highlight one source line, returning styled spans. `path` selects
    /// the language by extension. Lines are highlighted independently;
    /// constructs spanning lines degrade gracefully to plain text.
    pub fn highlight_line(&self, line: &str, path: &str) -> Vec<Span<'static>> {
        let syntax = self.syntax_for(path);
        let mut hl = HighlightLines::new(syntax, &self.theme);

        // syntect wants the trailing newline present
        let input = if line.ends_with('\n') {
            line.to_string()
        } else {
            format!("{line}\n")
        };

        match hl.highlight_line(&input, &self.syntax_set) {
            Ok(ranges) => ranges
                .into_iter()
                .map(|(style, text)| {
                    let text = text.trim_end_matches('\n');
                    let fg = Color::Rgb(
                        style.foreground.r,
                        style.foreground.g,
                        style.foreground.b,
                    );
                    Span::styled(text.to_string(), Style::default().fg(fg))
                })
                .collect(),
            Err(_) => vec![Span::raw(line.to_string())],
        }
    }
}
