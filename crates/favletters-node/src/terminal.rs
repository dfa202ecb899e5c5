//! Terminal presentation: dots, status lines and a boxed glyph icon.

use favletters_core::{IconRenderer, IconSpec, View};

/// Renders an icon as a 3-line box with the glyph in the middle.
///
/// Colors are emitted as 24-bit ANSI escapes when `ansi` is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextIconRenderer {
    pub ansi: bool,
}

impl IconRenderer for TextIconRenderer {
    type Image = String;

    fn render(&self, icon: &IconSpec) -> String {
        let glyph = if self.ansi {
            let fg = icon.foreground;
            let bg = icon.background;
            format!(
                "\x1b[1;38;2;{};{};{};48;2;{};{};{}m {} \x1b[0m",
                fg.0, fg.1, fg.2, bg.0, bg.1, bg.2, icon.glyph
            )
        } else {
            format!(" {} ", icon.glyph)
        };
        format!("╭───╮\n│{}│\n╰───╯", glyph)
    }
}

/// One dot per tab in rank order: `@` self, `●` glyph slot, `○` empty slot.
pub fn render_dots(view: &View) -> String {
    view.dots
        .iter()
        .map(|dot| match (dot.is_self, dot.has_glyph) {
            (true, _) => '@',
            (false, true) => '●',
            (false, false) => '○',
        })
        .collect()
}

/// Full frame for one view.
pub fn render_view(view: &View, renderer: &TextIconRenderer) -> String {
    format!(
        "{}\n{} | {} | {}\ntext: {:?}",
        renderer.render(&view.icon()),
        view.status_line(),
        view.index_line(),
        render_dots(view),
        view.text,
    )
}

/// A line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Replace the shared text.
    Text(String),
    Promote,
    Status,
    Quit,
}

impl Input {
    /// Slash-commands are actions, anything else is new text.
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/promote" => Input::Promote,
            "/status" => Input::Status,
            "/quit" | "/exit" => Input::Quit,
            _ => Input::Text(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}
