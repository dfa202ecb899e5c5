//! Presentation-facing snapshot of engine state.
//!
//! The engine knows nothing about rendering. It hands out a [`View`] and the
//! presentation layer draws dots, status lines and the icon from it.

use serde::Serialize;

use crate::identity::PeerId;
use crate::text::SharedText;

/// One indicator dot, in rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerDot {
    pub id: PeerId,
    pub is_self: bool,
    /// The text has a non-space character at this rank position.
    pub has_glyph: bool,
}

/// Everything the presentation layer needs for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct View {
    /// Current shared text.
    pub text: String,
    /// One dot per live tab, in rank order.
    pub dots: Vec<PeerDot>,
    /// This tab's rank, `None` if it is missing from its own table.
    pub local_index: Option<usize>,
    /// Character of the text at this tab's rank, `None` when out of range.
    pub glyph: Option<char>,
}

impl View {
    /// Build a view from the text and a ranking.
    pub fn build(text: &SharedText, ranking: &[PeerId], self_id: &PeerId) -> Self {
        let dots = ranking
            .iter()
            .enumerate()
            .map(|(index, id)| PeerDot {
                id: id.clone(),
                is_self: id == self_id,
                has_glyph: text.char_at(index).is_some_and(|c| c != ' '),
            })
            .collect();

        let local_index = ranking.iter().position(|id| id == self_id);
        let glyph = local_index.and_then(|index| text.char_at(index));

        Self {
            text: text.as_str().to_string(),
            dots,
            local_index,
            glyph,
        }
    }

    /// Number of live tabs, this one included.
    pub fn peer_count(&self) -> usize {
        self.dots.len()
    }

    /// "`<N>` Active Tab(s)".
    pub fn status_line(&self) -> String {
        let count = self.peer_count();
        let plural = if count == 1 { "" } else { "s" };
        format!("{} Active Tab{}", count, plural)
    }

    /// "Index: `<i>`", with -1 when this tab is not ranked.
    pub fn index_line(&self) -> String {
        match self.local_index {
            Some(index) => format!("Index: {}", index),
            None => "Index: -1".to_string(),
        }
    }

    /// Icon for this tab with default colors.
    pub fn icon(&self) -> IconSpec {
        IconSpec::new(self.glyph)
    }
}

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);
    pub const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Inputs of the icon renderer: one glyph and two colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IconSpec {
    /// Upper-cased glyph, or `' '` when blank.
    pub glyph: char,
    pub foreground: Rgb,
    pub background: Rgb,
}

impl IconSpec {
    /// White glyph on black.
    pub fn new(glyph: Option<char>) -> Self {
        Self::with_colors(glyph, Rgb::WHITE, Rgb::BLACK)
    }

    pub fn with_colors(glyph: Option<char>, foreground: Rgb, background: Rgb) -> Self {
        let glyph = glyph
            .map(|c| c.to_uppercase().next().unwrap_or(c))
            .unwrap_or(' ');
        Self {
            glyph,
            foreground,
            background,
        }
    }

    /// Whether there is nothing to draw.
    pub fn is_blank(&self) -> bool {
        self.glyph.is_whitespace()
    }
}

/// Turns an [`IconSpec`] into an image.
///
/// Implementations must be pure: equal specs give equal images.
pub trait IconRenderer {
    type Image;

    fn render(&self, icon: &IconSpec) -> Self::Image;
}
