//! Text shape.

use super::{ObjectKind, SerializableColor, ShapeTrait};
use kurbo::{BezPath, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Text run styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Glyph color.
    pub fill: SerializableColor,
    /// Background box color (None = transparent).
    pub background: Option<SerializableColor>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub line_through: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: Text::DEFAULT_FONT_FAMILY.to_string(),
            font_size: Text::DEFAULT_FONT_SIZE,
            fill: SerializableColor::white(),
            background: None,
            bold: false,
            italic: false,
            underline: false,
            line_through: false,
        }
    }
}

impl TextStyle {
    /// CSS-style weight keyword.
    pub fn font_weight(&self) -> &'static str {
        if self.bold { "bold" } else { "normal" }
    }

    /// CSS-style font style keyword.
    pub fn font_style(&self) -> &'static str {
        if self.italic { "italic" } else { "normal" }
    }
}

/// A text run centered on its anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// The text content.
    pub content: String,
    pub style: TextStyle,
}

impl Text {
    pub const DEFAULT_FONT_FAMILY: &'static str = "Arial";
    pub const DEFAULT_FONT_SIZE: f64 = 24.0;

    /// Create a new text shape with the default style.
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_style(content, TextStyle::default())
    }

    pub fn with_style(content: impl Into<String>, style: TextStyle) -> Self {
        Self {
            content: content.into(),
            style,
        }
    }

    /// Approximate width based on character count and font size.
    /// This is a rough estimate; actual width depends on the font.
    fn approximate_width(&self) -> f64 {
        let max_line_len = self
            .content
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let char_width_factor = if self.style.bold { 0.6 } else { 0.55 };
        max_line_len as f64 * self.style.font_size * char_width_factor
    }

    /// Approximate height based on font size and number of lines.
    fn approximate_height(&self) -> f64 {
        let line_count = self.content.lines().count().max(1);
        // lines() doesn't count a trailing empty line
        let line_count = if self.content.ends_with('\n') {
            line_count + 1
        } else {
            line_count
        };
        line_count as f64 * self.style.font_size * 1.2
    }
}

impl ShapeTrait for Text {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Text
    }

    fn local_bounds(&self) -> Rect {
        let width = self.approximate_width().max(20.0);
        let height = self.approximate_height();
        Rect::new(-width / 2.0, -height / 2.0, width / 2.0, height / 2.0)
    }

    fn to_path(&self) -> BezPath {
        // Text has no outline; the box is used for backgrounds and selection
        self.local_bounds().to_path(0.1)
    }
}
