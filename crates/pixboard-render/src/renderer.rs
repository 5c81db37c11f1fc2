//! Renderer trait abstraction.

use kurbo::{Rect, Size};
use peniko::Color;
use pixboard_core::raster::RasterError;
use pixboard_core::surface::SoftwareSurface;
use pixboard_core::viewport::Viewport;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid target size: {0}x{1}")]
    InvalidSize(u32, u32),
    #[error("Nothing to render")]
    Empty,
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Grid display style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GridStyle {
    /// Plain background.
    #[default]
    None,
    /// Full grid lines.
    Lines,
    /// Only intersection dots.
    Dots,
}

impl GridStyle {
    /// Cycle to the next grid style.
    pub fn next(self) -> Self {
        match self {
            GridStyle::None => GridStyle::Lines,
            GridStyle::Lines => GridStyle::Dots,
            GridStyle::Dots => GridStyle::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GridStyle::None => "None",
            GridStyle::Lines => "Lines",
            GridStyle::Dots => "Dots",
        }
    }
}

/// Context for a single render frame.
pub struct RenderContext<'a> {
    /// Nodes to draw, in their attached order.
    pub surface: &'a SoftwareSurface,
    pub viewport: &'a Viewport,
    /// Background color.
    pub background_color: Color,
    pub grid_style: GridStyle,
    /// Grid spacing in world units.
    pub grid_size: f64,
    /// Selection highlight color.
    pub selection_color: Color,
    /// World bounds of selected objects.
    pub selection: Vec<Rect>,
    /// Marquee rectangle in screen coordinates.
    pub marquee: Option<Rect>,
}

impl<'a> RenderContext<'a> {
    pub fn new(surface: &'a SoftwareSurface, viewport: &'a Viewport) -> Self {
        Self {
            surface,
            viewport,
            background_color: Color::from_rgba8(250, 250, 250, 255),
            grid_style: GridStyle::None,
            grid_size: 20.0,
            selection_color: Color::from_rgba8(59, 130, 246, 255), // Blue
            selection: Vec::new(),
            marquee: None,
        }
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn with_grid(mut self, style: GridStyle) -> Self {
        self.grid_style = style;
        self
    }

    /// Highlight these world rectangles.
    pub fn with_selection(mut self, selection: Vec<Rect>) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_marquee(mut self, rect: Option<Rect>) -> Self {
        self.marquee = rect;
        self
    }

    /// Output size in pixels.
    pub fn target_size(&self) -> Size {
        self.viewport.screen
    }
}

/// Trait for rendering backends.
pub trait Renderer {
    /// Draw one frame.
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<()>;

    /// Get the background color (for clearing).
    fn background_color(&self, ctx: &RenderContext) -> Color {
        ctx.background_color
    }
}
