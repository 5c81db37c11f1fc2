//! Pixboard Render Library
//!
//! Renderer abstraction and a CPU compositor that draws a
//! [`SoftwareSurface`](pixboard_core::SoftwareSurface) through a viewport,
//! draws the overview minimap and exports PNG.

mod compositor;
mod minimap;
mod renderer;

pub use compositor::{
    EXPORT_PADDING, ExportOptions, MAX_EXPORT_SIDE, PngRenderResult, SkiaCompositor,
    content_bounds, export_pixmap, export_png,
};
pub use minimap::{MINIMAP_HEIGHT, MINIMAP_WIDTH, MinimapLayout, render_minimap};
pub use renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
