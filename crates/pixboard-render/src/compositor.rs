//! CPU compositor over a [`SoftwareSurface`].

use crate::renderer::{GridStyle, RenderContext, RenderResult, Renderer, RendererError};
use kurbo::{Affine, Point, Rect};
use peniko::Color;
use pixboard_core::SerializableColor;
use pixboard_core::raster::{self, skia_color};
use pixboard_core::surface::SoftwareSurface;
use tiny_skia::{Paint, PathBuilder, Pixmap, Stroke, StrokeDash, Transform};

/// Padding around exported content, in world units.
pub const EXPORT_PADDING: f64 = 20.0;

/// Largest side of an export, in pixels.
pub const MAX_EXPORT_SIDE: u32 = 16384;

/// Result of PNG rendering - straight RGBA pixel data and dimensions.
#[derive(Debug)]
pub struct PngRenderResult {
    /// RGBA pixel data (4 bytes per pixel).
    pub rgba_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PngRenderResult {
    pub fn from_pixmap(pixmap: &Pixmap) -> Self {
        let rgba_data = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        Self {
            rgba_data,
            width: pixmap.width(),
            height: pixmap.height(),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Resolution multiplier (1 = 1x, 2 = 2x).
    pub scale: f64,
    pub padding: f64,
    pub background: Color,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            padding: EXPORT_PADDING,
            background: Color::WHITE,
        }
    }
}

pub(crate) fn to_skia(color: Color) -> tiny_skia::Color {
    skia_color(SerializableColor::from(color))
}

pub(crate) fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_skia(color));
    paint.anti_alias = true;
    paint
}

/// Draws attached surface nodes through the viewport into a pixel buffer.
#[derive(Debug)]
pub struct SkiaCompositor {
    frame: Pixmap,
}

impl SkiaCompositor {
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let frame = Pixmap::new(width, height).ok_or(RendererError::InvalidSize(width, height))?;
        Ok(Self { frame })
    }

    /// The last rendered frame.
    pub fn frame(&self) -> &Pixmap {
        &self.frame
    }

    /// Resize the frame buffer if the target size changed.
    fn fit(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        let size = ctx.target_size();
        let (width, height) = (size.width.ceil() as u32, size.height.ceil() as u32);
        if (width, height) != (self.frame.width(), self.frame.height()) {
            log::debug!("Resizing frame to {width}x{height}");
            self.frame = Pixmap::new(width, height).ok_or(RendererError::InvalidSize(width, height))?;
        }
        Ok(())
    }

    /// Encode the last frame as PNG.
    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        Ok(raster::pixmap_to_png(&self.frame)?)
    }

    fn render_grid(&mut self, ctx: &RenderContext) {
        let step = ctx.grid_size * ctx.viewport.scale();
        // Too dense to be useful
        if step < 4.0 {
            return;
        }
        let visible = ctx.viewport.visible_world_rect();
        let first_x = (visible.x0 / ctx.grid_size).floor() as i64;
        let last_x = (visible.x1 / ctx.grid_size).ceil() as i64;
        let first_y = (visible.y0 / ctx.grid_size).floor() as i64;
        let last_y = (visible.y1 / ctx.grid_size).ceil() as i64;
        let size = ctx.target_size();
        let paint = solid(Color::from_rgba8(220, 220, 220, 255));

        match ctx.grid_style {
            GridStyle::None => {}
            GridStyle::Lines => {
                let mut pb = PathBuilder::new();
                for i in first_x..=last_x {
                    let x = ctx.viewport.world_to_screen(Point::new(i as f64 * ctx.grid_size, 0.0)).x;
                    pb.move_to(x as f32, 0.0);
                    pb.line_to(x as f32, size.height as f32);
                }
                for j in first_y..=last_y {
                    let y = ctx.viewport.world_to_screen(Point::new(0.0, j as f64 * ctx.grid_size)).y;
                    pb.move_to(0.0, y as f32);
                    pb.line_to(size.width as f32, y as f32);
                }
                if let Some(path) = pb.finish() {
                    let stroke = Stroke {
                        width: 1.0,
                        ..Stroke::default()
                    };
                    self.frame.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
                }
            }
            GridStyle::Dots => {
                let mut pb = PathBuilder::new();
                for i in first_x..=last_x {
                    for j in first_y..=last_y {
                        let p = ctx.viewport.world_to_screen(Point::new(
                            i as f64 * ctx.grid_size,
                            j as f64 * ctx.grid_size,
                        ));
                        pb.push_circle(p.x as f32, p.y as f32, 1.0);
                    }
                }
                if let Some(path) = pb.finish() {
                    self.frame
                        .fill_path(&path, &paint, tiny_skia::FillRule::Winding, Transform::identity(), None);
                }
            }
        }
    }

    fn render_outline(&mut self, rect: Rect, color: Color, dashed: bool) {
        let Some(skia_rect) = tiny_skia::Rect::from_ltrb(
            rect.x0 as f32,
            rect.y0 as f32,
            rect.x1 as f32,
            rect.y1 as f32,
        ) else {
            return;
        };
        let path = PathBuilder::from_rect(skia_rect);
        let mut stroke = Stroke {
            width: 1.0,
            ..Stroke::default()
        };
        if dashed {
            stroke.dash = StrokeDash::new(vec![4.0, 4.0], 0.0);
            let fill = color.with_alpha(0.1);
            self.frame
                .fill_path(&path, &solid(fill), tiny_skia::FillRule::Winding, Transform::identity(), None);
        }
        self.frame
            .stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
    }
}

impl Renderer for SkiaCompositor {
    fn render(&mut self, ctx: &RenderContext) -> RenderResult<()> {
        self.fit(ctx)?;
        self.frame.fill(to_skia(self.background_color(ctx)));
        self.render_grid(ctx);

        let view = ctx.viewport.transform();
        for node in ctx.surface.attached_nodes() {
            raster::paint_visual(&mut self.frame, &node.visual, view * node.transform);
        }

        for bounds in &ctx.selection {
            let screen = view.transform_rect_bbox(*bounds);
            self.render_outline(screen, ctx.selection_color, false);
        }
        if let Some(marquee) = ctx.marquee {
            self.render_outline(marquee, ctx.selection_color, true);
        }
        Ok(())
    }
}

/// Union of the world bounds of every attached node.
pub fn content_bounds(surface: &SoftwareSurface) -> Option<Rect> {
    surface
        .attached_nodes()
        .map(|node| node.world_bounds())
        .reduce(|acc, b| acc.union(b))
}

/// Render all content, cropped to its bounds plus padding.
pub fn export_pixmap(surface: &SoftwareSurface, options: &ExportOptions) -> RenderResult<Pixmap> {
    let bounds = content_bounds(surface).ok_or(RendererError::Empty)?;
    let padded = bounds.inflate(options.padding, options.padding);
    let scale = options.scale.max(f64::EPSILON);
    let width = (padded.width() * scale).ceil() as u32;
    let height = (padded.height() * scale).ceil() as u32;
    if width.max(height) > MAX_EXPORT_SIDE {
        return Err(RendererError::InvalidSize(width, height));
    }

    let mut pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize(width, height))?;
    pixmap.fill(to_skia(options.background));
    // Translate to origin, then scale up
    let transform = Affine::scale(scale) * Affine::translate((-padded.x0, -padded.y0));
    for node in surface.attached_nodes() {
        raster::paint_visual(&mut pixmap, &node.visual, transform * node.transform);
    }
    log::info!("Exported {width}x{height} image");
    Ok(pixmap)
}

/// [`export_pixmap`] encoded as PNG.
pub fn export_png(surface: &SoftwareSurface, options: &ExportOptions) -> RenderResult<Vec<u8>> {
    Ok(raster::pixmap_to_png(&export_pixmap(surface, options)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;
    use pixboard_core::shapes::{Geometry, ObjectSpec, Placement, Rectangle, Style};
    use pixboard_core::viewport::Viewport;
    use pixboard_core::Scene;

    fn red_square_scene() -> Scene<SoftwareSurface> {
        let mut scene = Scene::new(SoftwareSurface::new());
        let spec = ObjectSpec::new(
            Geometry::Rect(Rectangle::new(100.0, 100.0)),
            Style::filled(SerializableColor::rgb(255, 0, 0)),
            Placement::at(0.0, 0.0),
        );
        scene.create(spec, None).unwrap();
        scene
    }

    #[test]
    fn test_render_through_viewport() {
        let scene = red_square_scene();
        let mut viewport = Viewport::new(Size::new(400.0, 300.0));
        let mut compositor = SkiaCompositor::new(1, 1).unwrap();
        let ctx = RenderContext::new(scene.surface(), &viewport).with_background(Color::WHITE);
        compositor.render(&ctx).unwrap();

        let frame = compositor.frame();
        assert_eq!((frame.width(), frame.height()), (400, 300));
        // World origin sits at the screen center
        let center = frame.pixel(200, 150).unwrap();
        assert_eq!((center.red(), center.green(), center.alpha()), (255, 0, 255));
        let corner = frame.pixel(5, 5).unwrap();
        assert_eq!((corner.red(), corner.green()), (255, 255));

        // Panned away, the square leaves the frame
        viewport.drag_viewport(kurbo::Vec2::new(-1000.0, 0.0));
        let ctx = RenderContext::new(scene.surface(), &viewport).with_background(Color::WHITE);
        compositor.render(&ctx).unwrap();
        assert_eq!(compositor.frame().pixel(200, 150).unwrap().green(), 255);
    }

    #[test]
    fn test_overlays_do_not_fail() {
        let scene = red_square_scene();
        let viewport = Viewport::new(Size::new(200.0, 200.0));
        let mut compositor = SkiaCompositor::new(200, 200).unwrap();
        let ctx = RenderContext::new(scene.surface(), &viewport)
            .with_grid(GridStyle::Dots)
            .with_selection(vec![Rect::new(-50.0, -50.0, 50.0, 50.0)])
            .with_marquee(Some(Rect::new(10.0, 10.0, 60.0, 60.0)));
        compositor.render(&ctx).unwrap();
        let png = compositor.to_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn test_export_crops_to_content() {
        let scene = red_square_scene();
        let options = ExportOptions {
            scale: 2.0,
            ..ExportOptions::default()
        };
        let pixmap = export_pixmap(scene.surface(), &options).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (280, 280));
        assert_eq!(pixmap.pixel(140, 140).unwrap().green(), 0);
        assert_eq!(pixmap.pixel(2, 2).unwrap().green(), 255);

        let result = PngRenderResult::from_pixmap(&pixmap);
        assert_eq!(result.rgba_data.len(), 280 * 280 * 4);
    }

    #[test]
    fn test_export_empty_scene() {
        let surface = SoftwareSurface::new();
        assert!(matches!(
            export_png(&surface, &ExportOptions::default()),
            Err(RendererError::Empty)
        ));
    }

    #[test]
    fn test_grid_style_cycle() {
        assert_eq!(GridStyle::None.next(), GridStyle::Lines);
        assert_eq!(GridStyle::Dots.next().name(), "None");
    }
}
