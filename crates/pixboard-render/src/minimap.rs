//! Overview of the whole canvas with the visible area outlined.

use crate::compositor::{solid, to_skia};
use crate::renderer::{RenderResult, RendererError};
use kurbo::{Affine, Point, Rect, Size, Vec2};
use peniko::Color;
use pixboard_core::raster;
use pixboard_core::surface::SoftwareSurface;
use pixboard_core::viewport::{Viewport, world_bounds};
use tiny_skia::{PathBuilder, Pixmap, Stroke, Transform};

/// Default minimap size in pixels.
pub const MINIMAP_WIDTH: u32 = 200;
pub const MINIMAP_HEIGHT: u32 = 150;

/// Where the world lands inside a minimap of a given size.
#[derive(Debug, Clone, Copy)]
pub struct MinimapLayout {
    world: Rect,
    scale: f64,
    offset: Vec2,
}

impl MinimapLayout {
    /// Fit the content bounds (plus margin) into `size`, centered.
    pub fn new(surface: &SoftwareSurface, size: Size) -> Self {
        let world = world_bounds(surface.attached_nodes().map(|node| node.world_bounds()));
        let scale = (size.width / world.width()).min(size.height / world.height());
        let offset = Vec2::new(
            (size.width - world.width() * scale) / 2.0,
            (size.height - world.height() * scale) / 2.0,
        );
        Self {
            world,
            scale,
            offset,
        }
    }

    /// World area the minimap covers.
    pub fn world(&self) -> Rect {
        self.world
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// World → minimap pixels.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset)
            * Affine::scale(self.scale)
            * Affine::translate(-self.world.origin().to_vec2())
    }

    pub fn to_world(&self, point: Point) -> Point {
        self.transform().inverse() * point
    }

    /// Center the viewport on the world point under a minimap click.
    pub fn navigate(&self, viewport: &mut Viewport, point: Point) {
        viewport.center_on(self.to_world(point));
    }
}

/// Draw the minimap: dimmed backdrop, content, the visible area and a border.
pub fn render_minimap(
    surface: &SoftwareSurface,
    viewport: &Viewport,
    width: u32,
    height: u32,
) -> RenderResult<Pixmap> {
    let mut pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize(width, height))?;
    pixmap.fill(to_skia(Color::from_rgba8(0, 0, 0, 178)));

    let layout = MinimapLayout::new(surface, Size::new(width as f64, height as f64));
    let transform = layout.transform();
    for node in surface.attached_nodes() {
        raster::paint_visual(&mut pixmap, &node.visual, transform * node.transform);
    }

    let visible = transform.transform_rect_bbox(viewport.visible_world_rect());
    outline(&mut pixmap, visible, Color::from_rgba8(255, 80, 80, 255), 1.0);
    let frame = Rect::new(1.0, 1.0, width as f64 - 1.0, height as f64 - 1.0);
    outline(&mut pixmap, frame, Color::WHITE, 2.0);
    Ok(pixmap)
}

fn outline(pixmap: &mut Pixmap, rect: Rect, color: Color, width: f32) {
    let Some(rect) =
        tiny_skia::Rect::from_ltrb(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
    else {
        return;
    };
    let path = PathBuilder::from_rect(rect);
    let stroke = Stroke {
        width,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &solid(color), &stroke, Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixboard_core::shapes::{Geometry, ObjectSpec, Placement, Rectangle, Style};
    use pixboard_core::{Scene, SerializableColor};

    fn scene() -> Scene<SoftwareSurface> {
        let mut scene = Scene::new(SoftwareSurface::new());
        for x in [0.0, 400.0] {
            let spec = ObjectSpec::new(
                Geometry::Rect(Rectangle::new(100.0, 100.0)),
                Style::filled(SerializableColor::rgb(0, 255, 0)),
                Placement::at(x, 0.0),
            );
            scene.create(spec, None).unwrap();
        }
        scene
    }

    #[test]
    fn test_layout_fits_content() {
        let scene = scene();
        let layout = MinimapLayout::new(scene.surface(), Size::new(200.0, 150.0));
        // Content spans -50..450 x -50..50, plus a 50 margin on each side
        assert_eq!(layout.world(), Rect::new(-100.0, -100.0, 500.0, 100.0));
        assert!((layout.scale() - 200.0 / 600.0).abs() < 1e-9);

        let corner = layout.transform() * Point::new(-100.0, -100.0);
        assert!(corner.x.abs() < 1e-9);
        assert!((corner.y - (150.0 - 200.0 / 3.0) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_layout_uses_default_area() {
        let surface = SoftwareSurface::new();
        let layout = MinimapLayout::new(&surface, Size::new(200.0, 200.0));
        assert_eq!(layout.world(), Rect::new(-100.0, -100.0, 100.0, 100.0));
        assert!((layout.scale() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_draws_content() {
        let scene = scene();
        let viewport = Viewport::new(Size::new(800.0, 600.0));
        let pixmap = render_minimap(scene.surface(), &viewport, MINIMAP_WIDTH, MINIMAP_HEIGHT).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (200, 150));

        let layout = MinimapLayout::new(scene.surface(), Size::new(200.0, 150.0));
        // Off the visible-area outline, which crosses the box center
        let right_box = layout.transform() * Point::new(420.0, 20.0);
        let pixel = pixmap.pixel(right_box.x as u32, right_box.y as u32).unwrap();
        assert_eq!((pixel.red(), pixel.green()), (0, 255));
    }

    #[test]
    fn test_navigate_centers_viewport() {
        let scene = scene();
        let mut viewport = Viewport::new(Size::new(800.0, 600.0));
        let layout = MinimapLayout::new(scene.surface(), Size::new(200.0, 150.0));
        let click = layout.transform() * Point::new(400.0, 0.0);
        layout.navigate(&mut viewport, click);
        assert!((viewport.x - 400.0).abs() < 1e-9);
        assert!(viewport.y.abs() < 1e-9);
    }

    #[test]
    fn test_zero_size_rejected() {
        let surface = SoftwareSurface::new();
        let viewport = Viewport::default();
        assert!(matches!(
            render_minimap(&surface, &viewport, 0, 10),
            Err(RendererError::InvalidSize(0, 10))
        ));
    }
}
