//! Erase engine.
//!
//! Two tiers: a coarse pass removes whole objects whose bounding box is
//! within the eraser circle, and a fine pass clears alpha from an object's
//! offscreen raster along the pointer stroke.

use crate::command::RasterChange;
use crate::scene::{Scene, SceneResult};
use crate::shapes::ObjectId;
use crate::surface::DrawSurface;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiny_skia::{BlendMode, FillRule, LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};

/// What the eraser removes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EraseMode {
    /// Soft-delete whole objects.
    #[default]
    Object,
    /// Clear pixels along the stroke.
    Pixel,
}

/// Whether a circle touches an axis-aligned rectangle (boundary inclusive).
pub fn circle_hits_rect(center: Point, radius: f64, rect: Rect) -> bool {
    let closest = Point::new(
        center.x.clamp(rect.x0, rect.x1),
        center.y.clamp(rect.y0, rect.y1),
    );
    (center - closest).hypot2() <= radius * radius
}

/// Live objects whose world bounds the eraser circle touches, in z-order.
pub fn objects_under_circle<S: DrawSurface>(
    scene: &Scene<S>,
    center: Point,
    radius: f64,
) -> Vec<ObjectId> {
    scene
        .live()
        .filter(|obj| {
            scene
                .world_bounds(obj.id())
                .is_some_and(|bounds| circle_hits_rect(center, radius, bounds))
        })
        .map(|obj| obj.id())
        .collect()
}

/// Clear pixels along a segment with a round-capped line of `width`.
/// Coordinates are in the pixmap's pixel space. A zero-length segment
/// clears a disc.
pub fn erase_stroke(pixmap: &mut Pixmap, from: Point, to: Point, width: f64) {
    let mut paint = Paint::default();
    paint.set_color(tiny_skia::Color::BLACK);
    paint.anti_alias = true;
    paint.blend_mode = BlendMode::DestinationOut;

    if (to - from).hypot2() < f64::EPSILON {
        let radius = (width / 2.0) as f32;
        if let Some(disc) = PathBuilder::from_circle(from.x as f32, from.y as f32, radius) {
            pixmap.fill_path(&disc, &paint, FillRule::Winding, Transform::identity(), None);
        }
        return;
    }

    let mut pb = PathBuilder::new();
    pb.move_to(from.x as f32, from.y as f32);
    pb.line_to(to.x as f32, to.y as f32);
    let Some(path) = pb.finish() else {
        return;
    };
    let stroke = Stroke {
        width: width as f32,
        line_cap: LineCap::Round,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

/// One fine-erase stroke, from the first sample until it is finished.
///
/// Remembers the previous pointer position and the raster of every touched
/// object as it was before the stroke.
#[derive(Debug, Default)]
pub struct EraseStroke {
    last: Option<Point>,
    before: Vec<(ObjectId, Option<Arc<Pixmap>>)>,
}

impl EraseStroke {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty()
    }

    /// Erase from the previous sample to `point` (world space).
    ///
    /// Returns the ids painted by this segment.
    pub fn sample<S: DrawSurface>(
        &mut self,
        scene: &mut Scene<S>,
        point: Point,
        radius: f64,
    ) -> SceneResult<Vec<ObjectId>> {
        let from = self.last.replace(point).unwrap_or(point);
        let reach = Rect::from_points(from, point).inflate(radius, radius);

        let candidates: Vec<ObjectId> = scene
            .live()
            .filter(|obj| obj.spec().geometry.supports_pixel_erase())
            .filter(|obj| {
                scene.world_bounds(obj.id()).is_some_and(|b| {
                    b.x0 <= reach.x1 && b.x1 >= reach.x0 && b.y0 <= reach.y1 && b.y1 >= reach.y0
                })
            })
            .map(|obj| obj.id())
            .collect();

        for &id in &candidates {
            if !self.before.iter().any(|(touched, _)| *touched == id) {
                self.before.push((id, scene.raster_snapshot(id)));
            }
            scene.ensure_erasable(id)?;
            scene.erase_segment(id, from, point, radius)?;
        }
        if !candidates.is_empty() {
            log::debug!("Erased pixels of {} objects", candidates.len());
        }
        Ok(candidates)
    }

    /// Finish the stroke, pairing each touched object's raster before and
    /// after it.
    pub fn finish<S: DrawSurface>(self, scene: &Scene<S>) -> Vec<RasterChange> {
        self.before
            .into_iter()
            .filter_map(|(id, before)| {
                scene
                    .raster_snapshot(id)
                    .map(|after| RasterChange { id, before, after })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{new_pixmap, opaque_pixel_count};
    use tiny_skia::Color;

    #[test]
    fn test_circle_on_corner_hits() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r = 10.0;
        assert!(circle_hits_rect(Point::new(0.0, 0.0), r, rect));
        assert!(circle_hits_rect(Point::new(-r, 0.0), r, rect));
        assert!(!circle_hits_rect(Point::new(-r - 1e-6, 0.0), r, rect));

        // Diagonal distance from the corner
        let d = r / 2f64.sqrt();
        assert!(circle_hits_rect(Point::new(100.0 + d, 100.0 + d), r, rect));
        assert!(!circle_hits_rect(
            Point::new(100.0 + d + 1e-6, 100.0 + d + 1e-6),
            r,
            rect
        ));
    }

    #[test]
    fn test_circle_inside_rect_hits() {
        let rect = Rect::new(-5.0, -5.0, 5.0, 5.0);
        assert!(circle_hits_rect(Point::ZERO, 0.5, rect));
    }

    fn opaque(width: u32, height: u32) -> Pixmap {
        let mut pixmap = new_pixmap(width, height).unwrap();
        pixmap.fill(Color::from_rgba8(0, 128, 0, 255));
        pixmap
    }

    #[test]
    fn test_erase_stroke_clears_along_segment_only() {
        let mut pixmap = opaque(40, 40);
        erase_stroke(&mut pixmap, Point::new(5.0, 20.0), Point::new(35.0, 20.0), 6.0);
        assert_eq!(pixmap.pixel(20, 20).unwrap().alpha(), 0);
        assert_eq!(pixmap.pixel(5, 20).unwrap().alpha(), 0);
        assert_eq!(pixmap.pixel(20, 5).unwrap().alpha(), 255);
        assert_eq!(pixmap.pixel(20, 35).unwrap().alpha(), 255);
    }

    #[test]
    fn test_zero_length_segment_clears_disc() {
        let mut pixmap = opaque(20, 20);
        let before = opaque_pixel_count(&pixmap);
        erase_stroke(&mut pixmap, Point::new(10.0, 10.0), Point::new(10.0, 10.0), 8.0);
        assert_eq!(pixmap.pixel(10, 10).unwrap().alpha(), 0);
        assert_eq!(pixmap.pixel(0, 0).unwrap().alpha(), 255);
        assert!(opaque_pixel_count(&pixmap) < before);
    }
}
