//! Viewport module for pan/zoom transforms.

use crate::config::EditorConfig;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Margin added around content by [`world_bounds`].
pub const WORLD_MARGIN: f64 = 50.0;

/// Persisted part of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

/// Viewport manages the view transform for the canvas.
///
/// `(x, y)` is the world point shown at the center of the screen. Converting
/// between screen and world coordinates:
///
/// ```text
/// world  = pos + (screen - center) / scale
/// screen = (world - pos) * scale + center
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    scale: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Increment used by zoom in/out.
    pub scale_step: f64,
    /// Screen size in pixels.
    pub screen: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            min_scale: 0.1,
            max_scale: 10.0,
            scale_step: 0.1,
            screen: Size::new(800.0, 600.0),
        }
    }
}

impl Viewport {
    pub fn new(screen: Size) -> Self {
        Self {
            screen,
            ..Self::default()
        }
    }

    pub fn from_config(config: &EditorConfig, screen: Size) -> Self {
        Self {
            min_scale: config.min_scale,
            max_scale: config.max_scale,
            scale_step: config.scale_step,
            ..Self::new(screen)
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn screen_center(&self) -> Point {
        Point::new(self.screen.width / 2.0, self.screen.height / 2.0)
    }

    /// Set the scale, clamped to `[min_scale, max_scale]`.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.max(self.min_scale).min(self.max_scale);
    }

    pub fn set_screen_size(&mut self, screen: Size) {
        self.screen = screen;
    }

    /// Zoom level formatted for display, e.g. `150%`.
    pub fn scale_percent(&self) -> String {
        format!("{}%", (self.scale * 100.0).round() as i64)
    }

    /// World → screen transform for rendering.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.screen_center().to_vec2())
            * Affine::scale(self.scale)
            * Affine::translate(-self.position().to_vec2())
    }

    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.position() + (screen_point - self.screen_center()) / self.scale
    }

    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.screen_center() + (world_point - self.position()) * self.scale
    }

    /// Screen rectangle → world rectangle.
    pub fn screen_rect_to_world(&self, rect: Rect) -> Rect {
        Rect::from_points(
            self.screen_to_world(rect.origin()),
            self.screen_to_world(Point::new(rect.x1, rect.y1)),
        )
    }

    /// World-space area currently on screen.
    pub fn visible_world_rect(&self) -> Rect {
        self.screen_rect_to_world(self.screen.to_rect())
    }

    /// Change the scale to `scale` while keeping the world point under
    /// `cursor` fixed on screen.
    fn rescale_around(&mut self, cursor: Point, scale: f64) {
        let anchor = self.screen_to_world(cursor);
        self.set_scale(scale);
        let pos = anchor - (cursor - self.screen_center()) / self.scale;
        self.x = pos.x;
        self.y = pos.y;
    }

    /// Additive zoom anchored at a screen point.
    pub fn scale_viewport(&mut self, cursor: Point, delta: f64) {
        self.rescale_around(cursor, self.scale + delta);
    }

    /// Multiplicative zoom anchored at a screen point.
    pub fn zoom_at(&mut self, cursor: Point, factor: f64) {
        self.rescale_around(cursor, self.scale * factor);
    }

    pub fn zoom_in(&mut self) {
        self.scale_viewport(self.screen_center(), self.scale_step);
    }

    pub fn zoom_out(&mut self) {
        self.scale_viewport(self.screen_center(), -self.scale_step);
    }

    /// Pan by a screen-space delta: content follows the pointer.
    pub fn drag_viewport(&mut self, delta: Vec2) {
        self.x -= delta.x / self.scale;
        self.y -= delta.y / self.scale;
    }

    /// Put a world point at the screen center, keeping the zoom.
    pub fn center_on(&mut self, world: Point) {
        self.x = world.x;
        self.y = world.y;
    }

    /// Reset to the origin at 100%.
    pub fn reset(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
        self.scale = 1.0;
    }

    /// Fit the viewport to show the given world rectangle.
    pub fn fit_to_bounds(&mut self, bounds: Rect, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }

        let available = Size::new(
            (self.screen.width - padding * 2.0).max(1.0),
            (self.screen.height - padding * 2.0).max(1.0),
        );
        let scale_x = available.width / bounds.width();
        let scale_y = available.height / bounds.height();
        self.set_scale(scale_x.min(scale_y));

        let center = bounds.center();
        self.x = center.x;
        self.y = center.y;
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            x: self.x,
            y: self.y,
            scale: self.scale,
        }
    }

    pub fn apply_state(&mut self, state: ViewportState) {
        self.x = state.x;
        self.y = state.y;
        self.set_scale(state.scale);
    }
}

/// Union of the given bounds plus [`WORLD_MARGIN`], or
/// `[-100, -100, 100, 100]` when there are none.
pub fn world_bounds(bounds: impl IntoIterator<Item = Rect>) -> Rect {
    bounds
        .into_iter()
        .reduce(|acc, r| acc.union(r))
        .map(|r| r.inflate(WORLD_MARGIN, WORLD_MARGIN))
        .unwrap_or(Rect::new(-100.0, -100.0, 100.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(Size::new(800.0, 600.0))
    }

    #[test]
    fn test_default_viewport() {
        let vp = viewport();
        assert!((vp.scale() - 1.0).abs() < f64::EPSILON);
        assert_eq!(vp.scale_percent(), "100%");
        let center = vp.screen_to_world(Point::new(400.0, 300.0));
        assert!(center.x.abs() < f64::EPSILON);
        assert!(center.y.abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_world_with_offset_and_scale() {
        let mut vp = viewport();
        vp.x = 50.0;
        vp.y = -20.0;
        vp.set_scale(2.0);
        let world = vp.screen_to_world(Point::new(500.0, 300.0));
        assert!((world.x - 100.0).abs() < f64::EPSILON);
        assert!((world.y + 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut vp = viewport();
        vp.x = 30.0;
        vp.y = -20.0;
        vp.set_scale(1.5);

        let original = Point::new(123.0, 456.0);
        let back = vp.world_to_screen(vp.screen_to_world(original));
        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);

        let via_affine = vp.transform() * vp.screen_to_world(original);
        assert!((via_affine.x - original.x).abs() < 1e-10);
        assert!((via_affine.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_scale_clamp() {
        let mut vp = viewport();
        vp.set_scale(999.0);
        assert!((vp.scale() - 10.0).abs() < f64::EPSILON);
        vp.set_scale(0.0001);
        assert!((vp.scale() - 0.1).abs() < f64::EPSILON);
        vp.zoom_at(Point::ZERO, 0.001);
        assert!((vp.scale() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scale_percent_rounds() {
        let mut vp = viewport();
        vp.set_scale(1.234);
        assert_eq!(vp.scale_percent(), "123%");
        vp.set_scale(0.555);
        assert_eq!(vp.scale_percent(), "56%");
    }

    #[test]
    fn test_zoom_keeps_cursor_anchor() {
        let mut vp = viewport();
        vp.x = 12.0;
        vp.y = 7.0;
        let cursor = Point::new(650.0, 120.0);
        let before = vp.screen_to_world(cursor);

        vp.scale_viewport(cursor, 0.7);
        let after = vp.screen_to_world(cursor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);

        vp.zoom_at(cursor, 0.25);
        let after = vp.screen_to_world(cursor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_steps() {
        let mut vp = viewport();
        vp.zoom_in();
        assert_eq!(vp.scale_percent(), "110%");
        vp.zoom_out();
        vp.zoom_out();
        assert_eq!(vp.scale_percent(), "90%");
    }

    #[test]
    fn test_drag_and_reset() {
        let mut vp = viewport();
        vp.set_scale(2.0);
        vp.drag_viewport(Vec2::new(20.0, -10.0));
        assert!((vp.x + 10.0).abs() < f64::EPSILON);
        assert!((vp.y - 5.0).abs() < f64::EPSILON);
        vp.reset();
        assert_eq!(vp.state(), ViewportState { x: 0.0, y: 0.0, scale: 1.0 });
    }

    #[test]
    fn test_fit_to_bounds() {
        let mut vp = viewport();
        vp.fit_to_bounds(Rect::new(0.0, 0.0, 400.0, 100.0), 0.0);
        assert!((vp.scale() - 2.0).abs() < f64::EPSILON);
        assert!((vp.x - 200.0).abs() < f64::EPSILON);
        assert!((vp.y - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_world_bounds() {
        let empty = world_bounds(std::iter::empty());
        assert_eq!(empty, Rect::new(-100.0, -100.0, 100.0, 100.0));
        let bounds = world_bounds([
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(20.0, -5.0, 30.0, 5.0),
        ]);
        assert_eq!(bounds, Rect::new(-50.0, -55.0, 80.0, 60.0));
    }
}
