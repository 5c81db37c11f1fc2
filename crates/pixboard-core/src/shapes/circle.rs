//! Circle shape.

use super::{ObjectKind, ShapeTrait};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// A circle centered on its anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub radius: f64,
}

impl Circle {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }
}

impl ShapeTrait for Circle {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Circle
    }

    fn local_bounds(&self) -> Rect {
        Rect::new(-self.radius, -self.radius, self.radius, self.radius)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point.to_vec2().hypot() <= self.radius + tolerance
    }

    fn to_path(&self) -> BezPath {
        kurbo::Circle::new(Point::ZERO, self.radius).to_path(0.1)
    }
}
