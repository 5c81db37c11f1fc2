//! Isosceles triangle shape.

use super::{ObjectKind, ShapeTrait};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// An upward-pointing triangle inscribed in a `size` × `size` box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub size: f64,
}

impl Triangle {
    pub fn new(size: f64) -> Self {
        Self { size }
    }

    /// Apex, bottom-right and bottom-left vertices.
    pub fn vertices(&self) -> [Point; 3] {
        let half = self.size / 2.0;
        [
            Point::new(0.0, -half),
            Point::new(half, half),
            Point::new(-half, half),
        ]
    }
}

impl ShapeTrait for Triangle {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Triangle
    }

    fn local_bounds(&self) -> Rect {
        let half = self.size / 2.0;
        Rect::new(-half, -half, half, half)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        if !self.local_bounds().inflate(tolerance, tolerance).contains(point) {
            return false;
        }
        if self.to_path().contains(point) {
            return true;
        }
        let [a, b, c] = self.vertices();
        super::point_to_segment_dist(point, a, b) <= tolerance
            || super::point_to_segment_dist(point, b, c) <= tolerance
            || super::point_to_segment_dist(point, c, a) <= tolerance
    }

    fn to_path(&self) -> BezPath {
        let [a, b, c] = self.vertices();
        let mut path = BezPath::new();
        path.move_to(a);
        path.line_to(b);
        path.line_to(c);
        path.close_path();
        path
    }
}
