//! Rectangle shape.

use super::{ObjectKind, ShapeTrait};
use kurbo::{BezPath, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// A rectangle centered on its anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    /// Width of the rectangle.
    pub width: f64,
    /// Height of the rectangle.
    pub height: f64,
}

impl Rectangle {
    /// Create a new rectangle.
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Get the rectangle as a kurbo Rect in local coordinates.
    pub fn as_rect(&self) -> Rect {
        Rect::new(
            -self.width / 2.0,
            -self.height / 2.0,
            self.width / 2.0,
            self.height / 2.0,
        )
    }
}

impl ShapeTrait for Rectangle {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Rect
    }

    fn local_bounds(&self) -> Rect {
        self.as_rect()
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_rectangle_centered() {
        let rect = Rectangle::new(100.0, 50.0);
        let bounds = rect.local_bounds();
        assert!((bounds.x0 + 50.0).abs() < f64::EPSILON);
        assert!((bounds.y0 + 25.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 50.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test() {
        let rect = Rectangle::new(100.0, 100.0);
        assert!(rect.hit_test(Point::new(0.0, 0.0), 0.0));
        assert!(!rect.hit_test(Point::new(60.0, 0.0), 0.0));
        assert!(rect.hit_test(Point::new(55.0, 0.0), 10.0)); // Within tolerance
    }
}
