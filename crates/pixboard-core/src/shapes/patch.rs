//! Generic property patches.
//!
//! Every mutation of a scene object goes through [`ObjectSpec::apply_patch`],
//! which returns the inverse patch so history commands can replay changes in
//! both directions without knowing which tool produced them.

use super::{Geometry, ObjectSpec, SerializableColor};
use kurbo::Point;

/// A sparse set of property changes. `None` leaves a property untouched.
///
/// Nullable colors use `Option<Option<_>>`: `Some(None)` clears the color.
/// Kind-specific fields are ignored for other kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapePatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub rotation: Option<f64>,

    pub width: Option<f64>,
    pub height: Option<f64>,
    pub radius: Option<f64>,
    pub size: Option<f64>,

    pub fill: Option<Option<SerializableColor>>,
    pub border_width: Option<f64>,
    pub border_color: Option<Option<SerializableColor>>,
    pub opacity: Option<f64>,

    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub text_color: Option<SerializableColor>,
    pub text_background: Option<Option<SerializableColor>>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub line_through: Option<bool>,

    pub tint: Option<Option<SerializableColor>>,
    pub filters: Option<Vec<String>>,
}

impl ShapePatch {
    /// Move to a world position.
    pub fn position(point: Point) -> Self {
        Self {
            x: Some(point.x),
            y: Some(point.y),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether only placement fields are set.
    pub fn is_placement_only(&self) -> bool {
        let placement = Self {
            x: self.x,
            y: self.y,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            rotation: self.rotation,
            ..Self::default()
        };
        *self == placement
    }

    /// Whether the patch can be applied to an object whose visual is an
    /// erasable raster (placement, opacity, tint and filters only).
    pub fn is_raster_compatible(&self) -> bool {
        let allowed = Self {
            x: self.x,
            y: self.y,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            rotation: self.rotation,
            opacity: self.opacity,
            tint: self.tint,
            filters: self.filters.clone(),
            ..Self::default()
        };
        *self == allowed
    }
}

/// Replace `slot` with the patched value and remember the previous one.
fn swap<T: Clone>(slot: &mut T, new: &Option<T>, old: &mut Option<T>) {
    if let Some(value) = new {
        *old = Some(std::mem::replace(slot, value.clone()));
    }
}

impl ObjectSpec {
    /// Apply a patch in place and return the patch that undoes it.
    pub fn apply_patch(&mut self, patch: &ShapePatch) -> ShapePatch {
        let mut inverse = ShapePatch::default();

        let placement = &mut self.placement;
        swap(&mut placement.x, &patch.x, &mut inverse.x);
        swap(&mut placement.y, &patch.y, &mut inverse.y);
        swap(&mut placement.scale_x, &patch.scale_x, &mut inverse.scale_x);
        swap(&mut placement.scale_y, &patch.scale_y, &mut inverse.scale_y);
        swap(&mut placement.rotation, &patch.rotation, &mut inverse.rotation);

        let style = &mut self.style;
        swap(&mut style.opacity, &patch.opacity, &mut inverse.opacity);

        match &mut self.geometry {
            Geometry::Rect(rect) => {
                swap(&mut rect.width, &patch.width, &mut inverse.width);
                swap(&mut rect.height, &patch.height, &mut inverse.height);
            }
            Geometry::Circle(circle) => {
                swap(&mut circle.radius, &patch.radius, &mut inverse.radius);
            }
            Geometry::Triangle(tri) => {
                swap(&mut tri.size, &patch.size, &mut inverse.size);
            }
            Geometry::Text(text) => {
                swap(&mut text.content, &patch.text, &mut inverse.text);
                let ts = &mut text.style;
                swap(&mut ts.font_family, &patch.font_family, &mut inverse.font_family);
                swap(&mut ts.font_size, &patch.font_size, &mut inverse.font_size);
                swap(&mut ts.fill, &patch.text_color, &mut inverse.text_color);
                swap(&mut ts.background, &patch.text_background, &mut inverse.text_background);
                swap(&mut ts.bold, &patch.bold, &mut inverse.bold);
                swap(&mut ts.italic, &patch.italic, &mut inverse.italic);
                swap(&mut ts.underline, &patch.underline, &mut inverse.underline);
                swap(&mut ts.line_through, &patch.line_through, &mut inverse.line_through);
            }
            Geometry::Image(img) => {
                swap(&mut img.tint, &patch.tint, &mut inverse.tint);
                swap(&mut img.filters, &patch.filters, &mut inverse.filters);
            }
        }

        // Fill and border only apply to the primitive shapes
        if matches!(
            self.geometry,
            Geometry::Rect(_) | Geometry::Circle(_) | Geometry::Triangle(_)
        ) {
            let style = &mut self.style;
            swap(&mut style.fill, &patch.fill, &mut inverse.fill);
            swap(&mut style.border_width, &patch.border_width, &mut inverse.border_width);
            swap(&mut style.border_color, &patch.border_color, &mut inverse.border_color);
        }

        inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Circle, Placement, Rectangle, Style, Text};

    fn rect_spec() -> ObjectSpec {
        ObjectSpec::new(
            Geometry::Rect(Rectangle::new(100.0, 100.0)),
            Style::filled(SerializableColor::rgb(255, 0, 0)),
            Placement::at(0.0, 0.0),
        )
    }

    #[test]
    fn test_inverse_restores() {
        let mut spec = rect_spec();
        let original = spec.clone();
        let patch = ShapePatch {
            x: Some(50.0),
            width: Some(20.0),
            fill: Some(None),
            ..ShapePatch::default()
        };
        let inverse = spec.apply_patch(&patch);
        assert!((spec.placement.x - 50.0).abs() < f64::EPSILON);
        assert_eq!(spec.style.fill, None);

        let redo = spec.apply_patch(&inverse);
        assert_eq!(spec, original);
        assert_eq!(redo, patch);
    }

    #[test]
    fn test_foreign_fields_ignored() {
        let mut spec = ObjectSpec::new(
            Geometry::Circle(Circle::new(10.0)),
            Style::default(),
            Placement::default(),
        );
        let inverse = spec.apply_patch(&ShapePatch {
            width: Some(5.0),
            text: Some("nope".into()),
            ..ShapePatch::default()
        });
        assert!(inverse.is_empty());
    }

    #[test]
    fn test_text_patch() {
        let mut spec = ObjectSpec::new(
            Geometry::Text(Text::new("a")),
            Style::default(),
            Placement::default(),
        );
        let inverse = spec.apply_patch(&ShapePatch {
            text: Some("b".into()),
            bold: Some(true),
            ..ShapePatch::default()
        });
        let text = spec.geometry.as_text().unwrap();
        assert_eq!(text.content, "b");
        assert!(text.style.bold);
        assert_eq!(inverse.text.as_deref(), Some("a"));
        assert_eq!(inverse.bold, Some(false));
    }

    #[test]
    fn test_patch_classification() {
        assert!(ShapePatch::position(Point::new(1.0, 2.0)).is_placement_only());
        let tint = ShapePatch {
            tint: Some(Some(SerializableColor::black())),
            ..ShapePatch::default()
        };
        assert!(tint.is_raster_compatible());
        assert!(!tint.is_placement_only());
        let width = ShapePatch {
            width: Some(3.0),
            ..ShapePatch::default()
        };
        assert!(!width.is_raster_compatible());
    }
}
