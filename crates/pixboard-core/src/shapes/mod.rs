//! Geometry and style value types for scene objects.

mod circle;
mod image;
mod patch;
mod rectangle;
mod text;
mod triangle;

pub use circle::Circle;
pub use image::{Image, ImageFormat};
pub use patch::ShapePatch;
pub use rectangle::Rectangle;
pub use text::{Text, TextStyle};
pub use triangle::Triangle;

use kurbo::{Affine, BezPath, Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a scene object, unique and monotonic within a session.
pub type ObjectId = u64;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn black() -> Self {
        Self::rgb(0, 0, 0)
    }

    pub fn white() -> Self {
        Self::rgb(255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    ///
    /// Returns `None` for anything else, including `transparent`.
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                let r = channel(0..1)?;
                let g = channel(1..2)?;
                let b = channel(2..3)?;
                Some(Self::rgb(r * 17, g * 17, b * 17))
            }
            6 => Some(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// This color with its alpha multiplied by `opacity`.
    pub fn with_opacity(&self, opacity: f64) -> Self {
        let alpha = (self.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
        Self::new(self.r, self.g, self.b, alpha)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Closed set of object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Rect,
    Circle,
    Triangle,
    Text,
    Image,
}

impl ObjectKind {
    /// Tag used in serialized records.
    pub fn tag(&self) -> &'static str {
        match self {
            ObjectKind::Rect => "rect",
            ObjectKind::Circle => "circle",
            ObjectKind::Triangle => "triangle",
            ObjectKind::Text => "text",
            ObjectKind::Image => "image",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Kinds placed through `begin_shape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Rect,
    Circle,
    Triangle,
}

/// Position, scale and rotation of an object around its center anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in radians.
    pub rotation: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self::at(0.0, 0.0)
    }
}

impl Placement {
    /// Unscaled, unrotated placement centered on `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Local → world transform.
    pub fn affine(&self) -> Affine {
        Affine::translate((self.x, self.y))
            * Affine::rotate(self.rotation)
            * Affine::scale_non_uniform(self.scale_x, self.scale_y)
    }

    /// Uniform scale used to compensate brush sizes in local space.
    pub fn scale_factor(&self) -> f64 {
        (self.scale_x.abs() * self.scale_y.abs()).sqrt()
    }
}

/// Fill, border and opacity of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// Fill color (None = no fill).
    pub fill: Option<SerializableColor>,
    /// Border width; no border is drawn when zero.
    pub border_width: f64,
    /// Border color (None = no border).
    pub border_color: Option<SerializableColor>,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Some(SerializableColor::white()),
            border_width: 0.0,
            border_color: None,
            opacity: 1.0,
        }
    }
}

impl Style {
    /// A style with only a fill color.
    pub fn filled(color: SerializableColor) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    /// Border width and color, if a border should be drawn.
    pub fn border(&self) -> Option<(f64, SerializableColor)> {
        match self.border_color {
            Some(color) if self.border_width > 0.0 => Some((self.border_width, color)),
            _ => None,
        }
    }

    /// Fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<SerializableColor> {
        self.fill.map(|c| c.with_opacity(self.opacity))
    }

    /// Border color with opacity applied.
    pub fn border_with_opacity(&self) -> Option<(f64, SerializableColor)> {
        self.border().map(|(w, c)| (w, c.with_opacity(self.opacity)))
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (pv - seg * t).hypot()
}

/// Common trait for all geometry payloads.
///
/// Everything is expressed in local, unscaled units around the center anchor.
pub trait ShapeTrait {
    /// The kind tag.
    fn kind(&self) -> ObjectKind;

    /// Bounding box in local coordinates.
    fn local_bounds(&self) -> Rect;

    /// Check if a local point hits this shape.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.local_bounds().inflate(tolerance, tolerance).contains(point)
    }

    /// Outline path in local coordinates.
    fn to_path(&self) -> BezPath;
}

/// Kind-specific geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Rect(Rectangle),
    Circle(Circle),
    Triangle(Triangle),
    Text(Text),
    Image(Image),
}

impl Geometry {
    fn as_shape(&self) -> &dyn ShapeTrait {
        match self {
            Geometry::Rect(s) => s,
            Geometry::Circle(s) => s,
            Geometry::Triangle(s) => s,
            Geometry::Text(s) => s,
            Geometry::Image(s) => s,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.as_shape().kind()
    }

    pub fn local_bounds(&self) -> Rect {
        self.as_shape().local_bounds()
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.as_shape().hit_test(point, tolerance)
    }

    pub fn to_path(&self) -> BezPath {
        self.as_shape().to_path()
    }

    /// Whether the fine erase pass may rasterize this geometry.
    ///
    /// Text has no glyph rasterizer in the core and stays vector-only.
    pub fn supports_pixel_erase(&self) -> bool {
        !matches!(self, Geometry::Text(_))
    }

    /// Default geometry for a primitive placed by the shape tool.
    pub fn primitive(kind: PrimitiveKind, config: &crate::config::EditorConfig) -> Self {
        match kind {
            PrimitiveKind::Rect => {
                Geometry::Rect(Rectangle::new(config.rect_width, config.rect_height))
            }
            PrimitiveKind::Circle => Geometry::Circle(Circle::new(config.circle_radius)),
            PrimitiveKind::Triangle => Geometry::Triangle(Triangle::new(config.triangle_size)),
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Geometry::Image(img) => Some(img),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Geometry::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Everything needed to (re)build an object: captured by creation commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub geometry: Geometry,
    pub style: Style,
    pub placement: Placement,
}

impl ObjectSpec {
    pub fn new(geometry: Geometry, style: Style, placement: Placement) -> Self {
        Self {
            geometry,
            style,
            placement,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.geometry.kind()
    }

    /// Axis-aligned world bounds.
    pub fn world_bounds(&self) -> Rect {
        self.placement
            .affine()
            .transform_rect_bbox(self.geometry.local_bounds())
    }

    /// Hit test a world point against the actual shape.
    pub fn hit_test_world(&self, point: Point, tolerance: f64) -> bool {
        let local = self.placement.affine().inverse() * point;
        let tolerance = tolerance / self.placement.scale_factor().max(f64::EPSILON);
        self.geometry.hit_test(local, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let red = SerializableColor::from_hex("#ff0000").unwrap();
        assert_eq!(red, SerializableColor::rgb(255, 0, 0));
        assert_eq!(red.to_hex(), "#ff0000");

        let translucent = SerializableColor::from_hex("#11223380").unwrap();
        assert_eq!(translucent.a, 0x80);
        assert_eq!(translucent.to_hex(), "#11223380");
    }

    #[test]
    fn test_hex_short_and_invalid() {
        assert_eq!(
            SerializableColor::from_hex("#fff"),
            Some(SerializableColor::white())
        );
        assert_eq!(SerializableColor::from_hex("transparent"), None);
        assert_eq!(SerializableColor::from_hex("#12"), None);
        assert_eq!(SerializableColor::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_style_border_requires_width_and_color() {
        let mut style = Style::default();
        assert!(style.border().is_none());
        style.border_width = 2.0;
        assert!(style.border().is_none());
        style.border_color = Some(SerializableColor::black());
        assert_eq!(style.border(), Some((2.0, SerializableColor::black())));
    }

    #[test]
    fn test_world_bounds_centered() {
        let spec = ObjectSpec::new(
            Geometry::Rect(Rectangle::new(100.0, 50.0)),
            Style::default(),
            Placement::at(10.0, 20.0),
        );
        let bounds = spec.world_bounds();
        assert!((bounds.x0 + 40.0).abs() < f64::EPSILON);
        assert!((bounds.y0 + 5.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 60.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_world_bounds_scaled() {
        let mut placement = Placement::at(0.0, 0.0);
        placement.scale_x = 2.0;
        let spec = ObjectSpec::new(
            Geometry::Circle(Circle::new(10.0)),
            Style::default(),
            placement,
        );
        let bounds = spec.world_bounds();
        assert!((bounds.width() - 40.0).abs() < 1e-9);
        assert!((bounds.height() - 20.0).abs() < 1e-9);
        assert!(spec.hit_test_world(Point::new(18.0, 0.0), 0.0));
        assert!(!spec.hit_test_world(Point::new(0.0, 15.0), 0.0));
    }
}
