//! Plain records for persistence and sharing.
//!
//! Records use camelCase keys and `#rrggbb` color strings. Objects that
//! carry an erasable raster are written as `image` records whose URL is a
//! PNG data URL of the erased pixels.

use crate::assets::ImageLoader;
use crate::raster::{self, RasterError};
use crate::scene::{Scene, SceneObject};
use crate::shapes::{
    Circle, Geometry, Image, ObjectId, ObjectKind, ObjectSpec, Placement, Rectangle,
    SerializableColor, Style, Text, TextStyle, Triangle,
};
use crate::surface::DrawSurface;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codec errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn one() -> f64 {
    1.0
}

fn is_false(value: &bool) -> bool {
    !value
}

/// Persistence-safe form of a scene object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedObject {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "one")]
    pub scale_x: f64,
    #[serde(default = "one")]
    pub scale_y: f64,
    #[serde(default = "one")]
    pub opacity: f64,
    #[serde(flatten)]
    pub body: ObjectBody,
}

/// Kind-specific fields, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectBody {
    Rect(RectBody),
    Circle(CircleBody),
    Triangle(TriangleBody),
    Text(TextBody),
    Image(ImageBody),
}

/// Fill and border shared by the primitive shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeFill {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub border_width: f64,
    #[serde(default)]
    pub border_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectBody {
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub fill: ShapeFill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleBody {
    pub radius: f64,
    #[serde(flatten)]
    pub fill: ShapeFill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleBody {
    pub size: f64,
    #[serde(flatten)]
    pub fill: ShapeFill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBody {
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_text_fill")]
    pub fill: String,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default = "normal")]
    pub font_weight: String,
    #[serde(default = "normal")]
    pub font_style: String,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub line_through: bool,
}

fn default_font_family() -> String {
    Text::DEFAULT_FONT_FAMILY.to_string()
}

fn default_font_size() -> f64 {
    Text::DEFAULT_FONT_SIZE
}

fn default_text_fill() -> String {
    SerializableColor::white().to_hex()
}

fn normal() -> String {
    "normal".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBody {
    pub image_url: String,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_svg: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_ai_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint: Option<String>,
}

fn hex(color: Option<SerializableColor>) -> Option<String> {
    color.map(|c| c.to_hex())
}

/// Unknown color strings (e.g. `transparent`) read as no color.
fn parse(color: &Option<String>) -> Option<SerializableColor> {
    color.as_deref().and_then(SerializableColor::from_hex)
}

impl ShapeFill {
    fn from_style(style: &Style) -> Self {
        Self {
            background: hex(style.fill),
            border_width: style.border_width,
            border_color: hex(style.border_color),
        }
    }

    fn to_style(&self, opacity: f64) -> Style {
        Style {
            fill: parse(&self.background),
            border_width: self.border_width,
            border_color: parse(&self.border_color),
            opacity,
        }
    }
}

impl SerializedObject {
    pub fn kind(&self) -> ObjectKind {
        match self.body {
            ObjectBody::Rect(_) => ObjectKind::Rect,
            ObjectBody::Circle(_) => ObjectKind::Circle,
            ObjectBody::Triangle(_) => ObjectKind::Triangle,
            ObjectBody::Text(_) => ObjectKind::Text,
            ObjectBody::Image(_) => ObjectKind::Image,
        }
    }

    /// Record of a scene object. Erased objects become image records.
    pub fn from_object(object: &SceneObject) -> Result<Self, CodecError> {
        let spec = object.spec();
        let placement = spec.placement;

        let body = match (object.raster(), &spec.geometry) {
            (Some(raster), geometry) => {
                let image = geometry.as_image();
                ObjectBody::Image(ImageBody {
                    image_url: raster::pixmap_to_data_url(&raster.pixels)?,
                    filters: image.map(|img| img.filters.clone()).unwrap_or_default(),
                    raw_svg: None,
                    is_ai_generated: image.is_some_and(|img| img.ai_generated),
                    tint: hex(image.and_then(|img| img.tint)),
                })
            }
            (None, Geometry::Rect(rect)) => ObjectBody::Rect(RectBody {
                width: rect.width,
                height: rect.height,
                fill: ShapeFill::from_style(&spec.style),
            }),
            (None, Geometry::Circle(circle)) => ObjectBody::Circle(CircleBody {
                radius: circle.radius,
                fill: ShapeFill::from_style(&spec.style),
            }),
            (None, Geometry::Triangle(tri)) => ObjectBody::Triangle(TriangleBody {
                size: tri.size,
                fill: ShapeFill::from_style(&spec.style),
            }),
            (None, Geometry::Text(text)) => {
                let style = &text.style;
                ObjectBody::Text(TextBody {
                    text: text.content.clone(),
                    font_family: style.font_family.clone(),
                    font_size: style.font_size,
                    fill: style.fill.to_hex(),
                    background_color: hex(style.background),
                    font_weight: style.font_weight().to_string(),
                    font_style: style.font_style().to_string(),
                    underline: style.underline,
                    line_through: style.line_through,
                })
            }
            (None, Geometry::Image(image)) => ObjectBody::Image(ImageBody {
                image_url: image.url.clone(),
                filters: image.filters.clone(),
                raw_svg: image.raw_svg.clone(),
                is_ai_generated: image.ai_generated,
                tint: hex(image.tint),
            }),
        };

        Ok(Self {
            id: object.id(),
            x: placement.x,
            y: placement.y,
            rotation: placement.rotation,
            scale_x: placement.scale_x,
            scale_y: placement.scale_y,
            opacity: spec.style.opacity,
            body,
        })
    }

    pub fn placement(&self) -> Placement {
        Placement {
            x: self.x,
            y: self.y,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            rotation: self.rotation,
        }
    }

    /// Object spec of this record. Image sizes are zero until decoded.
    pub fn to_spec(&self) -> ObjectSpec {
        let opacity = self.opacity.clamp(0.0, 1.0);
        let (geometry, style) = match &self.body {
            ObjectBody::Rect(body) => (
                Geometry::Rect(Rectangle::new(body.width, body.height)),
                body.fill.to_style(opacity),
            ),
            ObjectBody::Circle(body) => (
                Geometry::Circle(Circle::new(body.radius)),
                body.fill.to_style(opacity),
            ),
            ObjectBody::Triangle(body) => (
                Geometry::Triangle(Triangle::new(body.size)),
                body.fill.to_style(opacity),
            ),
            ObjectBody::Text(body) => {
                let style = TextStyle {
                    font_family: body.font_family.clone(),
                    font_size: body.font_size,
                    fill: SerializableColor::from_hex(&body.fill)
                        .unwrap_or_else(SerializableColor::white),
                    background: parse(&body.background_color),
                    bold: is_bold(&body.font_weight),
                    italic: matches!(body.font_style.as_str(), "italic" | "oblique"),
                    underline: body.underline,
                    line_through: body.line_through,
                };
                (
                    Geometry::Text(Text::with_style(body.text.clone(), style)),
                    Style {
                        opacity,
                        ..Style::default()
                    },
                )
            }
            ObjectBody::Image(body) => {
                let mut image = Image::new(body.image_url.clone(), 0, 0)
                    .with_filters(body.filters.clone());
                image.tint = parse(&body.tint);
                image.raw_svg = body.raw_svg.clone();
                image.ai_generated = body.is_ai_generated;
                (
                    Geometry::Image(image),
                    Style {
                        opacity,
                        ..Style::default()
                    },
                )
            }
        };
        ObjectSpec::new(geometry, style, self.placement())
    }
}

fn is_bold(weight: &str) -> bool {
    match weight {
        "bold" | "bolder" => true,
        numeric => numeric.parse::<u32>().is_ok_and(|w| w >= 600),
    }
}

/// Live objects in z-order.
pub fn serialize_scene<S: DrawSurface>(scene: &Scene<S>) -> Result<Vec<SerializedObject>, CodecError> {
    scene.live().map(SerializedObject::from_object).collect()
}

/// Outcome of [`restore_scene`].
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: Vec<ObjectId>,
    /// Records that could not be rebuilt, with the reason.
    pub skipped: Vec<(ObjectId, String)>,
}

/// Rebuild objects from records, in order, on top of the scene.
///
/// Images are decoded through `assets`; records that fail are skipped with a
/// warning. The id allocator ends up past the largest restored id.
pub async fn restore_scene<S: DrawSurface>(
    scene: &mut Scene<S>,
    records: &[SerializedObject],
    assets: &dyn ImageLoader,
) -> RestoreReport {
    let mut report = RestoreReport::default();
    for record in records {
        let mut spec = record.to_spec();
        let mut source = None;
        if let Geometry::Image(image) = &mut spec.geometry {
            match assets.load(&image.url).await {
                Ok(decoded) => {
                    image.source_width = decoded.width();
                    image.source_height = decoded.height();
                    source = Some(decoded.pixels);
                }
                Err(e) => {
                    log::warn!("Skipping image {}: {}", record.id, e);
                    report.skipped.push((record.id, e.to_string()));
                    continue;
                }
            }
        }
        match scene.create_with_id(record.id, spec, source) {
            Ok(()) => report.restored.push(record.id),
            Err(e) => {
                log::warn!("Skipping {} {}: {}", record.kind(), record.id, e);
                report.skipped.push((record.id, e.to_string()));
            }
        }
    }
    log::info!(
        "Restored {} objects ({} skipped)",
        report.restored.len(),
        report.skipped.len()
    );
    report
}
