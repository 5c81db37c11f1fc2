//! Pixel buffer helpers built on tiny-skia.
//!
//! Pixmaps are premultiplied RGBA8. Everything that turns a [`Visual`] into
//! pixels lives here so the surface, the erase engine and the exporters
//! agree on the result.

use crate::shapes::SerializableColor;
use crate::surface::{RasterVisual, ShapeVisual, TextVisual, Visual};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Affine, BezPath, PathEl, Rect};
use thiserror::Error;
use tiny_skia::{
    FillRule, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, PremultipliedColorU8,
    Stroke, Transform,
};

/// Prefix of PNG data URLs produced by [`pixmap_to_data_url`].
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Raster errors.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Invalid raster size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("PNG decoding failed: {0}")]
    Decode(String),
}

/// Result type for raster operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Allocate a transparent pixmap.
pub fn new_pixmap(width: u32, height: u32) -> RasterResult<Pixmap> {
    Pixmap::new(width, height).ok_or(RasterError::InvalidSize { width, height })
}

/// Build a pixmap from straight-alpha RGBA8 bytes.
pub fn pixmap_from_rgba(width: u32, height: u32, mut rgba: Vec<u8>) -> RasterResult<Pixmap> {
    let invalid = RasterError::InvalidSize { width, height };
    if rgba.len() != width as usize * height as usize * 4 {
        return Err(invalid);
    }
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
    let size = IntSize::from_wh(width, height).ok_or(RasterError::InvalidSize { width, height })?;
    Pixmap::from_vec(rgba, size).ok_or(invalid)
}

pub fn pixmap_to_png(pixmap: &Pixmap) -> RasterResult<Vec<u8>> {
    pixmap
        .encode_png()
        .map_err(|e| RasterError::Encode(e.to_string()))
}

pub fn pixmap_from_png(bytes: &[u8]) -> RasterResult<Pixmap> {
    Pixmap::decode_png(bytes).map_err(|e| RasterError::Decode(e.to_string()))
}

/// Encode as a `data:image/png;base64,...` URL.
pub fn pixmap_to_data_url(pixmap: &Pixmap) -> RasterResult<String> {
    Ok(format!(
        "{}{}",
        PNG_DATA_URL_PREFIX,
        STANDARD.encode(pixmap_to_png(pixmap)?)
    ))
}

/// Base64 PNG without a data URL prefix.
pub fn pixmap_to_base64_png(pixmap: &Pixmap) -> RasterResult<String> {
    Ok(STANDARD.encode(pixmap_to_png(pixmap)?))
}

pub fn pixmap_from_base64_png(encoded: &str) -> RasterResult<Pixmap> {
    let encoded = encoded.strip_prefix(PNG_DATA_URL_PREFIX).unwrap_or(encoded);
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| RasterError::Decode(e.to_string()))?;
    pixmap_from_png(&bytes)
}

pub fn skia_color(color: SerializableColor) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

/// Convert a kurbo affine to a tiny-skia transform.
pub fn skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

/// Convert a kurbo path to a tiny-skia path. Empty paths yield `None`.
pub fn skia_path(path: &BezPath) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => {
                pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32)
            }
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

fn solid_paint(color: SerializableColor) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    paint
}

/// Draw a visual into `target`, mapping its local coordinates through
/// `transform`.
pub fn paint_visual(target: &mut Pixmap, visual: &Visual, transform: Affine) {
    let ts = skia_transform(transform);
    match visual {
        Visual::Shape(shape) => paint_shape(target, shape, ts),
        Visual::Text(text) => paint_text(target, text, ts),
        Visual::Raster(raster) => paint_raster(target, raster, ts),
    }
}

fn paint_shape(target: &mut Pixmap, shape: &ShapeVisual, ts: Transform) {
    let Some(path) = skia_path(&shape.path) else {
        return;
    };
    if let Some(fill) = shape.fill {
        target.fill_path(&path, &solid_paint(fill), FillRule::Winding, ts, None);
    }
    if let Some((width, color)) = shape.stroke {
        let stroke = Stroke {
            width: width as f32,
            ..Stroke::default()
        };
        target.stroke_path(&path, &solid_paint(color), &stroke, ts, None);
    }
}

/// Background box and decoration lines. Glyph shaping is left to the shell.
fn paint_text(target: &mut Pixmap, text: &TextVisual, ts: Transform) {
    let bounds = text.bounds;
    let style = &text.text.style;
    if let Some(background) = style.background {
        if let Some(rect) = skia_rect(bounds) {
            let path = PathBuilder::from_rect(rect);
            let paint = solid_paint(background.with_opacity(text.opacity));
            target.fill_path(&path, &paint, FillRule::Winding, ts, None);
        }
    }

    let mut lines = Vec::new();
    if style.underline {
        lines.push(bounds.y1 - style.font_size * 0.1);
    }
    if style.line_through {
        lines.push(bounds.center().y);
    }
    let paint = solid_paint(style.fill.with_opacity(text.opacity));
    let stroke = Stroke {
        width: (style.font_size / 16.0).max(1.0) as f32,
        ..Stroke::default()
    };
    for y in lines {
        let mut pb = PathBuilder::new();
        pb.move_to(bounds.x0 as f32, y as f32);
        pb.line_to(bounds.x1 as f32, y as f32);
        if let Some(path) = pb.finish() {
            target.stroke_path(&path, &paint, &stroke, ts, None);
        }
    }
}

fn paint_raster(target: &mut Pixmap, raster: &RasterVisual, ts: Transform) {
    let filtered;
    let pixels = if raster.tint.is_some() || !raster.filters.is_empty() {
        filtered = apply_filters(&raster.pixels, raster.tint, &raster.filters);
        &filtered
    } else {
        &*raster.pixels
    };
    let paint = PixmapPaint {
        opacity: raster.opacity.clamp(0.0, 1.0) as f32,
        ..PixmapPaint::default()
    };
    let ts = ts.pre_translate(raster.origin.x as f32, raster.origin.y as f32);
    target.draw_pixmap(0, 0, pixels.as_ref(), &paint, ts, None);
}

fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_ltrb(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
}

/// Render a visual into a buffer covering its local bounds, unscaled.
///
/// Pixel (0, 0) maps to the visual's local `bounds().origin()`.
pub fn rasterize_visual(visual: &Visual) -> RasterResult<Pixmap> {
    let bounds = visual.local_bounds();
    let width = bounds.width().ceil().max(1.0) as u32;
    let height = bounds.height().ceil().max(1.0) as u32;
    let mut pixmap = new_pixmap(width, height)?;
    paint_visual(
        &mut pixmap,
        visual,
        Affine::translate((-bounds.x0, -bounds.y0)),
    );
    Ok(pixmap)
}

/// Apply filter tags and a tint, returning a new buffer.
///
/// Known tags: `grayscale`, `invert`, `sepia`. Unknown tags are ignored.
pub fn apply_filters(
    pixmap: &Pixmap,
    tint: Option<SerializableColor>,
    filters: &[String],
) -> Pixmap {
    let mut out = pixmap.clone();
    for px in out.pixels_mut() {
        let a = px.alpha();
        let (mut r, mut g, mut b) = (px.red() as f32, px.green() as f32, px.blue() as f32);
        for filter in filters {
            match filter.to_ascii_lowercase().as_str() {
                "grayscale" => {
                    let luma = 0.299 * r + 0.587 * g + 0.114 * b;
                    (r, g, b) = (luma, luma, luma);
                }
                "invert" => {
                    let max = a as f32;
                    (r, g, b) = (max - r, max - g, max - b);
                }
                "sepia" => {
                    (r, g, b) = (
                        0.393 * r + 0.769 * g + 0.189 * b,
                        0.349 * r + 0.686 * g + 0.168 * b,
                        0.272 * r + 0.534 * g + 0.131 * b,
                    );
                }
                _ => {}
            }
        }
        if let Some(tint) = tint {
            r *= tint.r as f32 / 255.0;
            g *= tint.g as f32 / 255.0;
            b *= tint.b as f32 / 255.0;
        }
        // Premultiplied channels never exceed alpha
        let clamp = |v: f32| v.round().clamp(0.0, a as f32) as u8;
        if let Some(color) = PremultipliedColorU8::from_rgba(clamp(r), clamp(g), clamp(b), a) {
            *px = color;
        }
    }
    out
}

/// Number of pixels with non-zero alpha.
pub fn opaque_pixel_count(pixmap: &Pixmap) -> usize {
    pixmap.pixels().iter().filter(|p| p.alpha() > 0).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Geometry, Rectangle, Style};
    use crate::surface::Visual;
    use kurbo::Point;
    use std::sync::Arc;

    fn red_square(size: f64) -> Visual {
        Visual::for_geometry(
            &Geometry::Rect(Rectangle::new(size, size)),
            &Style::filled(SerializableColor::rgb(255, 0, 0)),
        )
    }

    #[test]
    fn test_rasterize_fills_bounds() {
        let pixmap = rasterize_visual(&red_square(10.0)).unwrap();
        assert_eq!(pixmap.width(), 10);
        assert_eq!(pixmap.height(), 10);
        let center = pixmap.pixel(5, 5).unwrap();
        assert_eq!(center.red(), 255);
        assert_eq!(center.alpha(), 255);
    }

    #[test]
    fn test_png_roundtrip_via_data_url() {
        let pixmap = rasterize_visual(&red_square(4.0)).unwrap();
        let url = pixmap_to_data_url(&pixmap).unwrap();
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));
        let decoded = pixmap_from_base64_png(&url).unwrap();
        assert_eq!(decoded.data(), pixmap.data());
    }

    #[test]
    fn test_from_rgba_premultiplies() {
        let pixmap = pixmap_from_rgba(1, 1, vec![255, 255, 255, 128]).unwrap();
        let px = pixmap.pixel(0, 0).unwrap();
        assert_eq!(px.alpha(), 128);
        assert_eq!(px.red(), 128);
        assert!(pixmap_from_rgba(2, 2, vec![0; 4]).is_err());
    }

    #[test]
    fn test_filters() {
        let pixmap = pixmap_from_rgba(1, 1, vec![255, 0, 0, 255]).unwrap();
        let inverted = apply_filters(&pixmap, None, &["invert".to_string()]);
        let px = inverted.pixel(0, 0).unwrap();
        assert_eq!((px.red(), px.green(), px.blue()), (0, 255, 255));

        let gray = apply_filters(&pixmap, None, &["grayscale".to_string()]);
        let px = gray.pixel(0, 0).unwrap();
        assert_eq!(px.red(), px.green());

        let tinted = apply_filters(&pixmap, Some(SerializableColor::rgb(0, 0, 0)), &[]);
        assert_eq!(tinted.pixel(0, 0).unwrap().red(), 0);
    }

    #[test]
    fn test_raster_visual_bounds_use_origin() {
        let pixels = Arc::new(new_pixmap(8, 4).unwrap());
        let visual = Visual::Raster(RasterVisual {
            pixels,
            origin: Point::new(-4.0, -2.0),
            opacity: 1.0,
            tint: None,
            filters: Vec::new(),
        });
        let bounds = visual.local_bounds();
        assert!((bounds.x0 + 4.0).abs() < f64::EPSILON);
        assert!((bounds.width() - 8.0).abs() < f64::EPSILON);
    }
}
