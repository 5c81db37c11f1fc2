//! Image shape for placed raster images.

use super::{ObjectKind, SerializableColor, ShapeTrait};
use kurbo::{BezPath, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Image format of encoded image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    /// PNG format.
    Png,
    /// JPEG format.
    Jpeg,
    /// WebP format.
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from a MIME type (`image/png`, ...).
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// A placed raster image. Pixels live with the scene object, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Where the pixels came from (data URL or path); used to re-decode.
    pub url: String,
    /// Decoded width in pixels.
    pub source_width: u32,
    /// Decoded height in pixels.
    pub source_height: u32,
    /// Filter tags applied when drawing.
    #[serde(default)]
    pub filters: Vec<String>,
    /// Multiplicative tint.
    #[serde(default)]
    pub tint: Option<SerializableColor>,
    /// Original SVG markup when the image was generated from vectors.
    #[serde(default)]
    pub raw_svg: Option<String>,
    #[serde(default)]
    pub ai_generated: bool,
}

impl Image {
    pub fn new(url: impl Into<String>, source_width: u32, source_height: u32) -> Self {
        Self {
            url: url.into(),
            source_width,
            source_height,
            filters: Vec::new(),
            tint: None,
            raw_svg: None,
            ai_generated: false,
        }
    }

    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    pub fn has_filter(&self, tag: &str) -> bool {
        self.filters.iter().any(|f| f.eq_ignore_ascii_case(tag))
    }
}

impl ShapeTrait for Image {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Image
    }

    fn local_bounds(&self) -> Rect {
        let w = self.source_width as f64;
        let h = self.source_height as f64;
        Rect::new(-w / 2.0, -h / 2.0, w / 2.0, h / 2.0)
    }

    fn to_path(&self) -> BezPath {
        // Bounding box as path (for selection rendering)
        self.local_bounds().to_path(0.1)
    }
}
