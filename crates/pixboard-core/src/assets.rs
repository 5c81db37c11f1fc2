//! Image loading.
//!
//! Decoding is asynchronous from the editor's point of view: an image object
//! is only registered once its pixels are available.

use crate::raster;
use crate::shapes::ImageFormat;
use crate::storage::BoxFuture;
use base64::{Engine, engine::general_purpose::STANDARD};
use image::imageops::FilterType;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tiny_skia::Pixmap;

/// Default longest side of decoded images.
pub const DEFAULT_MAX_SIDE: u32 = 4096;

/// Image loading errors.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("Unsupported image source: {0}")]
    Unsupported(String),
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode error: {0}")]
    Decode(String),
}

/// A decoded image ready to be placed.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: Arc<Pixmap>,
    pub format: Option<ImageFormat>,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Source of image pixels.
pub trait ImageLoader {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<DecodedImage, AssetLoadError>>;
}

/// Loads `data:` URLs, `file://` URLs and plain file paths.
#[derive(Debug, Clone)]
pub struct DataUrlLoader {
    max_side: u32,
}

impl Default for DataUrlLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIDE)
    }
}

impl DataUrlLoader {
    pub fn new(max_side: u32) -> Self {
        Self {
            max_side: max_side.max(1),
        }
    }

    fn read(&self, source: &str) -> Result<Vec<u8>, AssetLoadError> {
        if let Some(rest) = source.strip_prefix("data:") {
            return decode_data_url(rest);
        }
        let path = match url::Url::parse(source) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|_| AssetLoadError::Unsupported(source.to_string()))?,
            // Windows drive letters parse as a one-letter scheme
            Ok(url) if url.scheme().len() > 1 => {
                return Err(AssetLoadError::Unsupported(source.to_string()));
            }
            _ => PathBuf::from(source),
        };
        Ok(std::fs::read(path)?)
    }

    /// Decode bytes, downscaling so neither side exceeds `max_side`.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, AssetLoadError> {
        let format = ImageFormat::from_magic_bytes(bytes);
        let mut decoded =
            image::load_from_memory(bytes).map_err(|e| AssetLoadError::Decode(e.to_string()))?;
        if decoded.width().max(decoded.height()) > self.max_side {
            log::info!(
                "Downscaling {}x{} image to fit {}",
                decoded.width(),
                decoded.height(),
                self.max_side
            );
            decoded = decoded.resize(self.max_side, self.max_side, FilterType::Triangle);
        }
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = raster::pixmap_from_rgba(width, height, rgba.into_raw())
            .map_err(|e| AssetLoadError::Decode(e.to_string()))?;
        Ok(DecodedImage {
            pixels: Arc::new(pixels),
            format,
        })
    }
}

/// Payload of a `data:` URL (without the scheme).
fn decode_data_url(rest: &str) -> Result<Vec<u8>, AssetLoadError> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| AssetLoadError::InvalidDataUrl("missing ','".into()))?;
    if !meta.ends_with(";base64") {
        return Err(AssetLoadError::InvalidDataUrl(format!(
            "expected base64 payload, got '{meta}'"
        )));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AssetLoadError::InvalidDataUrl(e.to_string()))
}

impl ImageLoader for DataUrlLoader {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<DecodedImage, AssetLoadError>> {
        Box::pin(async move {
            let bytes = self.read(url)?;
            self.decode(&bytes)
        })
    }
}
