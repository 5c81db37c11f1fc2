//! Draw surface abstraction.
//!
//! The scene registry never touches pixels or a scene graph directly: it
//! talks to a [`DrawSurface`] through opaque [`SurfaceHandle`]s. A handle is
//! valid from `create` until `detach`; afterwards every call with it reports
//! [`SurfaceError::StaleHandle`] and `bounds` returns `None`.

mod software;

pub use software::{SoftwareSurface, SurfaceNode};

use crate::raster::RasterError;
use crate::shapes::{Geometry, Image, SerializableColor, Style, Text};
use kurbo::{Affine, BezPath, Point, Rect};
use std::sync::Arc;
use thiserror::Error;
use tiny_skia::Pixmap;

/// Surface errors.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Stale surface handle: {0:?}")]
    StaleHandle(SurfaceHandle),
    #[error("Handle already attached: {0:?}")]
    AlreadyAttached(SurfaceHandle),
    #[error("Rasterization failed: {0}")]
    Raster(#[from] RasterError),
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Opaque reference to a node owned by a draw surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceHandle(pub(crate) u64);

/// Filled and/or stroked vector outline.
#[derive(Debug, Clone)]
pub struct ShapeVisual {
    pub path: BezPath,
    /// Fill color with opacity already applied.
    pub fill: Option<SerializableColor>,
    /// Stroke width and color with opacity already applied.
    pub stroke: Option<(f64, SerializableColor)>,
    /// Local bounds including half the stroke width.
    pub bounds: Rect,
}

/// A styled text run.
#[derive(Debug, Clone)]
pub struct TextVisual {
    pub text: Text,
    pub bounds: Rect,
    pub opacity: f64,
}

/// Pixels placed so that pixel (0, 0) sits at `origin` in local space.
#[derive(Debug, Clone)]
pub struct RasterVisual {
    pub pixels: Arc<Pixmap>,
    pub origin: Point,
    pub opacity: f64,
    pub tint: Option<SerializableColor>,
    pub filters: Vec<String>,
}

/// What a surface node draws, in local coordinates.
#[derive(Debug, Clone)]
pub enum Visual {
    Shape(ShapeVisual),
    Text(TextVisual),
    Raster(RasterVisual),
}

impl Visual {
    /// Vector visual for a geometry. Images without pixels get a gray
    /// placeholder box.
    pub fn for_geometry(geometry: &Geometry, style: &Style) -> Self {
        match geometry {
            Geometry::Text(text) => Visual::Text(TextVisual {
                text: text.clone(),
                bounds: geometry.local_bounds(),
                opacity: style.opacity,
            }),
            Geometry::Image(_) => Visual::Shape(ShapeVisual {
                path: geometry.to_path(),
                fill: Some(SerializableColor::rgb(200, 200, 200).with_opacity(style.opacity)),
                stroke: None,
                bounds: geometry.local_bounds(),
            }),
            _ => {
                let stroke = style.border_with_opacity();
                let half = stroke.map(|(w, _)| w / 2.0).unwrap_or(0.0);
                Visual::Shape(ShapeVisual {
                    path: geometry.to_path(),
                    fill: style.fill_with_opacity(),
                    stroke,
                    bounds: geometry.local_bounds().inflate(half, half),
                })
            }
        }
    }

    /// Raster visual for an image centered on its anchor.
    pub fn for_image(image: &Image, pixels: Arc<Pixmap>, opacity: f64) -> Self {
        let origin = Point::new(
            -(pixels.width() as f64) / 2.0,
            -(pixels.height() as f64) / 2.0,
        );
        Visual::Raster(RasterVisual {
            pixels,
            origin,
            opacity,
            tint: image.tint,
            filters: image.filters.clone(),
        })
    }

    /// Bounding box in local coordinates.
    pub fn local_bounds(&self) -> Rect {
        match self {
            Visual::Shape(shape) => shape.bounds,
            Visual::Text(text) => text.bounds,
            Visual::Raster(raster) => Rect::new(
                raster.origin.x,
                raster.origin.y,
                raster.origin.x + raster.pixels.width() as f64,
                raster.origin.y + raster.pixels.height() as f64,
            ),
        }
    }

    /// Precise hit test of a local point.
    pub fn contains(&self, point: Point) -> bool {
        use kurbo::Shape as KurboShape;

        match self {
            Visual::Shape(shape) => {
                if shape.fill.is_some() && shape.path.contains(point) {
                    return true;
                }
                // Unfilled outlines are picked by their box
                shape.fill.is_none() && shape.bounds.contains(point)
            }
            Visual::Text(text) => text.bounds.contains(point),
            Visual::Raster(raster) => {
                let px = (point.x - raster.origin.x).floor();
                let py = (point.y - raster.origin.y).floor();
                if px < 0.0 || py < 0.0 {
                    return false;
                }
                raster
                    .pixels
                    .pixel(px as u32, py as u32)
                    .is_some_and(|p| p.alpha() > 0)
            }
        }
    }
}

/// Adapter over a retained-mode 2D scene graph.
///
/// Nodes are created detached; `attach` inserts them into the render tree at
/// a z-index (0 = back). The attached order must mirror the scene registry's
/// live list, which is the registry's responsibility.
pub trait DrawSurface {
    /// Build a detached node.
    fn create(&mut self, visual: Visual) -> SurfaceHandle;

    /// Replace a node's content in place.
    fn update(&mut self, handle: SurfaceHandle, visual: Visual) -> SurfaceResult<()>;

    /// Set the node's local → world transform.
    fn set_transform(&mut self, handle: SurfaceHandle, transform: Affine) -> SurfaceResult<()>;

    /// Insert a node into the render tree. `index` is clamped to the tree length.
    fn attach(&mut self, handle: SurfaceHandle, index: usize) -> SurfaceResult<()>;

    /// Remove a node from the render tree and release it.
    fn detach(&mut self, handle: SurfaceHandle) -> SurfaceResult<()>;

    fn is_valid(&self, handle: SurfaceHandle) -> bool;

    /// World bounds of a node, `None` for stale handles.
    fn bounds(&self, handle: SurfaceHandle) -> Option<Rect>;

    /// Topmost attached node under a world point.
    fn hit_test(&self, point: Point) -> Option<SurfaceHandle>;

    /// Render a node's content into a buffer in its local, unscaled pixel
    /// space. Pixel (0, 0) maps to the visual's local bounds origin.
    fn rasterize(&self, handle: SurfaceHandle) -> SurfaceResult<Pixmap>;

    /// Attached handles, back to front.
    fn attached(&self) -> Vec<SurfaceHandle>;
}
