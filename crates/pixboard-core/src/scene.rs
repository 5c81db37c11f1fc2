//! Scene registry: the authoritative list of placed objects.
//!
//! Every object mutation goes through [`Scene`] so the draw surface's
//! attached list always mirrors the registry's live objects, in order.
//! Soft-deleted (detached) records keep their slot in the z-order so that
//! reattaching them restores their original stacking.

use crate::erase;
use crate::raster;
use crate::shapes::{Geometry, ObjectId, ObjectKind, ObjectSpec, ShapePatch};
use crate::surface::{DrawSurface, RasterVisual, SurfaceError, SurfaceHandle, Visual};
use kurbo::{Point, Rect};
use std::sync::Arc;
use thiserror::Error;
use tiny_skia::Pixmap;

/// Scene registry errors.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("Object not found: {0}")]
    NotFound(ObjectId),
    #[error("Object is not live: {0}")]
    NotLive(ObjectId),
    #[error("Object is not detached: {0}")]
    NotDetached(ObjectId),
    #[error("Object {0} is rasterized; only placement, opacity and image filters can change")]
    Rasterized(ObjectId),
    #[error("Object {0} cannot be erased pixel by pixel")]
    NotErasable(ObjectId),
    #[error("Object id already in use: {0}")]
    DuplicateId(ObjectId),
    #[error("Object id out of range: {0}")]
    IdOutOfRange(ObjectId),
    #[error("Surface error: {0}")]
    Surface(#[from] SurfaceError),
    #[error("Raster error: {0}")]
    Raster(#[from] raster::RasterError),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Monotonic object id source, seeded once per session.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: ObjectId,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl IdAllocator {
    pub fn starting_at(first: ObjectId) -> Self {
        Self { next: first }
    }

    /// Hand out the next id. `ObjectId::MAX` is never used.
    pub fn allocate(&mut self) -> SceneResult<ObjectId> {
        let id = self.next;
        self.next = id.checked_add(1).ok_or(SceneError::IdOutOfRange(id))?;
        Ok(id)
    }

    /// Make sure `id` is never handed out again.
    pub fn observe(&mut self, id: ObjectId) -> SceneResult<()> {
        let after = id.checked_add(1).ok_or(SceneError::IdOutOfRange(id))?;
        self.next = self.next.max(after);
        Ok(())
    }

    pub fn peek(&self) -> ObjectId {
        self.next
    }
}

/// Attachment state of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// On the surface, backed by a handle.
    Live(SurfaceHandle),
    /// Soft-deleted: off the surface, data retained for undo.
    Detached,
    /// Released for good; only seen transiently before a purge.
    Destroyed,
}

/// Offscreen pixels owned by an object once fine erasing touched it.
#[derive(Debug, Clone)]
pub struct ErasableRaster {
    pub pixels: Arc<Pixmap>,
    /// Local position of pixel (0, 0).
    pub origin: Point,
}

/// A registered object.
#[derive(Debug, Clone)]
pub struct SceneObject {
    id: ObjectId,
    spec: ObjectSpec,
    lifecycle: Lifecycle,
    /// Decoded pixels of image objects.
    source: Option<Arc<Pixmap>>,
    raster: Option<ErasableRaster>,
}

impl SceneObject {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn spec(&self) -> &ObjectSpec {
        &self.spec
    }

    pub fn kind(&self) -> ObjectKind {
        self.spec.kind()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn handle(&self) -> Option<SurfaceHandle> {
        match self.lifecycle {
            Lifecycle::Live(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Live(_))
    }

    pub fn source(&self) -> Option<&Arc<Pixmap>> {
        self.source.as_ref()
    }

    pub fn raster(&self) -> Option<&ErasableRaster> {
        self.raster.as_ref()
    }

    /// Visual for the surface. Erased objects draw their raster.
    pub fn visual(&self) -> Visual {
        let style = &self.spec.style;
        if let Some(raster) = &self.raster {
            let image = self.spec.geometry.as_image();
            return Visual::Raster(RasterVisual {
                pixels: raster.pixels.clone(),
                origin: raster.origin,
                opacity: style.opacity,
                tint: image.and_then(|img| img.tint),
                filters: image.map(|img| img.filters.clone()).unwrap_or_default(),
            });
        }
        match (&self.spec.geometry, &self.source) {
            (Geometry::Image(image), Some(pixels)) => {
                Visual::for_image(image, pixels.clone(), style.opacity)
            }
            (geometry, _) => Visual::for_geometry(geometry, style),
        }
    }

    /// An image's own pixels, which seed its erasable raster unchanged.
    fn image_seed(&self) -> Option<ErasableRaster> {
        let (Geometry::Image(_), Some(pixels)) = (&self.spec.geometry, &self.source) else {
            return None;
        };
        let origin = Point::new(
            -(pixels.width() as f64) / 2.0,
            -(pixels.height() as f64) / 2.0,
        );
        Some(ErasableRaster {
            pixels: pixels.clone(),
            origin,
        })
    }

    /// The shape drawn at full opacity; opacity keeps applying on top of the
    /// raster it seeds.
    fn opaque_visual(&self) -> Visual {
        let mut opaque = self.spec.style.clone();
        opaque.opacity = 1.0;
        Visual::for_geometry(&self.spec.geometry, &opaque)
    }
}

/// Registry of scene objects backed by a draw surface.
#[derive(Debug)]
pub struct Scene<S: DrawSurface> {
    surface: S,
    /// Z-order, back to front; includes detached records.
    objects: Vec<SceneObject>,
    ids: IdAllocator,
}

impl<S: DrawSurface> Scene<S> {
    pub fn new(surface: S) -> Self {
        Self::with_allocator(surface, IdAllocator::default())
    }

    pub fn with_allocator(surface: S, ids: IdAllocator) -> Self {
        Self {
            surface,
            objects: Vec::new(),
            ids,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub(crate) fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Register a new object on top of the z-order and return its id.
    pub fn create(&mut self, spec: ObjectSpec, source: Option<Arc<Pixmap>>) -> SceneResult<ObjectId> {
        let id = self.ids.allocate()?;
        self.create_with_id(id, spec, source)?;
        Ok(id)
    }

    /// Register an object under a known id (creation redo, restore).
    pub fn create_with_id(
        &mut self,
        id: ObjectId,
        spec: ObjectSpec,
        source: Option<Arc<Pixmap>>,
    ) -> SceneResult<()> {
        if self.index_of(id).is_some() {
            return Err(SceneError::DuplicateId(id));
        }
        self.ids.observe(id)?;
        let mut object = SceneObject {
            id,
            spec,
            lifecycle: Lifecycle::Detached,
            source,
            raster: None,
        };
        let z = self.live_count();
        object.lifecycle = Lifecycle::Live(self.mount(&object, z)?);
        log::debug!("Created {} {}", object.kind(), id);
        self.objects.push(object);
        Ok(())
    }

    /// Build, place and attach a handle for an object at a surface index.
    fn mount(&mut self, object: &SceneObject, z: usize) -> SceneResult<SurfaceHandle> {
        let handle = self.surface.create(object.visual());
        let placed = self
            .surface
            .set_transform(handle, object.spec.placement.affine())
            .and_then(|_| self.surface.attach(handle, z));
        if let Err(e) = placed {
            let _ = self.surface.detach(handle);
            return Err(e.into());
        }
        Ok(handle)
    }

    /// Release a handle; a handle the surface already dropped is fine.
    fn unmount(&mut self, handle: SurfaceHandle) {
        if let Err(e) = self.surface.detach(handle) {
            log::debug!("Surface already released {handle:?}: {e}");
        }
    }

    fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|obj| obj.id == id)
    }

    fn live_index(&self, id: ObjectId) -> SceneResult<(usize, SurfaceHandle)> {
        let index = self.index_of(id).ok_or(SceneError::NotFound(id))?;
        match self.objects[index].lifecycle {
            Lifecycle::Live(handle) => Ok((index, handle)),
            _ => Err(SceneError::NotLive(id)),
        }
    }

    /// Surface index an object at `index` occupies (or would occupy).
    fn z_of(&self, index: usize) -> usize {
        self.objects[..index].iter().filter(|o| o.is_live()).count()
    }

    /// Linear scan.
    pub fn find_by_id(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|obj| obj.id == id)
    }

    pub fn is_live(&self, id: ObjectId) -> bool {
        self.find_by_id(id).is_some_and(SceneObject::is_live)
    }

    /// Live objects, back to front.
    pub fn live(&self) -> impl DoubleEndedIterator<Item = &SceneObject> {
        self.objects.iter().filter(|obj| obj.is_live())
    }

    pub fn live_ids(&self) -> Vec<ObjectId> {
        self.live().map(SceneObject::id).collect()
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    /// Records of every lifecycle state, back to front.
    pub fn records(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter()
    }

    /// World bounds as reported by the surface; `None` when not live or the
    /// handle went stale.
    pub fn world_bounds(&self, id: ObjectId) -> Option<Rect> {
        self.find_by_id(id)
            .and_then(SceneObject::handle)
            .and_then(|handle| self.surface.bounds(handle))
    }

    /// Topmost live object under a world point.
    pub fn object_at(&self, point: Point) -> Option<ObjectId> {
        let handle = self.surface.hit_test(point)?;
        self.live()
            .find(|obj| obj.handle() == Some(handle))
            .map(SceneObject::id)
    }

    /// Live objects whose world bounds overlap `rect` (edges inclusive).
    pub fn objects_in_rect(&self, rect: Rect) -> Vec<ObjectId> {
        self.live()
            .filter(|obj| {
                self.world_bounds(obj.id).is_some_and(|b| {
                    b.x0 <= rect.x1 && b.x1 >= rect.x0 && b.y0 <= rect.y1 && b.y1 >= rect.y0
                })
            })
            .map(SceneObject::id)
            .collect()
    }

    /// Destroy an object and forget its record.
    pub fn remove(&mut self, id: ObjectId) -> SceneResult<()> {
        let index = self.index_of(id).ok_or(SceneError::NotFound(id))?;
        let mut object = self.objects.remove(index);
        if let Lifecycle::Live(handle) = object.lifecycle {
            self.unmount(handle);
        }
        object.lifecycle = Lifecycle::Destroyed;
        log::debug!("Removed {} {}", object.kind(), id);
        Ok(())
    }

    /// Soft delete: take a live object off the surface, keeping its record
    /// and slot. Returns its world position at removal time.
    pub fn detach(&mut self, id: ObjectId) -> SceneResult<Point> {
        let (index, handle) = self.live_index(id)?;
        self.unmount(handle);
        let object = &mut self.objects[index];
        object.lifecycle = Lifecycle::Detached;
        Ok(object.spec.placement.position())
    }

    /// Put a detached object back in its original z slot, optionally at a new
    /// world position.
    pub fn reattach(&mut self, id: ObjectId, position: Option<Point>) -> SceneResult<()> {
        let index = self.index_of(id).ok_or(SceneError::NotFound(id))?;
        if self.objects[index].lifecycle != Lifecycle::Detached {
            return Err(SceneError::NotDetached(id));
        }
        let mut object = self.objects[index].clone();
        if let Some(position) = position {
            object.spec.placement.x = position.x;
            object.spec.placement.y = position.y;
        }
        let z = self.z_of(index);
        let handle = self.mount(&object, z)?;
        object.lifecycle = Lifecycle::Live(handle);
        self.objects[index] = object;
        Ok(())
    }

    /// Drop a detached record for good.
    pub fn forget(&mut self, id: ObjectId) -> SceneResult<()> {
        let index = self.index_of(id).ok_or(SceneError::NotFound(id))?;
        if self.objects[index].is_live() {
            return Err(SceneError::NotDetached(id));
        }
        self.objects.remove(index);
        Ok(())
    }

    /// Apply a property patch to a live object and return its inverse.
    ///
    /// The surface node is refreshed in place; on surface failure the record
    /// is rolled back so registry and surface stay in step.
    pub fn update_shape(&mut self, id: ObjectId, patch: &ShapePatch) -> SceneResult<ShapePatch> {
        let (index, handle) = self.live_index(id)?;
        if self.objects[index].raster.is_some() && !patch.is_raster_compatible() {
            return Err(SceneError::Rasterized(id));
        }

        let inverse = self.objects[index].spec.apply_patch(patch);
        let object = &self.objects[index];
        let mut result = self
            .surface
            .set_transform(handle, object.spec.placement.affine());
        if result.is_ok() && !patch.is_placement_only() {
            result = self.surface.update(handle, object.visual());
        }
        if let Err(e) = result {
            self.objects[index].spec.apply_patch(&inverse);
            return Err(e.into());
        }
        Ok(inverse)
    }

    /// Drop records that are destroyed or whose handle the surface no longer
    /// knows. Returns the purged ids.
    pub fn purge_stale(&mut self) -> Vec<ObjectId> {
        let surface = &self.surface;
        let mut purged = Vec::new();
        self.objects.retain(|obj| {
            let stale = match obj.lifecycle {
                Lifecycle::Live(handle) => !surface.is_valid(handle),
                Lifecycle::Detached => false,
                Lifecycle::Destroyed => true,
            };
            if stale {
                purged.push(obj.id);
            }
            !stale
        });
        if !purged.is_empty() {
            log::warn!("Purged {} stale objects: {:?}", purged.len(), purged);
        }
        purged
    }

    /// Destroy every object, live or detached.
    pub fn clear(&mut self) {
        let handles: Vec<_> = self.objects.iter().filter_map(SceneObject::handle).collect();
        for handle in handles {
            self.unmount(handle);
        }
        self.objects.clear();
    }

    /// Give a live object an erasable raster if it has none yet.
    ///
    /// The backing handle is replaced 1:1: same z-index and transform.
    /// Returns whether a raster was created.
    pub fn ensure_erasable(&mut self, id: ObjectId) -> SceneResult<bool> {
        let (index, handle) = self.live_index(id)?;
        let object = &self.objects[index];
        if object.raster.is_some() {
            return Ok(false);
        }
        if !object.spec.geometry.supports_pixel_erase() {
            return Err(SceneError::NotErasable(id));
        }

        let mut erasable = object.clone();
        erasable.raster = Some(self.seed_raster(index)?);
        let z = self.z_of(index);
        let replacement = self.mount(&erasable, z)?;
        self.unmount(handle);
        erasable.lifecycle = Lifecycle::Live(replacement);
        log::debug!("Rasterized {} {} for erasing", erasable.kind(), id);
        self.objects[index] = erasable;
        Ok(true)
    }

    /// Pixels for a new erasable raster, rendered by the surface from a
    /// scratch node that is released again.
    fn seed_raster(&mut self, index: usize) -> SceneResult<ErasableRaster> {
        let object = &self.objects[index];
        if let Some(seed) = object.image_seed() {
            return Ok(seed);
        }
        let visual = object.opaque_visual();
        let origin = visual.local_bounds().origin();
        let scratch = self.surface.create(visual);
        let pixels = self.surface.rasterize(scratch);
        self.unmount(scratch);
        Ok(ErasableRaster {
            pixels: Arc::new(pixels?),
            origin,
        })
    }

    /// Clear raster pixels along a world-space segment.
    ///
    /// `radius` is in world units; it is converted to the object's local
    /// pixel space by the object's own scale.
    pub fn erase_segment(
        &mut self,
        id: ObjectId,
        from: Point,
        to: Point,
        radius: f64,
    ) -> SceneResult<()> {
        let (index, handle) = self.live_index(id)?;
        let object = &mut self.objects[index];
        let placement = object.spec.placement;
        let Some(raster) = object.raster.as_mut() else {
            return Err(SceneError::NotErasable(id));
        };

        let to_local = placement.affine().inverse();
        let offset = raster.origin.to_vec2();
        let a = to_local * from - offset;
        let b = to_local * to - offset;
        let width = 2.0 * radius / placement.scale_factor().max(f64::EPSILON);
        erase::erase_stroke(Arc::make_mut(&mut raster.pixels), a, b, width);

        let visual = object.visual();
        self.surface.update(handle, visual)?;
        Ok(())
    }

    /// Shared snapshot of an object's erasable raster.
    pub fn raster_snapshot(&self, id: ObjectId) -> Option<Arc<Pixmap>> {
        self.find_by_id(id)
            .and_then(SceneObject::raster)
            .map(|raster| raster.pixels.clone())
    }

    /// Set an object's raster pixels; `None` returns it to its vector visual.
    pub fn restore_raster(&mut self, id: ObjectId, pixels: Option<Arc<Pixmap>>) -> SceneResult<()> {
        let (index, handle) = self.live_index(id)?;
        match pixels {
            Some(pixels) => {
                self.ensure_erasable(id)?;
                let (index, handle) = self.live_index(id)?;
                let object = &mut self.objects[index];
                if let Some(raster) = object.raster.as_mut() {
                    raster.pixels = pixels;
                }
                let visual = object.visual();
                self.surface.update(handle, visual)?;
            }
            None => {
                let object = &mut self.objects[index];
                let previous = object.raster.take();
                let visual = object.visual();
                if let Err(e) = self.surface.update(handle, visual) {
                    self.objects[index].raster = previous;
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::opaque_pixel_count;
    use crate::shapes::{Circle, Placement, Rectangle, SerializableColor, Style, Text};
    use crate::surface::{SoftwareSurface, SurfaceResult};

    fn rect_at(x: f64, y: f64) -> ObjectSpec {
        ObjectSpec::new(
            Geometry::Rect(Rectangle::new(20.0, 20.0)),
            Style::filled(SerializableColor::rgb(255, 0, 0)),
            Placement::at(x, y),
        )
    }

    fn scene() -> Scene<SoftwareSurface> {
        Scene::new(SoftwareSurface::new())
    }

    /// The surface's attached list must mirror the live list.
    fn assert_mirrored(scene: &Scene<SoftwareSurface>) {
        let handles: Vec<_> = scene.live().filter_map(SceneObject::handle).collect();
        assert_eq!(scene.surface().attached(), handles);
    }

    #[test]
    fn test_create_allocates_monotonic_ids() {
        let mut scene = scene();
        let a = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let b = scene.create(rect_at(50.0, 0.0), None).unwrap();
        assert!(b > a);
        assert_eq!(scene.live_ids(), vec![a, b]);
        assert_mirrored(&scene);
    }

    #[test]
    fn test_create_with_id_advances_allocator() {
        let mut scene = scene();
        scene.create_with_id(41, rect_at(0.0, 0.0), None).unwrap();
        assert_eq!(scene.ids().peek(), 42);
        assert!(matches!(
            scene.create_with_id(41, rect_at(0.0, 0.0), None),
            Err(SceneError::DuplicateId(41))
        ));
    }

    #[test]
    fn test_detach_reattach_restores_z_order() {
        let mut scene = scene();
        let a = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let b = scene.create(rect_at(5.0, 0.0), None).unwrap();
        let c = scene.create(rect_at(10.0, 0.0), None).unwrap();

        let pos = scene.detach(b).unwrap();
        assert!((pos.x - 5.0).abs() < f64::EPSILON);
        assert_eq!(scene.live_ids(), vec![a, c]);
        assert_mirrored(&scene);
        assert!(scene.world_bounds(b).is_none());

        scene.reattach(b, Some(Point::new(7.0, 3.0))).unwrap();
        assert_eq!(scene.live_ids(), vec![a, b, c]);
        assert_mirrored(&scene);
        let spec = scene.find_by_id(b).unwrap().spec();
        assert!((spec.placement.x - 7.0).abs() < f64::EPSILON);

        assert!(matches!(scene.reattach(b, None), Err(SceneError::NotDetached(_))));
    }

    #[test]
    fn test_remove_and_forget() {
        let mut scene = scene();
        let a = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let b = scene.create(rect_at(0.0, 0.0), None).unwrap();
        scene.remove(a).unwrap();
        assert!(scene.find_by_id(a).is_none());
        assert!(matches!(scene.forget(b), Err(SceneError::NotDetached(_))));
        scene.detach(b).unwrap();
        scene.forget(b).unwrap();
        assert_eq!(scene.records().count(), 0);
        assert_eq!(scene.surface().node_count(), 0);
    }

    #[test]
    fn test_update_shape_returns_inverse() {
        let mut scene = scene();
        let id = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let inverse = scene
            .update_shape(
                id,
                &ShapePatch {
                    x: Some(100.0),
                    width: Some(40.0),
                    ..ShapePatch::default()
                },
            )
            .unwrap();
        let bounds = scene.world_bounds(id).unwrap();
        assert!((bounds.x0 - 80.0).abs() < 1e-9);
        assert!((bounds.width() - 40.0).abs() < 1e-9);

        scene.update_shape(id, &inverse).unwrap();
        assert_eq!(scene.find_by_id(id).unwrap().spec(), &rect_at(0.0, 0.0));
    }

    #[test]
    fn test_object_at_and_rect_query() {
        let mut scene = scene();
        let a = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let b = scene.create(rect_at(5.0, 5.0), None).unwrap();
        let _far = scene.create(rect_at(300.0, 300.0), None).unwrap();

        assert_eq!(scene.object_at(Point::new(6.0, 6.0)), Some(b));
        assert_eq!(scene.object_at(Point::new(-8.0, -8.0)), Some(a));
        assert_eq!(scene.object_at(Point::new(100.0, 100.0)), None);

        // Touching edges count
        let hits = scene.objects_in_rect(Rect::new(-100.0, -100.0, -10.0, -10.0));
        assert_eq!(hits, vec![a]);
    }

    #[test]
    fn test_purge_stale_drops_invalid_handles() {
        let mut scene = scene();
        let a = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let b = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let handle = scene.find_by_id(a).unwrap().handle().unwrap();
        scene.surface_mut().detach(handle).unwrap();

        assert_eq!(scene.purge_stale(), vec![a]);
        assert_eq!(scene.live_ids(), vec![b]);
        assert_mirrored(&scene);
    }

    #[test]
    fn test_ensure_erasable_replaces_handle_in_place() {
        let mut scene = scene();
        let a = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let b = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let c = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let old = scene.find_by_id(b).unwrap().handle().unwrap();

        assert!(scene.ensure_erasable(b).unwrap());
        assert!(!scene.ensure_erasable(b).unwrap());
        let new = scene.find_by_id(b).unwrap().handle().unwrap();
        assert_ne!(old, new);
        assert_eq!(scene.live_ids(), vec![a, b, c]);
        assert_mirrored(&scene);
        assert!(!scene.surface().is_valid(old));
        assert_eq!(scene.surface().node_count(), 3);

        let raster = scene.raster_snapshot(b).unwrap();
        assert_eq!((raster.width(), raster.height()), (20, 20));
    }

    /// Software surface that can refuse attachments and counts rasterizations.
    #[derive(Debug, Default)]
    struct GuardedSurface {
        inner: SoftwareSurface,
        refuse_attach: bool,
        rasterized: std::cell::Cell<usize>,
    }

    impl DrawSurface for GuardedSurface {
        fn create(&mut self, visual: Visual) -> SurfaceHandle {
            self.inner.create(visual)
        }
        fn update(&mut self, handle: SurfaceHandle, visual: Visual) -> SurfaceResult<()> {
            self.inner.update(handle, visual)
        }
        fn set_transform(&mut self, handle: SurfaceHandle, transform: kurbo::Affine) -> SurfaceResult<()> {
            self.inner.set_transform(handle, transform)
        }
        fn attach(&mut self, handle: SurfaceHandle, index: usize) -> SurfaceResult<()> {
            if self.refuse_attach {
                return Err(SurfaceError::StaleHandle(handle));
            }
            self.inner.attach(handle, index)
        }
        fn detach(&mut self, handle: SurfaceHandle) -> SurfaceResult<()> {
            self.inner.detach(handle)
        }
        fn is_valid(&self, handle: SurfaceHandle) -> bool {
            self.inner.is_valid(handle)
        }
        fn bounds(&self, handle: SurfaceHandle) -> Option<Rect> {
            self.inner.bounds(handle)
        }
        fn hit_test(&self, point: Point) -> Option<SurfaceHandle> {
            self.inner.hit_test(point)
        }
        fn rasterize(&self, handle: SurfaceHandle) -> SurfaceResult<Pixmap> {
            self.rasterized.set(self.rasterized.get() + 1);
            self.inner.rasterize(handle)
        }
        fn attached(&self) -> Vec<SurfaceHandle> {
            self.inner.attached()
        }
    }

    #[test]
    fn test_erasable_seed_comes_from_surface() {
        let mut scene = Scene::new(GuardedSurface::default());
        let id = scene.create(rect_at(0.0, 0.0), None).unwrap();
        scene.ensure_erasable(id).unwrap();
        assert_eq!(scene.surface().rasterized.get(), 1);
        assert_eq!(scene.surface().inner.node_count(), 1);
    }

    #[test]
    fn test_failed_promotion_keeps_old_handle() {
        let mut scene = Scene::new(GuardedSurface::default());
        let id = scene.create(rect_at(0.0, 0.0), None).unwrap();
        let old = scene.find_by_id(id).unwrap().handle().unwrap();

        scene.surface_mut().refuse_attach = true;
        assert!(scene.ensure_erasable(id).is_err());
        assert_eq!(scene.find_by_id(id).unwrap().handle(), Some(old));
        assert!(scene.surface().is_valid(old));
        assert_eq!(scene.surface().attached(), vec![old]);
        assert!(scene.find_by_id(id).unwrap().raster().is_none());
    }

    #[test]
    fn test_text_is_not_erasable() {
        let mut scene = scene();
        let id = scene
            .create(
                ObjectSpec::new(
                    Geometry::Text(Text::new("hi")),
                    Style::default(),
                    Placement::default(),
                ),
                None,
            )
            .unwrap();
        assert!(matches!(scene.ensure_erasable(id), Err(SceneError::NotErasable(_))));
    }

    #[test]
    fn test_erase_segment_respects_object_scale() {
        let mut scene = scene();
        let mut spec = ObjectSpec::new(
            Geometry::Circle(Circle::new(10.0)),
            Style::filled(SerializableColor::rgb(0, 0, 255)),
            Placement::at(100.0, 100.0),
        );
        spec.placement.scale_x = 2.0;
        spec.placement.scale_y = 2.0;
        let id = scene.create(spec, None).unwrap();
        scene.ensure_erasable(id).unwrap();
        let before = opaque_pixel_count(&scene.raster_snapshot(id).unwrap());

        // World radius 4 at scale 2 clears a local disc of radius 2
        let center = Point::new(100.0, 100.0);
        scene.erase_segment(id, center, center, 4.0).unwrap();
        let after = scene.raster_snapshot(id).unwrap();
        assert_eq!(after.pixel(10, 10).unwrap().alpha(), 0);
        assert_eq!(after.pixel(10, 14).unwrap().alpha(), 255);
        assert!(opaque_pixel_count(&after) < before);
    }

    #[test]
    fn test_rasterized_rejects_geometry_patch() {
        let mut scene = scene();
        let id = scene.create(rect_at(0.0, 0.0), None).unwrap();
        scene.ensure_erasable(id).unwrap();
        let result = scene.update_shape(
            id,
            &ShapePatch {
                width: Some(5.0),
                ..ShapePatch::default()
            },
        );
        assert!(matches!(result, Err(SceneError::Rasterized(_))));
        scene
            .update_shape(id, &ShapePatch::position(Point::new(3.0, 4.0)))
            .unwrap();
    }

    #[test]
    fn test_restore_raster_none_returns_to_vector() {
        let mut scene = scene();
        let id = scene.create(rect_at(0.0, 0.0), None).unwrap();
        scene.ensure_erasable(id).unwrap();
        scene.restore_raster(id, None).unwrap();
        assert!(scene.find_by_id(id).unwrap().raster().is_none());
        assert_mirrored(&scene);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut scene = scene();
        scene.create(rect_at(0.0, 0.0), None).unwrap();
        let b = scene.create(rect_at(0.0, 0.0), None).unwrap();
        scene.detach(b).unwrap();
        scene.clear();
        assert_eq!(scene.records().count(), 0);
        assert!(scene.surface().attached().is_empty());
        assert_eq!(scene.surface().node_count(), 0);
    }
}
