//! CPU draw surface backed by tiny-skia.

use super::{DrawSurface, SurfaceError, SurfaceHandle, SurfaceResult, Visual};
use crate::raster;
use kurbo::{Affine, Point, Rect};
use std::collections::HashMap;
use tiny_skia::Pixmap;

/// A node owned by a [`SoftwareSurface`].
#[derive(Debug, Clone)]
pub struct SurfaceNode {
    pub visual: Visual,
    /// Local → world transform.
    pub transform: Affine,
}

impl SurfaceNode {
    pub fn world_bounds(&self) -> Rect {
        self.transform.transform_rect_bbox(self.visual.local_bounds())
    }
}

/// Retained node tree with software rasterization.
#[derive(Debug, Default)]
pub struct SoftwareSurface {
    nodes: HashMap<u64, SurfaceNode>,
    /// Attached handles, back to front.
    order: Vec<SurfaceHandle>,
    next_handle: u64,
}

impl SoftwareSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, handle: SurfaceHandle) -> Option<&SurfaceNode> {
        self.nodes.get(&handle.0)
    }

    /// Attached nodes, back to front.
    pub fn attached_nodes(&self) -> impl DoubleEndedIterator<Item = &SurfaceNode> {
        self.order.iter().filter_map(|h| self.nodes.get(&h.0))
    }

    /// Live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_mut(&mut self, handle: SurfaceHandle) -> SurfaceResult<&mut SurfaceNode> {
        self.nodes
            .get_mut(&handle.0)
            .ok_or(SurfaceError::StaleHandle(handle))
    }
}

impl DrawSurface for SoftwareSurface {
    fn create(&mut self, visual: Visual) -> SurfaceHandle {
        self.next_handle += 1;
        let handle = SurfaceHandle(self.next_handle);
        self.nodes.insert(
            handle.0,
            SurfaceNode {
                visual,
                transform: Affine::IDENTITY,
            },
        );
        handle
    }

    fn update(&mut self, handle: SurfaceHandle, visual: Visual) -> SurfaceResult<()> {
        self.node_mut(handle)?.visual = visual;
        Ok(())
    }

    fn set_transform(&mut self, handle: SurfaceHandle, transform: Affine) -> SurfaceResult<()> {
        self.node_mut(handle)?.transform = transform;
        Ok(())
    }

    fn attach(&mut self, handle: SurfaceHandle, index: usize) -> SurfaceResult<()> {
        if !self.nodes.contains_key(&handle.0) {
            return Err(SurfaceError::StaleHandle(handle));
        }
        if self.order.contains(&handle) {
            return Err(SurfaceError::AlreadyAttached(handle));
        }
        let index = index.min(self.order.len());
        self.order.insert(index, handle);
        Ok(())
    }

    fn detach(&mut self, handle: SurfaceHandle) -> SurfaceResult<()> {
        self.order.retain(|&h| h != handle);
        self.nodes
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(SurfaceError::StaleHandle(handle))
    }

    fn is_valid(&self, handle: SurfaceHandle) -> bool {
        self.nodes.contains_key(&handle.0)
    }

    fn bounds(&self, handle: SurfaceHandle) -> Option<Rect> {
        self.node(handle).map(SurfaceNode::world_bounds)
    }

    fn hit_test(&self, point: Point) -> Option<SurfaceHandle> {
        self.order.iter().rev().copied().find(|handle| {
            self.node(*handle).is_some_and(|node| {
                let local = node.transform.inverse() * point;
                node.visual.contains(local)
            })
        })
    }

    fn rasterize(&self, handle: SurfaceHandle) -> SurfaceResult<Pixmap> {
        let node = self.node(handle).ok_or(SurfaceError::StaleHandle(handle))?;
        Ok(raster::rasterize_visual(&node.visual)?)
    }

    fn attached(&self) -> Vec<SurfaceHandle> {
        self.order.clone()
    }
}
