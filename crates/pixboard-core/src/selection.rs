//! Selection and pointer interaction.
//!
//! The selection is an ordered list of object ids. The
//! [`InteractionController`] turns pointer events into drags and marquee
//! selections; drag moves are queued and applied at most once per frame.

use crate::command::{Command, Waypoint};
use crate::scene::{Scene, SceneResult};
use crate::shapes::{ObjectId, ShapePatch};
use crate::surface::DrawSurface;
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Vec2};

/// Ordered set of selected object ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ObjectId>,
}

/// What to select, in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectTarget {
    /// Topmost object under the point.
    Point(Point),
    /// Every object overlapping the marquee.
    Rect(Rect),
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// Add `id` if absent, remove it otherwise. Returns whether it is now
    /// selected.
    pub fn toggle(&mut self, id: ObjectId) -> bool {
        if let Some(pos) = self.ids.iter().position(|&s| s == id) {
            self.ids.remove(pos);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn insert(&mut self, id: ObjectId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    /// Replace the selection.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        self.ids.clear();
        for id in ids {
            self.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drop ids that no longer name a live object.
    pub fn retain_live<S: DrawSurface>(&mut self, scene: &Scene<S>) {
        self.ids.retain(|&id| scene.is_live(id));
    }

    /// Replace the selection with what `target` hits.
    pub fn select<S: DrawSurface>(
        &mut self,
        scene: &Scene<S>,
        viewport: &Viewport,
        target: SelectTarget,
    ) {
        match target {
            SelectTarget::Point(screen) => {
                let hit = scene.object_at(viewport.screen_to_world(screen));
                self.set(hit);
            }
            SelectTarget::Rect(screen) => {
                let world = viewport.screen_rect_to_world(screen);
                self.set(scene.objects_in_rect(world));
            }
        }
        log::debug!("Selected {:?}", self.ids);
    }
}

/// A drag of one or more objects in progress.
#[derive(Debug, Clone)]
pub struct DragState {
    /// Pointer position at drag start (world).
    pub start_point: Point,
    /// Last applied pointer position (world).
    pub current_point: Point,
    /// Position of each member at drag start.
    pub origins: Vec<Waypoint>,
}

impl DragState {
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.origins.iter().map(|w| w.id).collect()
    }
}

/// Pointer gesture state.
#[derive(Debug, Clone, Default)]
pub enum Interaction {
    #[default]
    Idle,
    Dragging(DragState),
    /// Marquee corners in screen coordinates.
    Marquee { start: Point, current: Point },
}

/// Drives selection and dragging from pointer events.
#[derive(Debug, Default)]
pub struct InteractionController {
    state: Interaction,
    /// Latest pointer position not yet applied (screen).
    queued: Option<Point>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Interaction {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, Interaction::Idle)
    }

    pub fn has_queued_move(&self) -> bool {
        self.queued.is_some()
    }

    /// Current marquee in screen coordinates, for overlay drawing.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self.state {
            Interaction::Marquee { start, current } => Some(Rect::from_points(start, current)),
            _ => None,
        }
    }

    /// Start a gesture at a screen point.
    ///
    /// Pressing a member of a multi-selection drags the whole group; pressing
    /// any other object selects it alone and drags it; pressing empty space
    /// clears the selection and starts a marquee.
    pub fn pointer_down<S: DrawSurface>(
        &mut self,
        scene: &Scene<S>,
        viewport: &Viewport,
        selection: &mut Selection,
        screen: Point,
    ) {
        self.queued = None;
        let world = viewport.screen_to_world(screen);
        let Some(hit) = scene.object_at(world) else {
            selection.clear();
            self.state = Interaction::Marquee {
                start: screen,
                current: screen,
            };
            return;
        };

        if !(selection.contains(hit) && selection.len() > 1) {
            selection.set([hit]);
        }
        let origins: Vec<Waypoint> = selection
            .ids()
            .iter()
            .filter_map(|&id| scene.find_by_id(id).filter(|obj| obj.is_live()))
            .map(|obj| Waypoint::new(obj.id(), obj.spec().placement.position()))
            .collect();
        log::debug!("Dragging {} objects", origins.len());
        self.state = Interaction::Dragging(DragState {
            start_point: world,
            current_point: world,
            origins,
        });
    }

    /// Queue the latest pointer position; only the newest one is kept.
    pub fn pointer_move(&mut self, screen: Point) {
        if !self.is_idle() {
            self.queued = Some(screen);
        }
    }

    /// Apply the queued move, if any. Returns whether something changed.
    pub fn on_frame<S: DrawSurface>(
        &mut self,
        scene: &mut Scene<S>,
        viewport: &Viewport,
    ) -> SceneResult<bool> {
        let Some(screen) = self.queued.take() else {
            return Ok(false);
        };
        match &mut self.state {
            Interaction::Idle => Ok(false),
            Interaction::Marquee { current, .. } => {
                *current = screen;
                Ok(true)
            }
            Interaction::Dragging(drag) => {
                drag.current_point = viewport.screen_to_world(screen);
                let delta = drag.delta();
                // Members erased mid-drag stay where they were detached.
                drag.origins.retain(|origin| scene.is_live(origin.id));
                for origin in &drag.origins {
                    scene.update_shape(origin.id, &ShapePatch::position(origin.point() + delta))?;
                }
                Ok(true)
            }
        }
    }

    /// Finish the gesture at a screen point.
    ///
    /// A drag that moved yields the [`Command::Move`] to record; a marquee
    /// replaces the selection.
    pub fn pointer_up<S: DrawSurface>(
        &mut self,
        scene: &mut Scene<S>,
        viewport: &Viewport,
        selection: &mut Selection,
        screen: Point,
    ) -> SceneResult<Option<Command>> {
        if self.is_idle() {
            return Ok(None);
        }
        self.queued = Some(screen);
        let flushed = self.on_frame(scene, viewport);
        let state = std::mem::take(&mut self.state);
        flushed?;

        match state {
            Interaction::Idle => Ok(None),
            Interaction::Marquee { start, current } => {
                selection.select(scene, viewport, SelectTarget::Rect(Rect::from_points(start, current)));
                Ok(None)
            }
            Interaction::Dragging(drag) => {
                let delta = drag.delta();
                if delta.hypot2() == 0.0 || drag.origins.is_empty() {
                    return Ok(None);
                }
                let end = drag
                    .origins
                    .iter()
                    .map(|origin| Waypoint::new(origin.id, origin.point() + delta))
                    .collect();
                Ok(Some(Command::Move {
                    start: drag.origins,
                    end,
                }))
            }
        }
    }

    /// Abort the gesture, putting dragged objects back where they started.
    pub fn cancel<S: DrawSurface>(&mut self, scene: &mut Scene<S>) {
        self.queued = None;
        if let Interaction::Dragging(drag) = std::mem::take(&mut self.state) {
            for origin in &drag.origins {
                if let Err(e) = scene.update_shape(origin.id, &ShapePatch::position(origin.point())) {
                    log::warn!("Could not restore object {} after cancelled drag: {}", origin.id, e);
                }
            }
        }
    }
}
