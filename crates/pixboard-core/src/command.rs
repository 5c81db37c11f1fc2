//! Undoable editor actions.
//!
//! A command carries plain parameters captured when the action happened;
//! redo reconstructs objects from them instead of holding on to surface
//! handles. Both effects check every target before mutating anything, so a
//! failed effect leaves the scene as it was.

use crate::assets::{AssetLoadError, ImageLoader};
use crate::history::HistoryCommand;
use crate::scene::{Lifecycle, Scene, SceneError};
use crate::shapes::{ObjectId, ObjectSpec, ShapePatch};
use crate::surface::DrawSurface;
use kurbo::Point;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tiny_skia::Pixmap;

/// Failure of an undo or redo effect.
#[derive(Debug, Error)]
pub enum EffectError {
    #[error("{kind} target {id} is missing or in the wrong state")]
    Target { kind: &'static str, id: ObjectId },
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
    #[error("Asset error: {0}")]
    Asset(#[from] AssetLoadError),
}

/// An object taken off the canvas, with its world position at the time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErasedItem {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
}

/// A world position of one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
}

impl Waypoint {
    pub fn new(id: ObjectId, point: Point) -> Self {
        Self {
            id,
            x: point.x,
            y: point.y,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Property edit of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchChange {
    pub id: ObjectId,
    pub before: ShapePatch,
    pub after: ShapePatch,
}

/// Raster of one object around a fine-erase stroke. `before` is `None` when
/// the stroke made the object erasable.
#[derive(Debug, Clone)]
pub struct RasterChange {
    pub id: ObjectId,
    pub before: Option<Arc<Pixmap>>,
    pub after: Arc<Pixmap>,
}

/// Undoable action.
#[derive(Debug, Clone)]
pub enum Command {
    /// An object was placed.
    Create { id: ObjectId, spec: ObjectSpec },
    /// A batch of objects was soft-deleted by the eraser.
    Erase { items: Vec<ErasedItem> },
    /// Every object was soft-deleted.
    Clear { items: Vec<ErasedItem> },
    /// Objects were dragged.
    Move { start: Vec<Waypoint>, end: Vec<Waypoint> },
    Update { changes: Vec<PatchChange> },
    PixelErase { changes: Vec<RasterChange> },
}

#[derive(Clone, Copy)]
enum Expect {
    Live,
    Detached,
    Absent,
}

impl Command {
    /// Ids of records this command keeps detached while it sits on the undo
    /// stack. They can be forgotten once the command is evicted.
    pub fn retained_ids(&self) -> Vec<ObjectId> {
        match self {
            Command::Erase { items } | Command::Clear { items } => {
                items.iter().map(|item| item.id).collect()
            }
            _ => Vec::new(),
        }
    }

    fn ids(&self) -> Vec<ObjectId> {
        match self {
            Command::Create { id, .. } => vec![*id],
            Command::Erase { items } | Command::Clear { items } => {
                items.iter().map(|item| item.id).collect()
            }
            Command::Move { start, .. } => start.iter().map(|w| w.id).collect(),
            Command::Update { changes } => changes.iter().map(|c| c.id).collect(),
            Command::PixelErase { changes } => changes.iter().map(|c| c.id).collect(),
        }
    }

    fn check<S: DrawSurface>(&self, scene: &Scene<S>, expect: Expect) -> Result<(), EffectError> {
        for id in self.ids() {
            let state = scene.find_by_id(id).map(|obj| obj.lifecycle());
            let ok = match expect {
                Expect::Live => matches!(state, Some(Lifecycle::Live(_))),
                Expect::Detached => matches!(state, Some(Lifecycle::Detached)),
                Expect::Absent => state.is_none(),
            };
            if !ok {
                return Err(EffectError::Target {
                    kind: self.kind(),
                    id,
                });
            }
        }
        Ok(())
    }

    /// Revert the action.
    pub async fn undo<S: DrawSurface>(
        &self,
        scene: &mut Scene<S>,
        _assets: &dyn ImageLoader,
    ) -> Result<(), EffectError> {
        match self {
            Command::Create { id, .. } => {
                self.check(scene, Expect::Live)?;
                scene.remove(*id)?;
            }
            Command::Erase { items } | Command::Clear { items } => {
                self.check(scene, Expect::Detached)?;
                for item in items {
                    scene.reattach(item.id, Some(Point::new(item.x, item.y)))?;
                }
            }
            Command::Move { start, .. } => {
                self.check(scene, Expect::Live)?;
                for waypoint in start {
                    scene.update_shape(waypoint.id, &ShapePatch::position(waypoint.point()))?;
                }
            }
            Command::Update { changes } => {
                self.check(scene, Expect::Live)?;
                // Reverse order so overlapping edits unwind correctly
                for change in changes.iter().rev() {
                    scene.update_shape(change.id, &change.before)?;
                }
            }
            Command::PixelErase { changes } => {
                self.check(scene, Expect::Live)?;
                for change in changes {
                    scene.restore_raster(change.id, change.before.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Reapply the action.
    pub async fn redo<S: DrawSurface>(
        &self,
        scene: &mut Scene<S>,
        assets: &dyn ImageLoader,
    ) -> Result<(), EffectError> {
        match self {
            Command::Create { id, spec } => {
                self.check(scene, Expect::Absent)?;
                let source = match spec.geometry.as_image() {
                    Some(image) => Some(assets.load(&image.url).await?.pixels),
                    None => None,
                };
                // The decode may have suspended; look again
                self.check(scene, Expect::Absent)?;
                scene.create_with_id(*id, spec.clone(), source)?;
            }
            Command::Erase { .. } | Command::Clear { .. } => {
                self.check(scene, Expect::Live)?;
                for id in self.ids() {
                    scene.detach(id)?;
                }
            }
            Command::Move { end, .. } => {
                self.check(scene, Expect::Live)?;
                for waypoint in end {
                    scene.update_shape(waypoint.id, &ShapePatch::position(waypoint.point()))?;
                }
            }
            Command::Update { changes } => {
                self.check(scene, Expect::Live)?;
                for change in changes {
                    scene.update_shape(change.id, &change.after)?;
                }
            }
            Command::PixelErase { changes } => {
                self.check(scene, Expect::Live)?;
                for change in changes {
                    scene.restore_raster(change.id, Some(change.after.clone()))?;
                }
            }
        }
        Ok(())
    }
}

fn unique(ids: impl Iterator<Item = ObjectId>) -> Result<(), String> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(format!("object {id} listed twice"));
        }
    }
    Ok(())
}

impl HistoryCommand for Command {
    fn kind(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Erase { .. } => "erase",
            Command::Clear { .. } => "clear",
            Command::Move { .. } => "move",
            Command::Update { .. } => "update",
            Command::PixelErase { .. } => "pixel-erase",
        }
    }

    fn validate(&self) -> Result<(), String> {
        let empty = match self {
            Command::Create { .. } => false,
            Command::Erase { items } | Command::Clear { items } => items.is_empty(),
            Command::Move { start, .. } => start.is_empty(),
            Command::Update { changes } => changes.is_empty(),
            Command::PixelErase { changes } => changes.is_empty(),
        };
        if empty {
            return Err("no targets".into());
        }
        if let Command::Move { start, end } = self {
            let same = start.len() == end.len()
                && start.iter().zip(end).all(|(s, e)| s.id == e.id);
            if !same {
                return Err("start and end positions do not match".into());
            }
            let finite = start
                .iter()
                .chain(end)
                .all(|w| w.x.is_finite() && w.y.is_finite());
            if !finite {
                return Err("non-finite position".into());
            }
        }
        unique(self.ids().into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DataUrlLoader;
    use crate::assets::testing::FixedLoader;
    use crate::shapes::{Geometry, Image, Placement, Rectangle, SerializableColor, Style};
    use crate::surface::SoftwareSurface;

    fn rect_spec(x: f64, y: f64) -> ObjectSpec {
        ObjectSpec::new(
            Geometry::Rect(Rectangle::new(100.0, 100.0)),
            Style::filled(SerializableColor::rgb(255, 0, 0)),
            Placement::at(x, y),
        )
    }

    fn scene() -> Scene<SoftwareSurface> {
        Scene::new(SoftwareSurface::new())
    }

    #[test]
    fn test_create_undo_redo() {
        let mut scene = scene();
        let spec = rect_spec(0.0, 0.0);
        let id = scene.create(spec.clone(), None).unwrap();
        let command = Command::Create { id, spec: spec.clone() };

        pollster::block_on(command.undo(&mut scene, &FixedLoader)).unwrap();
        assert!(scene.is_empty());
        assert!(scene.find_by_id(id).is_none());

        pollster::block_on(command.redo(&mut scene, &FixedLoader)).unwrap();
        assert_eq!(scene.live_ids(), vec![id]);
        assert_eq!(scene.find_by_id(id).unwrap().spec(), &spec);
    }

    #[test]
    fn test_create_redo_reloads_image() {
        let mut scene = scene();
        let spec = ObjectSpec::new(
            Geometry::Image(Image::new("mem://a", 4, 2)),
            Style::default(),
            Placement::at(10.0, 10.0),
        );
        let command = Command::Create { id: 7, spec };
        pollster::block_on(command.redo(&mut scene, &FixedLoader)).unwrap();
        let object = scene.find_by_id(7).unwrap();
        assert_eq!(object.source().unwrap().width(), 4);

        // A second redo finds the id taken and mutates nothing
        let err = pollster::block_on(command.redo(&mut scene, &FixedLoader)).unwrap_err();
        assert!(matches!(err, EffectError::Target { kind: "create", id: 7 }));
        assert_eq!(scene.live_count(), 1);
    }

    #[test]
    fn test_create_redo_surfaces_asset_error() {
        let mut scene = scene();
        let spec = ObjectSpec::new(
            Geometry::Image(Image::new("data:image/png;base64,AAAA", 4, 2)),
            Style::default(),
            Placement::default(),
        );
        let command = Command::Create { id: 1, spec };
        let err = pollster::block_on(command.redo(&mut scene, &DataUrlLoader::default()));
        assert!(matches!(err, Err(EffectError::Asset(_))));
        assert!(scene.is_empty());
    }

    #[test]
    fn test_erase_undo_reattaches_at_position() {
        let mut scene = scene();
        let a = scene.create(rect_spec(1.0, 2.0), None).unwrap();
        let b = scene.create(rect_spec(3.0, 4.0), None).unwrap();
        let items = [a, b]
            .iter()
            .map(|&id| {
                let at = scene.detach(id).unwrap();
                ErasedItem { id, x: at.x, y: at.y }
            })
            .collect();
        let command = Command::Erase { items };
        assert!(scene.is_empty());

        pollster::block_on(command.undo(&mut scene, &FixedLoader)).unwrap();
        assert_eq!(scene.live_ids(), vec![a, b]);
        let placement = scene.find_by_id(b).unwrap().spec().placement;
        assert!((placement.x - 3.0).abs() < f64::EPSILON);

        pollster::block_on(command.redo(&mut scene, &FixedLoader)).unwrap();
        assert!(scene.is_empty());
        assert_eq!(command.retained_ids(), vec![a, b]);
    }

    #[test]
    fn test_effect_checks_all_targets_first() {
        let mut scene = scene();
        let a = scene.create(rect_spec(0.0, 0.0), None).unwrap();
        let command = Command::Move {
            start: vec![Waypoint::new(a, Point::ZERO), Waypoint::new(99, Point::ZERO)],
            end: vec![
                Waypoint::new(a, Point::new(5.0, 5.0)),
                Waypoint::new(99, Point::new(5.0, 5.0)),
            ],
        };
        let err = pollster::block_on(command.redo(&mut scene, &FixedLoader)).unwrap_err();
        assert!(matches!(err, EffectError::Target { id: 99, .. }));
        let placement = scene.find_by_id(a).unwrap().spec().placement;
        assert!(placement.x.abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_undo_redo() {
        let mut scene = scene();
        let id = scene.create(rect_spec(0.0, 0.0), None).unwrap();
        let after = ShapePatch {
            fill: Some(Some(SerializableColor::rgb(0, 255, 0))),
            ..ShapePatch::default()
        };
        let before = scene.update_shape(id, &after).unwrap();
        let command = Command::Update {
            changes: vec![PatchChange { id, before, after }],
        };

        pollster::block_on(command.undo(&mut scene, &FixedLoader)).unwrap();
        assert_eq!(scene.find_by_id(id).unwrap().spec(), &rect_spec(0.0, 0.0));
        pollster::block_on(command.redo(&mut scene, &FixedLoader)).unwrap();
        assert_eq!(
            scene.find_by_id(id).unwrap().spec().style.fill,
            Some(SerializableColor::rgb(0, 255, 0))
        );
    }

    #[test]
    fn test_validate() {
        assert!(Command::Erase { items: vec![] }.validate().is_err());
        let mismatched = Command::Move {
            start: vec![Waypoint::new(1, Point::ZERO)],
            end: vec![Waypoint::new(2, Point::ZERO)],
        };
        assert!(mismatched.validate().is_err());
        let short = Command::Move {
            start: vec![Waypoint::new(1, Point::ZERO), Waypoint::new(2, Point::ZERO)],
            end: vec![Waypoint::new(1, Point::ZERO)],
        };
        assert!(short.validate().is_err());
        let duplicate = Command::Clear {
            items: vec![ErasedItem { id: 1, x: 0.0, y: 0.0 }; 2],
        };
        assert!(duplicate.validate().is_err());
        let create = Command::Create {
            id: 1,
            spec: rect_spec(0.0, 0.0),
        };
        assert!(create.validate().is_ok());
    }
}
