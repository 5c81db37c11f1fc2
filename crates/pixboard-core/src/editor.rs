//! The editor: scene, viewport, history and tools wired together.
//!
//! Every mutating tool records exactly one command. Failures the user can do
//! nothing about (a rejected record, an image that will not decode) are
//! logged here instead of being raised.

use crate::assets::{DataUrlLoader, ImageLoader};
use crate::codec::{self, CodecError, RestoreReport, SerializedObject};
use crate::command::{Command, EffectError, ErasedItem, PatchChange};
use crate::config::EditorConfig;
use crate::erase::{self, EraseMode, EraseStroke};
use crate::history::{History, HistoryError};
use crate::scene::{Scene, SceneError};
use crate::selection::{InteractionController, SelectTarget, Selection};
use crate::share::ShareDocument;
use crate::shapes::{
    Geometry, Image, ObjectId, ObjectSpec, Placement, PrimitiveKind, ShapePatch, Style, Text,
};
use crate::storage::{AutoSaveManager, CanvasPayload, Storage};
use crate::surface::{DrawSurface, SoftwareSurface};
use crate::viewport::Viewport;
use kurbo::{Point, Size};
use std::sync::Arc;
use thiserror::Error;
use tiny_skia::Pixmap;

/// Editor errors.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("No shape tool is armed")]
    NoArmedShape,
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
    #[error("History error: {0}")]
    History(#[from] HistoryError),
    #[error("Effect error: {0}")]
    Effect(#[from] EffectError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// A canvas editing session.
pub struct Editor<S: DrawSurface = SoftwareSurface> {
    config: EditorConfig,
    scene: Scene<S>,
    viewport: Viewport,
    history: History<Command>,
    selection: Selection,
    interaction: InteractionController,
    assets: Box<dyn ImageLoader>,
    armed: Option<PrimitiveKind>,
    erase_mode: EraseMode,
    stroke: Option<EraseStroke>,
    /// Eraser radius in screen pixels.
    erase_radius: f64,
    dirty: bool,
}

impl Editor<SoftwareSurface> {
    /// Editor over a fresh software surface.
    pub fn software(config: EditorConfig, screen: Size) -> Self {
        Self::new(SoftwareSurface::new(), config, screen)
    }
}

impl<S: DrawSurface> Editor<S> {
    pub fn new(surface: S, config: EditorConfig, screen: Size) -> Self {
        Self {
            scene: Scene::new(surface),
            viewport: Viewport::from_config(&config, screen),
            history: History::with_limit(config.history_limit),
            selection: Selection::new(),
            interaction: InteractionController::new(),
            assets: Box::new(DataUrlLoader::new(config.image_max_side)),
            armed: None,
            erase_mode: EraseMode::default(),
            stroke: None,
            erase_radius: config.erase_radius,
            dirty: false,
            config,
        }
    }

    /// Replace the image loader.
    pub fn with_loader(mut self, loader: impl ImageLoader + 'static) -> Self {
        self.assets = Box::new(loader);
        self
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene<S> {
        &self.scene
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn history(&self) -> &History<Command> {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn interaction(&self) -> &InteractionController {
        &self.interaction
    }

    pub fn erase_mode(&self) -> EraseMode {
        self.erase_mode
    }

    /// Whether the scene changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Record a command that was just applied, releasing whatever an evicted
    /// command retained.
    fn record(&mut self, command: Command) -> EditorResult<()> {
        if let Some(evicted) = self.history.record(command)? {
            self.release(&evicted);
        }
        self.dirty = true;
        Ok(())
    }

    fn release(&mut self, command: &Command) {
        for id in command.retained_ids() {
            if let Err(e) = self.scene.forget(id) {
                log::warn!("Could not release object {id}: {e}");
            }
        }
    }

    /// Register an object and its creation command.
    fn place(&mut self, spec: ObjectSpec, source: Option<Arc<Pixmap>>) -> EditorResult<ObjectId> {
        let id = self.scene.create(spec.clone(), source)?;
        if let Err(e) = self.record(Command::Create { id, spec }) {
            self.scene.remove(id)?;
            return Err(e);
        }
        Ok(id)
    }

    /// Arm a primitive tool; the next [`Editor::finalize_shape`] places it.
    pub fn begin_shape(&mut self, kind: PrimitiveKind) {
        self.armed = Some(kind);
    }

    pub fn armed_shape(&self) -> Option<PrimitiveKind> {
        self.armed
    }

    /// Place the armed primitive centered on a world point.
    pub fn finalize_shape(&mut self, x: f64, y: f64) -> EditorResult<ObjectId> {
        let kind = self.armed.take().ok_or(EditorError::NoArmedShape)?;
        let spec = ObjectSpec::new(
            Geometry::primitive(kind, &self.config),
            self.config.style.clone(),
            Placement::at(x, y),
        );
        self.place(spec, None)
            .inspect(|id| log::info!("Placed {kind:?} {id} at ({x}, {y})"))
    }

    /// Place text at the center of the view.
    pub fn begin_text(&mut self, content: impl Into<String>) -> EditorResult<ObjectId> {
        let center = self.viewport.position();
        let text = Text::with_style(content, self.config.text_style.clone());
        let spec = ObjectSpec::new(
            Geometry::Text(text),
            Style::default(),
            Placement::at(center.x, center.y),
        );
        self.place(spec, None)
    }

    /// Decode an image and place it at the center of the view.
    ///
    /// Resolves to `None` without recording anything when the image cannot be
    /// loaded.
    pub async fn begin_image(&mut self, url: &str) -> EditorResult<Option<ObjectId>> {
        let decoded = match self.assets.load(url).await {
            Ok(decoded) => decoded,
            Err(e) => {
                log::warn!("Could not load image {url}: {e}");
                return Ok(None);
            }
        };
        let center = self.viewport.position();
        let spec = ObjectSpec::new(
            Geometry::Image(Image::new(url, decoded.width(), decoded.height())),
            Style::default(),
            Placement::at(center.x, center.y),
        );
        self.place(spec, Some(decoded.pixels)).map(Some)
    }

    /// Switch the eraser mode, finishing any stroke in progress.
    pub fn set_erase_mode(&mut self, mode: EraseMode) -> EditorResult<()> {
        self.end_erase()?;
        self.erase_mode = mode;
        Ok(())
    }

    pub fn erase_radius(&self) -> f64 {
        self.erase_radius
    }

    pub fn set_erase_radius(&mut self, radius: f64) {
        if radius.is_finite() && radius > 0.0 {
            self.erase_radius = radius;
        }
    }

    /// [`Editor::erase_at`] with the current eraser radius.
    pub fn erase(&mut self, x: f64, y: f64) -> EditorResult<Vec<ObjectId>> {
        self.erase_at(x, y, self.erase_radius)
    }

    /// One eraser sample at a screen point; `radius` is in screen pixels.
    ///
    /// In object mode everything the circle touches is soft-deleted as one
    /// batch. In pixel mode the sample extends the current stroke. Returns
    /// the affected ids.
    pub fn erase_at(&mut self, x: f64, y: f64, radius: f64) -> EditorResult<Vec<ObjectId>> {
        self.interaction.cancel(&mut self.scene);
        let center = self.viewport.screen_to_world(Point::new(x, y));
        let radius = radius / self.viewport.scale();
        match self.erase_mode {
            EraseMode::Object => {
                let hits = erase::objects_under_circle(&self.scene, center, radius);
                if hits.is_empty() {
                    return Ok(hits);
                }
                let mut items = Vec::with_capacity(hits.len());
                for &id in &hits {
                    let at = self.scene.detach(id)?;
                    items.push(ErasedItem { id, x: at.x, y: at.y });
                }
                self.selection.retain_live(&self.scene);
                self.record(Command::Erase { items })?;
                Ok(hits)
            }
            EraseMode::Pixel => {
                let stroke = self.stroke.get_or_insert_with(EraseStroke::new);
                Ok(stroke.sample(&mut self.scene, center, radius)?)
            }
        }
    }

    /// Finish the current pixel stroke and record it.
    pub fn end_erase(&mut self) -> EditorResult<()> {
        let Some(stroke) = self.stroke.take() else {
            return Ok(());
        };
        let changes = stroke.finish(&self.scene);
        if changes.is_empty() {
            return Ok(());
        }
        self.record(Command::PixelErase { changes })
    }

    pub fn select(&mut self, target: SelectTarget) {
        self.selection.select(&self.scene, &self.viewport, target);
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.interaction
            .pointer_down(&self.scene, &self.viewport, &mut self.selection, Point::new(x, y));
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        self.interaction.pointer_move(Point::new(x, y));
    }

    /// Per-frame tick: applies at most one queued drag update.
    pub fn on_frame(&mut self) -> EditorResult<bool> {
        Ok(self.interaction.on_frame(&mut self.scene, &self.viewport)?)
    }

    /// Finish the pointer gesture, recording a move if objects were dragged.
    pub fn pointer_up(&mut self, x: f64, y: f64) -> EditorResult<()> {
        let command = self.interaction.pointer_up(
            &mut self.scene,
            &self.viewport,
            &mut self.selection,
            Point::new(x, y),
        )?;
        match command {
            Some(command) => self.record(command),
            None => Ok(()),
        }
    }

    /// Abandon whatever gesture or stroke is in progress before another
    /// action touches the scene.
    fn settle(&mut self) -> EditorResult<()> {
        self.interaction.cancel(&mut self.scene);
        self.end_erase()
    }

    fn after_step(&mut self) {
        self.scene.purge_stale();
        self.selection.retain_live(&self.scene);
        self.selection.clear();
        self.dirty = true;
    }

    /// Revert the last command. Returns whether a step ran.
    pub async fn undo(&mut self) -> EditorResult<bool> {
        self.settle()?;
        let Some((step, command)) = self.history.begin_undo() else {
            return Ok(false);
        };
        let result = command.undo(&mut self.scene, self.assets.as_ref()).await;
        self.history.complete(step, result)?;
        self.after_step();
        Ok(true)
    }

    /// Reapply the last undone command. Returns whether a step ran.
    pub async fn redo(&mut self) -> EditorResult<bool> {
        self.settle()?;
        let Some((step, command)) = self.history.begin_redo() else {
            return Ok(false);
        };
        let result = command.redo(&mut self.scene, self.assets.as_ref()).await;
        self.history.complete(step, result)?;
        self.after_step();
        Ok(true)
    }

    /// Soft-delete every live object as one undoable step.
    pub fn clear(&mut self) -> EditorResult<()> {
        self.settle()?;
        let mut items = Vec::new();
        for id in self.scene.live_ids() {
            let at = self.scene.detach(id)?;
            items.push(ErasedItem { id, x: at.x, y: at.y });
        }
        self.selection.clear();
        if items.is_empty() {
            return Ok(());
        }
        log::info!("Cleared {} objects", items.len());
        self.record(Command::Clear { items })
    }

    /// Apply a patch to every selected object as one undoable step.
    ///
    /// If any object rejects it, the ones already changed are reverted.
    pub fn update_selected(&mut self, patch: &ShapePatch) -> EditorResult<usize> {
        if patch.is_empty() {
            return Ok(0);
        }
        self.settle()?;
        let mut changes: Vec<PatchChange> = Vec::new();
        for &id in self.selection.ids() {
            match self.scene.update_shape(id, patch) {
                Ok(before) => changes.push(PatchChange {
                    id,
                    before,
                    after: patch.clone(),
                }),
                Err(e) => {
                    for change in changes.iter().rev() {
                        if let Err(e) = self.scene.update_shape(change.id, &change.before) {
                            log::warn!("Could not revert object {}: {}", change.id, e);
                        }
                    }
                    return Err(e.into());
                }
            }
        }
        let count = changes.len();
        if count > 0 {
            self.record(Command::Update { changes })?;
        }
        Ok(count)
    }

    /// Soft-delete the selection as one undoable step.
    pub fn delete_selected(&mut self) -> EditorResult<usize> {
        self.settle()?;
        self.selection.retain_live(&self.scene);
        let mut items = Vec::new();
        for &id in self.selection.ids() {
            let at = self.scene.detach(id)?;
            items.push(ErasedItem { id, x: at.x, y: at.y });
        }
        self.selection.clear();
        let count = items.len();
        if count > 0 {
            self.record(Command::Erase { items })?;
        }
        Ok(count)
    }

    /// Drop undo/redo history, releasing soft-deleted records.
    pub fn clear_history(&mut self) {
        for command in self.history.clear() {
            self.release(&command);
        }
    }

    pub fn serialize(&self) -> EditorResult<Vec<SerializedObject>> {
        Ok(codec::serialize_scene(&self.scene)?)
    }

    /// Replace the whole session with saved records. History is dropped.
    pub async fn restore(&mut self, records: &[SerializedObject]) -> RestoreReport {
        self.interaction = InteractionController::new();
        self.stroke = None;
        self.history.clear();
        self.selection.clear();
        self.scene.clear();
        let report = codec::restore_scene(&mut self.scene, records, self.assets.as_ref()).await;
        self.dirty = false;
        report
    }

    /// Restore a cached payload, including its viewport.
    pub async fn restore_payload(&mut self, payload: &CanvasPayload) -> RestoreReport {
        let report = self.restore(&payload.objects).await;
        if let Some(state) = payload.viewport {
            self.viewport.apply_state(state);
        }
        report
    }

    /// What the persistence cache stores.
    pub fn cache_payload(&self) -> EditorResult<CanvasPayload> {
        Ok(CanvasPayload {
            objects: self.serialize()?,
            global_drawing_raster: None,
            viewport: Some(self.viewport.state()),
        })
    }

    /// Autosave over `storage`, using the configured cache TTL and interval.
    pub fn autosave<T: Storage>(&self, storage: Arc<T>) -> AutoSaveManager<T> {
        AutoSaveManager::from_config(storage, &self.config)
    }

    pub fn share_document(&self) -> EditorResult<ShareDocument> {
        Ok(ShareDocument::new(self.serialize()?))
    }
}
