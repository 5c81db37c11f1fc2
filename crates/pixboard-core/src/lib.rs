//! Pixboard Core Library
//!
//! Scene model, undo/redo history, viewport and erase engine for the Pixboard
//! canvas editor. Rendering backends plug in through [`DrawSurface`].

pub mod assets;
pub mod codec;
pub mod command;
pub mod config;
pub mod editor;
pub mod erase;
pub mod history;
pub mod raster;
pub mod scene;
pub mod selection;
pub mod shapes;
pub mod share;
pub mod storage;
pub mod surface;
pub mod viewport;

pub use assets::{AssetLoadError, DataUrlLoader, DecodedImage, ImageLoader};
pub use codec::{RestoreReport, SerializedObject};
pub use command::{Command, EffectError};
pub use config::{ConfigError, EditorConfig};
pub use editor::{Editor, EditorError, EditorResult};
pub use erase::EraseMode;
pub use history::{History, HistoryCommand, HistoryError};
pub use scene::{IdAllocator, Lifecycle, Scene, SceneError, SceneObject};
pub use selection::{InteractionController, SelectTarget, Selection};
pub use shapes::{ObjectId, ObjectKind, ObjectSpec, PrimitiveKind, SerializableColor, ShapePatch};
pub use share::{ShareDocument, ShareError, ShareWorker};
pub use surface::{DrawSurface, SoftwareSurface, SurfaceHandle, Visual};
pub use viewport::{Viewport, ViewportState};
