//! Time-limited cache of the working canvas.

use super::{Storage, StorageError, StorageResult};
use crate::codec::SerializedObject;
use crate::config::EditorConfig;
use crate::viewport::ViewportState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Key of the working canvas record.
pub const CACHE_KEY: &str = "canvas_editor_main_data";

/// Records older than this are discarded on read.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// What gets cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasPayload {
    #[serde(default)]
    pub objects: Vec<SerializedObject>,
    /// Freehand layer as a PNG data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_drawing_raster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<ViewportState>,
}

/// A stored payload with its save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub data: CanvasPayload,
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Single-record cache over a [`Storage`] backend.
pub struct CanvasCache<S: Storage> {
    storage: Arc<S>,
    key: String,
    ttl: Duration,
}

impl<S: Storage> CanvasCache<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            key: CACHE_KEY.to_string(),
            ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Cache using the configured freshness window.
    pub fn from_config(storage: Arc<S>, config: &EditorConfig) -> Self {
        Self::new(storage).with_ttl(config.cache_ttl())
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Save the payload stamped with the current time.
    pub async fn save(&self, payload: &CanvasPayload) -> StorageResult<()> {
        self.save_at(payload, now_millis()).await
    }

    pub async fn save_at(&self, payload: &CanvasPayload, timestamp: u64) -> StorageResult<()> {
        let envelope = CacheEnvelope {
            timestamp,
            data: payload.clone(),
        };
        self.storage.save(&self.key, &envelope).await?;
        log::debug!("Cached {} objects", payload.objects.len());
        Ok(())
    }

    /// The cached payload, if present and fresh.
    pub async fn get(&self) -> Option<CanvasPayload> {
        self.get_at(now_millis()).await
    }

    /// Like [`get`](Self::get) with an explicit clock. Expired records are
    /// removed.
    pub async fn get_at(&self, now: u64) -> Option<CanvasPayload> {
        let envelope = match self.storage.load(&self.key).await {
            Ok(envelope) => envelope,
            Err(StorageError::NotFound(_)) => return None,
            Err(e) => {
                log::warn!("Failed to read canvas cache: {}", e);
                return None;
            }
        };

        let age = Duration::from_millis(now.saturating_sub(envelope.timestamp));
        if age > self.ttl {
            log::info!("Discarding canvas cache older than {:?}", self.ttl);
            if let Err(e) = self.clear().await {
                log::warn!("Failed to remove expired canvas cache: {}", e);
            }
            return None;
        }
        Some(envelope.data)
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.storage.delete(&self.key).await
    }
}
