//! Auto-save of the working canvas.
//!
//! Provides periodic caching so a crash or reload loses at most one interval
//! of work.

use super::{CanvasCache, CanvasPayload, Storage, StorageResult};
use crate::config::EditorConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Manages automatic canvas persistence.
pub struct AutoSaveManager<S: Storage> {
    cache: CanvasCache<S>,
    interval: Duration,
    /// Last save timestamp.
    last_save: Option<Instant>,
    /// Whether the canvas has unsaved changes.
    dirty: bool,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(cache: CanvasCache<S>) -> Self {
        Self {
            cache,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
        }
    }

    /// Manager with the configured cache TTL and save interval.
    pub fn from_config(storage: Arc<S>, config: &EditorConfig) -> Self {
        Self::new(CanvasCache::from_config(storage, config)).with_interval(config.autosave_interval())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark the canvas as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Check if enough time has passed for an auto-save.
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save if dirty and the interval elapsed. Returns whether a save ran.
    pub async fn maybe_save(&mut self, payload: &CanvasPayload) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }
        self.save(payload).await?;
        Ok(true)
    }

    /// Save immediately.
    pub async fn save(&mut self, payload: &CanvasPayload) -> StorageResult<()> {
        self.cache.save(payload).await?;
        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(())
    }

    /// The last cached canvas, if still fresh.
    pub async fn load_last(&mut self) -> Option<CanvasPayload> {
        let payload = self.cache.get().await?;
        self.dirty = false;
        self.last_save = Some(Instant::now());
        Some(payload)
    }

    /// Drop the cached canvas.
    pub async fn discard(&mut self) -> StorageResult<()> {
        self.dirty = false;
        self.cache.clear().await
    }

    pub fn cache(&self) -> &CanvasCache<S> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pollster::block_on;

    fn manager() -> AutoSaveManager<MemoryStorage> {
        AutoSaveManager::new(CanvasCache::new(Arc::new(MemoryStorage::new())))
    }

    #[test]
    fn test_autosave_manager_creation() {
        let manager = manager();
        assert!(!manager.is_dirty());
        assert!(!manager.should_save());
    }

    #[test]
    fn test_autosave_dirty_flag() {
        let mut manager = manager();
        manager.mark_dirty();
        assert!(manager.is_dirty());
        assert!(manager.should_save());
    }

    #[test]
    fn test_autosave_respects_interval() {
        let mut manager = manager().with_interval(Duration::from_secs(3600));
        manager.mark_dirty();
        assert!(block_on(manager.maybe_save(&CanvasPayload::default())).unwrap());
        assert!(!manager.is_dirty());

        manager.mark_dirty();
        assert!(!block_on(manager.maybe_save(&CanvasPayload::default())).unwrap());
        assert!(manager.is_dirty());
    }

    #[test]
    fn test_autosave_load_last() {
        let storage = Arc::new(MemoryStorage::new());
        let mut manager = AutoSaveManager::new(CanvasCache::new(storage.clone()));
        manager.mark_dirty();
        block_on(manager.save(&CanvasPayload::default())).unwrap();

        let mut reopened = AutoSaveManager::new(CanvasCache::new(storage));
        assert_eq!(block_on(reopened.load_last()), Some(CanvasPayload::default()));

        block_on(reopened.discard()).unwrap();
        assert_eq!(block_on(reopened.load_last()), None);
    }

    #[test]
    fn test_autosave_from_config() {
        let config = EditorConfig {
            cache_ttl_secs: 120,
            autosave_interval_secs: 5,
            ..EditorConfig::default()
        };
        let manager = AutoSaveManager::from_config(Arc::new(MemoryStorage::new()), &config);
        assert_eq!(manager.interval(), Duration::from_secs(5));
        assert_eq!(manager.cache().ttl(), Duration::from_secs(120));
    }
}
