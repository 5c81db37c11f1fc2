//! Editor configuration.

use crate::shapes::{Style, TextStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Tunables for an [`Editor`](crate::Editor). Every field has a default, so a
/// partial JSON document is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo stack capacity; the oldest entry is evicted beyond it.
    pub history_limit: usize,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Step used by zoom in/out buttons.
    pub scale_step: f64,
    /// Eraser radius in screen pixels.
    pub erase_radius: f64,
    /// Longest side of decoded images; larger images are downscaled.
    pub image_max_side: u32,
    pub cache_ttl_secs: u64,
    pub autosave_interval_secs: u64,
    pub rect_width: f64,
    pub rect_height: f64,
    pub circle_radius: f64,
    pub triangle_size: f64,
    /// Style of newly placed shapes.
    pub style: Style,
    /// Style of newly placed text.
    pub text_style: TextStyle,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 30,
            min_scale: 0.1,
            max_scale: 10.0,
            scale_step: 0.1,
            erase_radius: 10.0,
            image_max_side: 4096,
            cache_ttl_secs: 7 * 24 * 60 * 60,
            autosave_interval_secs: 30,
            rect_width: 100.0,
            rect_height: 100.0,
            circle_radius: 50.0,
            triangle_size: 100.0,
            style: Style::default(),
            text_style: TextStyle::default(),
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the viewport, history or tools cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::Invalid { field, reason });
        if self.history_limit == 0 {
            return invalid("history_limit", "must be at least 1");
        }
        if !(self.min_scale.is_finite() && self.min_scale > 0.0) {
            return invalid("min_scale", "must be positive");
        }
        if !(self.max_scale.is_finite() && self.max_scale >= self.min_scale) {
            return invalid("max_scale", "must not be below min_scale");
        }
        if !(self.scale_step.is_finite() && self.scale_step > 0.0) {
            return invalid("scale_step", "must be positive");
        }
        if !(self.erase_radius.is_finite() && self.erase_radius > 0.0) {
            return invalid("erase_radius", "must be positive");
        }
        if self.image_max_side == 0 {
            return invalid("image_max_side", "must be positive");
        }
        if self.autosave_interval_secs == 0 {
            return invalid("autosave_interval_secs", "must be positive");
        }
        let sizes = [
            ("rect_width", self.rect_width),
            ("rect_height", self.rect_height),
            ("circle_radius", self.circle_radius),
            ("triangle_size", self.triangle_size),
        ];
        for (field, value) in sizes {
            if !(value.is_finite() && value > 0.0) {
                return invalid(field, "must be positive");
            }
        }
        Ok(())
    }

    /// How long a cached canvas stays fresh.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_interval_secs)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json(r#"{ "history_limit": 5, "max_scale": 4.0 }"#).unwrap();
        assert_eq!(config.history_limit, 5);
        assert!((config.max_scale - 4.0).abs() < f64::EPSILON);
        assert!((config.min_scale - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.image_max_side, 4096);
    }

    #[test]
    fn test_rejects_inverted_scale_bounds() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "max_scale": 0.05 }"#),
            Err(ConfigError::Invalid { field: "max_scale", .. })
        ));
        assert!(matches!(
            EditorConfig::from_json(r#"{ "history_limit": 0 }"#),
            Err(ConfigError::Invalid { field: "history_limit", .. })
        ));
        assert!(matches!(
            EditorConfig::from_json(r#"{ "circle_radius": -1.0 }"#),
            Err(ConfigError::Invalid { field: "circle_radius", .. })
        ));
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EditorConfig::from_json("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }
}
