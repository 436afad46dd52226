//! Configuration shared by the engine and its callers.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitegateConfig {
    /// Timeline rendering parameters
    pub timeline: TimelineConfig,

    /// QA engine switches
    pub quality: QualityConfig,

    /// Directory of the JSON store
    pub storage_dir: std::path::PathBuf,
}

impl Default for SitegateConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            quality: QualityConfig::default(),
            storage_dir: std::path::PathBuf::from(".sitegate"),
        }
    }
}

impl SitegateConfig {
    /// Parse from JSON text; missing keys fall back to defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Timeline (Gantt) parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Allowed pixels-per-day range
    pub zoom: ZoomRange,

    /// Initial pixels per day
    pub default_pixels_per_day: f64,

    /// Height of one task row in pixels
    pub row_height: f64,

    /// Horizontal control-point offset of dependency arrows
    pub arrow_curve: f64,

    /// Default number of visible days
    pub window_days: u32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            zoom: ZoomRange::default(),
            default_pixels_per_day: 20.0,
            row_height: 32.0,
            arrow_curve: 16.0,
            window_days: 42,
        }
    }
}

/// Inclusive zoom bounds in pixels per day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 4.0, max: 80.0 }
    }
}

impl ZoomRange {
    /// Clamp a requested zoom into range. NaN falls back to the minimum.
    pub fn clamp(&self, pixels_per_day: f64) -> f64 {
        if pixels_per_day.is_nan() {
            return self.min;
        }
        pixels_per_day.max(self.min).min(self.max)
    }
}

/// QA engine switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Run the rule engine on task mutations
    pub enabled: bool,

    /// Publish notifications for new alerts
    pub notifications: bool,

    /// Optional webhook receiving notifications
    pub webhook_url: Option<String>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notifications: true,
            webhook_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_clamp() {
        let zoom = ZoomRange { min: 4.0, max: 80.0 };
        assert_eq!(zoom.clamp(1.0), 4.0);
        assert_eq!(zoom.clamp(500.0), 80.0);
        assert_eq!(zoom.clamp(12.5), 12.5);
        assert_eq!(zoom.clamp(f64::NAN), 4.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SitegateConfig::from_json(r#"{"timeline": {"row_height": 40.0}}"#).unwrap();
        assert_eq!(config.timeline.row_height, 40.0);
        assert_eq!(config.timeline.default_pixels_per_day, 20.0);
        assert!(config.quality.enabled);
        assert_eq!(config.storage_dir, std::path::PathBuf::from(".sitegate"));
    }
}
