//! User settings for Typogram
//!
//! This module defines the `Settings` struct that holds the window state,
//! the preview scaling parameters and the export preferences, with serde
//! support for JSON persistence. Document content is never stored here.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Window Size Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Window dimensions and position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSize {
    /// Window width in pixels
    pub width: f32,
    /// Window height in pixels
    pub height: f32,
    /// Window X position (optional, for restoring position)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// Window Y position (optional, for restoring position)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Whether the window was maximized
    #[serde(default)]
    pub maximized: bool,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            x: None,
            y: None,
            maximized: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Preview Scaling
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters of the preview fit-to-viewport computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSettings {
    /// Horizontal margin kept on each side of the paper
    pub margin: f32,
    /// Viewport widths at or below this use the compact layout
    pub breakpoint: f32,
    /// Upper bound of the scale in the compact layout
    pub compact_max_scale: f32,
    /// Upper bound of the scale in the wide layout
    pub max_scale: f32,
    /// Rate limit for resize-triggered recomputation
    pub debounce_ms: u64,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            margin: 16.0,
            breakpoint: 930.0,
            compact_max_scale: 0.8,
            max_scale: 1.0,
            debounce_ms: 300,
        }
    }
}

impl ScaleSettings {
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export
// ─────────────────────────────────────────────────────────────────────────────

/// Export preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Folder the PNGs are written to (platform download folder if unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_directory: Option<PathBuf>,
    /// Device pixels per paper point
    pub pixel_ratio: f32,
    /// Open the image with the system viewer once written
    pub open_after_export: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            download_directory: None,
            pixel_ratio: 2.0,
            open_after_export: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Main application settings.
///
/// This struct is serialized to JSON and persisted to the user's config directory.
/// All fields have sensible defaults via the `Default` trait and `#[serde(default)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Last window size and position
    pub window_size: WindowSize,

    /// Preview scaling parameters
    pub scale: ScaleSettings,

    /// Export preferences
    pub export: ExportSettings,

    /// Width of the editing form panel
    pub editor_width: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_size: WindowSize::default(),
            scale: ScaleSettings::default(),
            export: ExportSettings::default(),
            editor_width: 340.0,
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Minimum window dimension.
    pub const MIN_WINDOW_SIZE: f32 = 200.0;
    /// Maximum window dimension.
    pub const MAX_WINDOW_SIZE: f32 = 10000.0;
    /// Minimum editor panel width.
    pub const MIN_EDITOR_WIDTH: f32 = 240.0;
    /// Maximum editor panel width.
    pub const MAX_EDITOR_WIDTH: f32 = 800.0;
    /// Largest accepted export pixel ratio.
    pub const MAX_PIXEL_RATIO: f32 = 4.0;
    /// Longest accepted debounce window.
    pub const MAX_DEBOUNCE_MS: u64 = 5000;

    /// Sanitize settings by clamping values to valid ranges.
    ///
    /// This is useful after loading settings from a file that might have
    /// been manually edited with invalid values.
    pub fn sanitize(&mut self) {
        // Clamp window size
        self.window_size.width = self
            .window_size
            .width
            .clamp(Self::MIN_WINDOW_SIZE, Self::MAX_WINDOW_SIZE);
        self.window_size.height = self
            .window_size
            .height
            .clamp(Self::MIN_WINDOW_SIZE, Self::MAX_WINDOW_SIZE);

        self.editor_width = self
            .editor_width
            .clamp(Self::MIN_EDITOR_WIDTH, Self::MAX_EDITOR_WIDTH);

        // Scale bounds must be positive and finite; fall back per field
        let defaults = ScaleSettings::default();
        let scale = &mut self.scale;
        if !scale.margin.is_finite() || scale.margin < 0.0 {
            scale.margin = defaults.margin;
        }
        if !scale.breakpoint.is_finite() || scale.breakpoint <= 0.0 {
            scale.breakpoint = defaults.breakpoint;
        }
        if !scale.max_scale.is_finite() || scale.max_scale <= 0.0 {
            scale.max_scale = defaults.max_scale;
        }
        if !scale.compact_max_scale.is_finite() || scale.compact_max_scale <= 0.0 {
            scale.compact_max_scale = defaults.compact_max_scale;
        }
        scale.debounce_ms = scale.debounce_ms.min(Self::MAX_DEBOUNCE_MS);

        // Pixel ratio
        if !self.export.pixel_ratio.is_finite() {
            self.export.pixel_ratio = ExportSettings::default().pixel_ratio;
        }
        self.export.pixel_ratio = self.export.pixel_ratio.clamp(1.0, Self::MAX_PIXEL_RATIO);
    }

    /// Load settings and sanitize them to ensure validity.
    ///
    /// This is a convenience method that deserializes and then sanitizes.
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();

        assert_eq!(settings.window_size.width, 1200.0);
        assert_eq!(settings.window_size.height, 800.0);
        assert_eq!(settings.scale.margin, 16.0);
        assert_eq!(settings.scale.breakpoint, 930.0);
        assert_eq!(settings.scale.compact_max_scale, 0.8);
        assert_eq!(settings.scale.max_scale, 1.0);
        assert_eq!(settings.scale.debounce_ms, 300);
        assert!(settings.export.download_directory.is_none());
        assert_eq!(settings.export.pixel_ratio, 2.0);
        assert!(!settings.export.open_after_export);
    }

    #[test]
    fn test_debounce_window() {
        assert_eq!(
            ScaleSettings::default().debounce_window(),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn test_settings_serialization_roundtrip() {
        let mut settings = Settings::default();
        settings.export.download_directory = Some(PathBuf::from("/tmp/grams"));
        settings.scale.debounce_ms = 150;

        let json = serde_json::to_string_pretty(&settings).unwrap();
        let deserialized: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(settings, deserialized);
    }

    #[test]
    fn test_settings_deserialize_partial_json() {
        // Only some fields present - rest should use defaults
        let json = r#"{"scale": {"breakpoint": 1024.0}}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.scale.breakpoint, 1024.0);
        assert_eq!(settings.scale.margin, 16.0);
        assert_eq!(settings.export, ExportSettings::default());
    }

    #[test]
    fn test_settings_deserialize_empty_json() {
        // Empty JSON object - should use all defaults
        let json = "{}";
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_window_size_default() {
        let size = WindowSize::default();
        assert!(size.x.is_none());
        assert!(size.y.is_none());
        assert!(!size.maximized);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sanitization tests
    // ─────────────────────────────────────────────────────────────────────────
    #[test]
    fn test_sanitize_window_size() {
        let mut settings = Settings::default();
        settings.window_size.width = 10.0;
        settings.window_size.height = 50_000.0;
        settings.sanitize();
        assert_eq!(settings.window_size.width, Settings::MIN_WINDOW_SIZE);
        assert_eq!(settings.window_size.height, Settings::MAX_WINDOW_SIZE);
    }

    #[test]
    fn test_sanitize_scale_falls_back_per_field() {
        let mut settings = Settings::default();
        settings.scale.max_scale = 0.0;
        settings.scale.margin = -4.0;
        settings.scale.breakpoint = f32::NAN;
        settings.scale.compact_max_scale = 0.5;
        settings.sanitize();
        assert_eq!(settings.scale.max_scale, 1.0);
        assert_eq!(settings.scale.margin, 16.0);
        assert_eq!(settings.scale.breakpoint, 930.0);
        assert_eq!(settings.scale.compact_max_scale, 0.5);
    }

    #[test]
    fn test_sanitize_pixel_ratio() {
        let mut settings = Settings::default();
        settings.export.pixel_ratio = 0.1;
        settings.sanitize();
        assert_eq!(settings.export.pixel_ratio, 1.0);

        settings.export.pixel_ratio = 16.0;
        settings.sanitize();
        assert_eq!(settings.export.pixel_ratio, Settings::MAX_PIXEL_RATIO);
    }

    #[test]
    fn test_from_json_sanitized() {
        let json = r#"{"editor_width": 20.0, "scale": {"debounce_ms": 60000}}"#;
        let settings = Settings::from_json_sanitized(json).unwrap();
        assert_eq!(settings.editor_width, Settings::MIN_EDITOR_WIDTH);
        assert_eq!(settings.scale.debounce_ms, Settings::MAX_DEBOUNCE_MS);
    }
}
