//! Application state management for Typogram
//!
//! This module defines the `AppState` struct holding what the window keeps
//! between frames: the user settings and the transient status line. The
//! document itself lives in the `Record`, not here.

use crate::config::{load_config, save_config_silent, Settings};
use crate::export::ExportOutcome;
use log::{debug, info, warn};

/// How long an export status stays visible, in seconds.
pub const EXPORT_TOAST_SECONDS: f64 = 4.0;

// ─────────────────────────────────────────────────────────────────────────────
// UI State
// ─────────────────────────────────────────────────────────────────────────────

/// UI-related state that is not persisted.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Temporary toast message (shown in the status bar)
    pub toast_message: Option<String>,
    /// When the toast message should expire (as seconds since app start)
    pub toast_expires_at: Option<f64>,
    /// Whether the last toast reports a failure
    pub toast_is_error: bool,
    /// Width of the preview area in the last frame
    pub viewport_width: Option<f32>,
    /// Vertical scroll offset of the preview area in the last frame
    pub page_scroll: f32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Application State
// ─────────────────────────────────────────────────────────────────────────────

/// Central application state struct.
#[derive(Debug)]
pub struct AppState {
    /// User settings (loaded from config)
    pub settings: Settings,
    /// UI-related state
    pub ui: UiState,
    /// Whether settings have been modified and need saving
    settings_dirty: bool,
}

impl AppState {
    /// Create a new AppState with settings loaded from config.
    pub fn new() -> Self {
        let settings = load_config();
        info!("AppState initialized with settings");
        debug!("Scale: {:?}, export: {:?}", settings.scale, settings.export);
        Self::with_settings(settings)
    }

    /// Create an AppState with specific settings (useful for testing).
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            ui: UiState::default(),
            settings_dirty: false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Settings Management
    // ─────────────────────────────────────────────────────────────────────────

    /// Update settings and mark as dirty.
    pub fn update_settings<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        f(&mut self.settings);
        self.settings_dirty = true;
    }

    pub fn settings_dirty(&self) -> bool {
        self.settings_dirty
    }

    /// Save settings to config file if modified.
    ///
    /// Returns `true` if settings were saved.
    pub fn save_settings_if_dirty(&mut self) -> bool {
        if self.settings_dirty {
            if save_config_silent(&self.settings) {
                self.settings_dirty = false;
                info!("Settings saved");
                return true;
            }
            warn!("Failed to save settings");
        }
        false
    }

    /// Prepare state for application shutdown.
    pub fn shutdown(&mut self) {
        self.settings_dirty = true;
        self.save_settings_if_dirty();
        info!("AppState shutdown complete");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status Line
    // ─────────────────────────────────────────────────────────────────────────

    /// Show a temporary toast message (disappears after duration).
    ///
    /// `current_time` should be the current app time in seconds.
    /// `duration` is how long to show the message in seconds.
    pub fn show_toast(&mut self, message: impl Into<String>, current_time: f64, duration: f64) {
        self.ui.toast_message = Some(message.into());
        self.ui.toast_expires_at = Some(current_time + duration);
        self.ui.toast_is_error = false;
    }

    /// Show a temporary failure message.
    pub fn show_error_toast(
        &mut self,
        message: impl Into<String>,
        current_time: f64,
        duration: f64,
    ) {
        self.show_toast(message, current_time, duration);
        self.ui.toast_is_error = true;
    }

    /// Update toast state - clears expired toasts.
    ///
    /// Call this each frame with the current time.
    pub fn update_toast(&mut self, current_time: f64) {
        if let Some(expires_at) = self.ui.toast_expires_at {
            if current_time >= expires_at {
                self.ui.toast_message = None;
                self.ui.toast_expires_at = None;
                self.ui.toast_is_error = false;
            }
        }
    }

    /// Report how an export ended on the status line.
    pub fn report_export(&mut self, outcome: &ExportOutcome, current_time: f64) {
        match outcome {
            ExportOutcome::Downloaded { path, .. } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.show_toast(format!("Saved {}", name), current_time, EXPORT_TOAST_SECONDS);
            }
            ExportOutcome::Failed { error, .. } => {
                self.show_error_toast(
                    format!("Export failed: {}", error),
                    current_time,
                    EXPORT_TOAST_SECONDS,
                );
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
