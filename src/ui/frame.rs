//! Frame scheduling and the status bar
//!
//! `EguiScheduler` asks egui for repaints on behalf of the scale controller:
//! egui only runs a frame when something requests one, so every deferred
//! measurement needs a repaint request to make progress.

use crate::scale::FrameScheduler;
use crate::state::UiState;
use eframe::egui::{self, Color32, RichText};
use std::time::Duration;

/// Requests repaints from an egui context.
#[derive(Clone)]
pub struct EguiScheduler {
    ctx: egui::Context,
}

impl EguiScheduler {
    pub fn new(ctx: egui::Context) -> Self {
        Self { ctx }
    }
}

impl FrameScheduler for EguiScheduler {
    fn request_frame(&self) {
        self.ctx.request_repaint();
    }

    fn request_frame_after(&self, delay: Duration) {
        self.ctx.request_repaint_after(delay);
    }
}

/// Draw the status bar: the current toast, or a hint while exports run.
pub fn show_status_bar(
    ui: &mut egui::Ui,
    state: &UiState,
    exports_pending: usize,
    scale: Option<f32>,
) {
    ui.horizontal(|ui| {
        if let Some(toast) = &state.toast_message {
            let text = RichText::new(toast).italics();
            let text = if state.toast_is_error {
                text.color(Color32::from_rgb(0xd0, 0x4a, 0x3a))
            } else {
                text
            };
            ui.label(text);
        } else if exports_pending > 0 {
            ui.spinner();
            ui.label(RichText::new(format!("Exporting ({})", exports_pending)).weak());
        }

        if let Some(scale) = scale {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(RichText::new(format!("{:.0}%", scale * 100.0)).weak().small());
            });
        }
    });
}
