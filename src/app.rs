//! Main application module for Typogram
//!
//! This module implements the eframe App trait: it owns the document
//! record, the views bound to it, the scale controller and the export
//! pipeline, and drives them from the egui frame loop.
//!
//! Each frame:
//! 1. the editor panel draws the form and collects user actions,
//! 2. the central panel paints the preview and records its layout width,
//! 3. transient export views are laid out offscreen,
//! 4. the scale controller advances its deferred measurement,
//! 5. user actions are applied to the record,
//! 6. settled exports are downloaded and released.

use crate::config::{Settings, WindowSize};
use crate::error::Error;
use crate::export::{ExportPipeline, FolderDownloader, SoftwareRasterizer};
use crate::gram::{Field, Record};
use crate::markup::MarkdownTransform;
use crate::scale::{ScaleController, SystemClock};
use crate::state::{AppState, EXPORT_TOAST_SECONDS};
use crate::theme::{self, PaperPalette};
use crate::ui::{measure_offscreen, show_editor, show_paper, show_status_bar, EguiScheduler};
use crate::view::{EditorAction, EditorView, NodeId, Placement, PreviewView, Stage};
use eframe::egui;
use log::{debug, info, warn};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Application name shown in the title bar.
const APP_NAME: &str = "Typogram";

/// Poll interval while exports are rasterizing.
const EXPORT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Canvas around a dark paper.
const DARK_CANVAS: egui::Color32 = egui::Color32::from_rgb(58, 58, 62);

/// Viewport width change below which a resize is ignored.
const RESIZE_EPSILON: f32 = 0.5;

/// The main application.
pub struct TypogramApp {
    /// Settings and status line
    state: AppState,
    /// The document, shared by every view
    record: Rc<Record>,
    /// Mounted view roots
    stage: Stage,
    /// The scaled paper
    preview: PreviewView,
    /// The editing form
    editor: EditorView,
    /// Fits the preview into the viewport
    scale: ScaleController,
    /// In-flight exports
    exports: ExportPipeline,
    /// `None` when the bundled fonts could not be loaded
    rasterizer: Option<SoftwareRasterizer>,
    /// Whether the eager startup measurement has run
    started: bool,
    /// Last known window size (for detecting changes)
    last_window_size: Option<egui::Vec2>,
    /// Last known window position (for detecting changes)
    last_window_pos: Option<egui::Pos2>,
    /// Title last sent to the viewport
    last_title: String,
    /// Application start time for timing toast messages
    start_time: Instant,
}

impl TypogramApp {
    /// Create a new TypogramApp instance.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        info!("Initializing {}", APP_NAME);
        theme::apply(&cc.egui_ctx);

        let state = AppState::new();
        let record = Record::new(MarkdownTransform::new());

        let mut stage = Stage::new();
        let editor_root = stage.allocate();
        let preview_root = stage.allocate();
        stage.mount(editor_root, Placement::Flow);
        stage.mount(preview_root, Placement::Flow);

        let editor = EditorView::new(&record, editor_root);
        let preview = PreviewView::new(&record, preview_root);

        let scale = ScaleController::new(
            state.settings.scale,
            Box::new(SystemClock),
            Box::new(EguiScheduler::new(cc.egui_ctx.clone())),
        );
        let exports = ExportPipeline::new(state.settings.export.pixel_ratio);

        let rasterizer = match SoftwareRasterizer::new() {
            Ok(rasterizer) => Some(rasterizer),
            Err(e) => {
                warn!("Image export disabled: {}", e);
                None
            }
        };

        Self {
            state,
            record,
            stage,
            preview,
            editor,
            scale,
            exports,
            rasterizer,
            started: false,
            last_window_size: None,
            last_window_pos: None,
            last_title: String::new(),
            start_time: Instant::now(),
        }
    }

    /// Get elapsed time since app start in seconds.
    fn get_app_time(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    /// Update window size in settings if changed.
    ///
    /// Returns `true` if the window state was updated.
    fn update_window_state(&mut self, ctx: &egui::Context) -> bool {
        let Some(rect) = ctx.input(|i| i.viewport().outer_rect) else {
            return false;
        };
        let current_size = rect.size();
        let current_pos = rect.min;

        let size_changed = self
            .last_window_size
            .map(|s| (s - current_size).length() > 1.0)
            .unwrap_or(true);
        let pos_changed = self
            .last_window_pos
            .map(|p| (p - current_pos).length() > 1.0)
            .unwrap_or(true);
        if !size_changed && !pos_changed {
            return false;
        }

        self.last_window_size = Some(current_size);
        self.last_window_pos = Some(current_pos);
        let maximized = ctx.input(|i| i.viewport().maximized.unwrap_or(false));

        self.state.update_settings(|settings| {
            settings.window_size = WindowSize {
                width: current_size.x,
                height: current_size.y,
                x: Some(current_pos.x),
                y: Some(current_pos.y),
                maximized,
            };
        });
        debug!(
            "Window state updated: {}x{} at ({}, {}), maximized: {}",
            current_size.x, current_size.y, current_pos.x, current_pos.y, maximized
        );
        true
    }

    /// "Header - Typogram", or just the app name for an empty header.
    fn window_title(&self) -> String {
        let value = self.record.get(Field::Header);
        let header = value.as_text().map(str::trim).unwrap_or_default();
        if header.is_empty() {
            APP_NAME.to_string()
        } else {
            format!("{} - {}", header, APP_NAME)
        }
    }

    fn preview_root(&self) -> NodeId {
        self.preview.root()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Panels
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw the editing form; returns the actions it produced.
    fn render_editor(&mut self, ctx: &egui::Context) -> Vec<EditorAction> {
        let form = self.editor.tree();
        let download_enabled = self.rasterizer.is_some();
        let mut actions = Vec::new();

        let panel = egui::SidePanel::left("editor_panel")
            .resizable(true)
            .default_width(self.state.settings.editor_width)
            .width_range(Settings::MIN_EDITOR_WIDTH..=Settings::MAX_EDITOR_WIDTH)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    actions = show_editor(ui, &form, download_enabled);
                });
            });

        let width = panel.response.rect.width();
        if (width - self.state.settings.editor_width).abs() > 1.0 {
            self.state.update_settings(|s| s.editor_width = width);
        }
        actions
    }

    fn render_status_bar(&mut self, ctx: &egui::Context) {
        let pending = self.exports.pending();
        let scale = self.scale.last_decision().map(|d| d.applied);
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            show_status_bar(ui, &self.state.ui, pending, scale);
        });
    }

    /// Paint the preview and feed viewport width changes to the scale
    /// controller.
    fn render_preview(&mut self, ctx: &egui::Context) {
        let root = self.preview_root();
        let tree = self.preview.tree();
        let margin = self.state.settings.scale.margin;
        let stage = &mut self.stage;

        let mut frame = egui::Frame::central_panel(&ctx.style());
        if PaperPalette::for_scheme(tree.color_scheme).is_dark() {
            frame = frame.fill(DARK_CANVAS);
        }

        let viewport_width = egui::CentralPanel::default()
            .frame(frame)
            .show(ctx, |ui| {
                let viewport_width = ui.max_rect().width();
                let scroll = egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        ui.add_space(margin);
                        show_paper(ui, stage, root, &tree);
                        ui.add_space(margin);
                    });
                self.state.ui.page_scroll = scroll.state.offset.y;
                viewport_width
            })
            .inner;

        if !self.started {
            self.started = true;
            self.scale.start(viewport_width);
        } else if self
            .state
            .ui
            .viewport_width
            .map_or(true, |last| (last - viewport_width).abs() > RESIZE_EPSILON)
        {
            self.scale.on_resize(viewport_width);
        }
        self.state.ui.viewport_width = Some(viewport_width);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Actions
    // ─────────────────────────────────────────────────────────────────────────

    fn apply_actions(&mut self, ctx: &egui::Context, actions: Vec<EditorAction>) {
        for action in actions {
            match action.to_patch() {
                Some(Ok(patch)) => self.record.update(patch),
                Some(Err(e)) => warn!("Ignoring editor input: {}", e),
                None => self.handle_download(ctx),
            }
        }
    }

    fn handle_download(&mut self, ctx: &egui::Context) {
        let Some(rasterizer) = &self.rasterizer else {
            let error = Error::Application("image export is unavailable".to_string());
            warn!("Download requested: {}", error);
            let time = self.get_app_time();
            self.state
                .show_error_toast(error.to_string(), time, EXPORT_TOAST_SECONDS);
            return;
        };
        self.exports
            .set_pixel_ratio(self.state.settings.export.pixel_ratio);
        let node = self.exports.export(
            &self.record,
            &mut self.stage,
            rasterizer,
            self.state.ui.page_scroll,
        );
        debug!("Export {} queued", node);
        ctx.request_repaint();
    }

    /// Finish settled exports and report them on the status line.
    fn poll_exports(&mut self, ctx: &egui::Context) {
        if self.exports.is_idle() {
            return;
        }
        let downloader = FolderDownloader::new(
            self.state.settings.export.download_directory.clone(),
            self.state.settings.export.open_after_export,
        );
        let outcomes = self
            .exports
            .poll(&self.record, &mut self.stage, &downloader);

        let time = self.get_app_time();
        for outcome in &outcomes {
            debug!("Export {} settled", outcome.node());
            self.state.report_export(outcome, time);
        }
        if !self.exports.is_idle() {
            ctx.request_repaint_after(EXPORT_POLL_INTERVAL);
        }
    }
}

impl eframe::App for TypogramApp {
    /// Called each time the UI needs repainting.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Update toast message (clear if expired)
        let current_time = self.get_app_time();
        self.state.update_toast(current_time);
        if let Some(expires_at) = self.state.ui.toast_expires_at {
            ctx.request_repaint_after(Duration::from_secs_f64(
                (expires_at - current_time).max(0.0),
            ));
        }

        // Track window size/position changes for persistence
        self.update_window_state(ctx);

        let actions = self.render_editor(ctx);
        self.render_status_bar(ctx);
        self.render_preview(ctx);

        for (node, tree) in self.exports.trees() {
            measure_offscreen(ctx, &mut self.stage, node, &tree);
        }

        let root = self.preview_root();
        if let Some(transform) = self.scale.on_frame(&self.stage, root) {
            self.preview.set_transform(transform);
            ctx.request_repaint();
        }

        if !actions.is_empty() {
            self.apply_actions(ctx, actions);
            ctx.request_repaint();
        }
        self.poll_exports(ctx);

        let title = self.window_title();
        if title != self.last_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.last_title = title;
        }
    }

    /// Called when the application is about to close.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application exiting");
        if !self.exports.is_idle() {
            warn!("{} export(s) still running at exit", self.exports.pending());
        }
        self.state.shutdown();
    }

    /// Save persistent state.
    fn save(&mut self, _storage: &mut dyn eframe::Storage) {
        debug!("Saving application state");
        self.state.save_settings_if_dirty();
    }

    /// Auto-save interval in seconds.
    fn auto_save_interval(&self) -> Duration {
        Duration::from_secs(30)
    }
}
