//! UI components for Typogram
//!
//! The egui side of the views: each function draws a view's current tree
//! and reports what the user did.
//!
//! - `paper.rs` - the paper painter and layout recording
//! - `editor_panel.rs` - the editing form
//! - `frame.rs` - repaint scheduling and the status bar

mod editor_panel;
mod frame;
mod paper;

pub use editor_panel::show_editor;
pub use frame::{show_status_bar, EguiScheduler};
pub use paper::{measure_offscreen, show_paper};
