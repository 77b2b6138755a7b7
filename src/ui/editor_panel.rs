//! Editor panel
//!
//! Draws the `EditorForm` tree. Inputs are controlled: each frame starts
//! from the value in the tree, and an edit turns into an `EditorAction` that
//! the app applies to the record. The next frame shows the record's value.

use crate::gram::Field;
use crate::view::{Control, EditorAction, EditorForm};
use eframe::egui::{self, RichText, Ui};

/// Smallest number of rows shown for the body.
const MIN_BODY_ROWS: usize = 6;

/// Show the form; returns the actions the user triggered this frame.
///
/// `download_enabled` greys out the download button while no rasterizer is
/// available.
pub fn show_editor(ui: &mut Ui, form: &EditorForm, download_enabled: bool) -> Vec<EditorAction> {
    let mut actions = Vec::new();

    ui.horizontal(|ui| {
        ui.heading(RichText::new(form.title).strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.hyperlink_to("About", form.about_url);
        });
    });
    ui.add_space(8.0);

    for section in &form.sections {
        egui::CollapsingHeader::new(RichText::new(section.title).strong().size(15.0))
            .id_source(section.title)
            .default_open(section.open)
            .show(ui, |ui| {
                ui.add_space(4.0);
                for control in &section.controls {
                    if let Some(action) = show_control(ui, control, download_enabled) {
                        actions.push(action);
                    }
                    ui.add_space(6.0);
                }
            });
        ui.add_space(4.0);
        ui.separator();
        ui.add_space(4.0);
    }

    ui.label(RichText::new(form.credits).small().weak());
    actions
}

fn show_control(ui: &mut Ui, control: &Control, download_enabled: bool) -> Option<EditorAction> {
    match control {
        Control::TextInput {
            field,
            label,
            placeholder,
            value,
        } => {
            ui.label(*label);
            let mut text = value.clone();
            ui.add(
                egui::TextEdit::singleline(&mut text)
                    .hint_text(*placeholder)
                    .desired_width(f32::INFINITY),
            );
            text_action(*field, value, text)
        }
        Control::TextArea {
            field,
            label,
            placeholder,
            value,
            pad_end,
        } => {
            ui.label(*label);
            let mut text = value.clone();
            ui.add(
                egui::TextEdit::multiline(&mut text)
                    .hint_text(*placeholder)
                    .desired_rows(body_rows(value, *pad_end))
                    .desired_width(f32::INFINITY),
            );
            text_action(*field, value, text)
        }
        Control::Select {
            field,
            label,
            options,
            selected,
        } => {
            ui.label(*label);
            let mut clicked = None;
            ui.horizontal_wrapped(|ui| {
                for option in options {
                    let is_selected = option.value == *selected;
                    if ui.selectable_label(is_selected, option.label).clicked() {
                        clicked = Some(option.value);
                    }
                }
            });
            select_action(*field, selected, clicked)
        }
        Control::DownloadButton { label } => {
            ui.add_enabled(download_enabled, egui::Button::new(*label))
                .on_disabled_hover_text("Image export is unavailable")
                .clicked()
                .then_some(EditorAction::Download)
        }
    }
}

/// Rows for the body editor: one per line, plus one when the text ends in a
/// newline so the caret line stays visible.
fn body_rows(value: &str, pad_end: bool) -> usize {
    let lines = value.lines().count() + usize::from(pad_end);
    lines.max(MIN_BODY_ROWS)
}

/// A `Set` action when a text control's content changed.
fn text_action(field: Field, before: &str, after: String) -> Option<EditorAction> {
    (before != after).then_some(EditorAction::Set {
        field,
        value: after,
    })
}

/// A `Set` action when an option other than the selected one was clicked.
fn select_action(field: Field, selected: &str, clicked: Option<&str>) -> Option<EditorAction> {
    clicked
        .filter(|value| *value != selected)
        .map(|value| EditorAction::Set {
            field,
            value: value.to_string(),
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gram::{ColorScheme, Gram, Record};
    use crate::markup::PlainTransform;
    use crate::view::{Compose, EditorComposer};

    #[test]
    fn test_unchanged_text_yields_nothing() {
        assert_eq!(text_action(Field::Header, "a", "a".to_string()), None);
    }

    #[test]
    fn test_changed_text_sets_field() {
        let action = text_action(Field::Footer, "a", "ab".to_string());
        assert_eq!(
            action,
            Some(EditorAction::Set {
                field: Field::Footer,
                value: "ab".to_string()
            })
        );
    }

    #[test]
    fn test_select_ignores_current_option() {
        assert_eq!(select_action(Field::TextAlign, "left", Some("left")), None);
        assert_eq!(select_action(Field::TextAlign, "left", None), None);
    }

    #[test]
    fn test_select_action_applies_to_record() {
        let record = Record::new(PlainTransform);
        let action = select_action(Field::ColorScheme, "light", Some("dark"));
        let patch = action.and_then(|a| a.to_patch()).unwrap().unwrap();
        record.update(patch);
        assert_eq!(record.snapshot().color_scheme, ColorScheme::Dark);
    }

    #[test]
    fn test_body_rows() {
        assert_eq!(body_rows("one", false), MIN_BODY_ROWS);
        let long = "a\nb\nc\nd\ne\nf\ng\n";
        assert_eq!(body_rows(long, true), 8);
        assert_eq!(body_rows(long, false), 7);
    }

    #[test]
    fn test_show_editor_without_input_yields_nothing() {
        let form = EditorComposer.compose(&Gram::initial(&PlainTransform));
        let ctx = egui::Context::default();
        let mut actions = Vec::new();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                actions = show_editor(ui, &form, true);
            });
        });
        assert!(actions.is_empty());
    }
}
