//! The editing form
//!
//! The form tree mirrors the three steps of making a gram: the message, the
//! look, and the download. Controls carry the field they write and the
//! current value; the egui layer turns user input into `EditorAction`s.

use super::{BoundView, Compose, NodeId};
use crate::error::Result;
use crate::gram::{
    Choice, ColorScheme, Field, FontFamily, FontSize, Gram, GramPatch, Record, TextAlign,
};
use std::rc::Rc;

/// Project page linked from the form header.
pub const ABOUT_URL: &str = "https://github.com/thesephist/typogram";

/// One option of a select control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// A form control.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    TextInput {
        field: Field,
        label: &'static str,
        placeholder: &'static str,
        value: String,
    },
    TextArea {
        field: Field,
        label: &'static str,
        placeholder: &'static str,
        value: String,
        /// The text ends in a newline, so the sizer needs an extra line
        pad_end: bool,
    },
    Select {
        field: Field,
        label: &'static str,
        options: Vec<SelectOption>,
        selected: &'static str,
    },
    DownloadButton {
        label: &'static str,
    },
}

impl Control {
    fn select<C: Choice>(label: &'static str, current: C) -> Self {
        Control::Select {
            field: C::FIELD,
            label,
            options: C::all()
                .iter()
                .map(|choice| SelectOption {
                    value: choice.key(),
                    label: choice.label(),
                })
                .collect(),
            selected: current.key(),
        }
    }
}

/// A collapsible group of controls.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    /// Expanded until the user collapses it
    pub open: bool,
    pub controls: Vec<Control>,
}

/// Render tree of the editing form.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorForm {
    pub title: &'static str,
    pub about_url: &'static str,
    pub sections: Vec<Section>,
    pub credits: &'static str,
}

impl EditorForm {
    /// Every control in display order.
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.sections.iter().flat_map(|s| s.controls.iter())
    }
}

/// Input produced by the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    /// Write a field from its string form
    Set { field: Field, value: String },
    Download,
}

impl EditorAction {
    /// The patch a `Set` action stands for; `None` for `Download`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidFieldValue` for values outside the field's set.
    pub fn to_patch(&self) -> Option<Result<GramPatch>> {
        match self {
            EditorAction::Set { field, value } => Some(GramPatch::parse(*field, value)),
            EditorAction::Download => None,
        }
    }
}

/// Composes the editing form.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditorComposer;

impl Compose for EditorComposer {
    type Tree = EditorForm;

    fn compose(&self, gram: &Gram) -> EditorForm {
        let message = Section {
            title: "1. The message",
            open: true,
            controls: vec![
                Control::TextInput {
                    field: Field::Header,
                    label: "Header",
                    placeholder: "Title or subject",
                    value: gram.header.clone(),
                },
                Control::TextArea {
                    field: Field::BodyRaw,
                    label: "Body",
                    placeholder: "Start writing...",
                    value: gram.body_raw.clone(),
                    pad_end: gram.body_raw.ends_with('\n'),
                },
                Control::TextInput {
                    field: Field::Footer,
                    label: "Footer",
                    placeholder: "Source, link, or author",
                    value: gram.footer.clone(),
                },
            ],
        };

        let look = Section {
            title: "2. The look",
            open: true,
            controls: vec![
                Control::select::<TextAlign>("Alignment", gram.text_align),
                Control::select::<FontFamily>("Typography", gram.font_family),
                Control::select::<FontSize>("Text size", gram.font_size),
                Control::select::<ColorScheme>("Color", gram.color_scheme),
            ],
        };

        let download = Section {
            title: "3. Download",
            open: true,
            controls: vec![Control::DownloadButton {
                label: "Download (.png)",
            }],
        };

        EditorForm {
            title: "Typogram",
            about_url: ABOUT_URL,
            sections: vec![message, look, download],
            credits: "Made with egui and comrak.",
        }
    }
}

pub type EditorView = BoundView<EditorComposer>;

impl BoundView<EditorComposer> {
    pub fn new(record: &Rc<Record>, root: NodeId) -> Self {
        Self::bind(record, root, EditorComposer)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::markup::PlainTransform;

    fn form(gram: &Gram) -> EditorForm {
        EditorComposer.compose(gram)
    }

    #[test]
    fn test_sections_in_order() {
        let gram = Gram::initial(&PlainTransform);
        let titles: Vec<_> = form(&gram).sections.iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["1. The message", "2. The look", "3. Download"]);
    }

    #[test]
    fn test_sections_start_open() {
        let gram = Gram::initial(&PlainTransform);
        assert!(form(&gram).sections.iter().all(|s| s.open));
    }

    #[test]
    fn test_select_reflects_current_value() {
        let mut gram = Gram::initial(&PlainTransform);
        gram.font_family = FontFamily::Mono;
        let form = form(&gram);

        let typography = form
            .controls()
            .find(|c| matches!(c, Control::Select { field: Field::FontFamily, .. }))
            .cloned();
        match typography {
            Some(Control::Select {
                options, selected, ..
            }) => {
                assert_eq!(selected, "mono");
                let labels: Vec<_> = options.iter().map(|o| o.label).collect();
                assert_eq!(labels, vec!["serif", "sans-serif", "monospace"]);
            }
            other => panic!("unexpected control {:?}", other),
        }
    }

    #[test]
    fn test_textarea_pad_end() {
        let mut gram = Gram::initial(&PlainTransform);
        gram.body_raw = "line\n".to_string();
        let padded = form(&gram)
            .controls()
            .any(|c| matches!(c, Control::TextArea { pad_end: true, .. }));
        assert!(padded);
    }

    #[test]
    fn test_compose_is_pure() {
        let gram = Gram::initial(&PlainTransform);
        assert_eq!(form(&gram), form(&gram));
    }

    #[test]
    fn test_action_to_patch() {
        let action = EditorAction::Set {
            field: Field::ColorScheme,
            value: "dark".to_string(),
        };
        let patch = action.to_patch().unwrap().unwrap();
        assert_eq!(patch, GramPatch::new().color_scheme(ColorScheme::Dark));

        let bad = EditorAction::Set {
            field: Field::ColorScheme,
            value: "sepia".to_string(),
        };
        assert!(matches!(
            bad.to_patch(),
            Some(Err(Error::InvalidFieldValue { .. }))
        ));
        assert!(EditorAction::Download.to_patch().is_none());
    }

    #[test]
    fn test_editor_and_preview_stay_in_sync() {
        use crate::view::PreviewView;

        let record = Record::new(PlainTransform);
        let editor = EditorView::new(&record, NodeId(0));
        let preview = PreviewView::new(&record, NodeId(1));

        let action = EditorAction::Set {
            field: Field::Header,
            value: "Synced".to_string(),
        };
        if let Some(Ok(patch)) = action.to_patch() {
            record.update(patch);
        }

        assert_eq!(preview.tree().header, "Synced");
        let header_value = editor.tree().controls().find_map(|c| match c {
            Control::TextInput {
                field: Field::Header,
                value,
                ..
            } => Some(value.clone()),
            _ => None,
        });
        assert_eq!(header_value.as_deref(), Some("Synced"));
    }
}
