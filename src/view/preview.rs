//! The paper preview
//!
//! The preview composes a `PaperTree` from the gram and its current
//! `PaperTransform`. The transform is a parameter of the composer rather than
//! part of the gram, so rescaling re-renders the preview without touching
//! the record or any other view.

use super::{BoundView, Compose, NodeId};
use crate::gram::{Choice, ColorScheme, FontFamily, FontSize, Gram, Record, TextAlign};
use crate::markup::RenderedBody;
use std::rc::Rc;

// ─────────────────────────────────────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────────────────────────────────────

/// Visual transform applied to the paper root.
///
/// Transforms do not affect layout: the paper keeps its intrinsic width and
/// the optional vertical margin compensates for the space a shrink leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperTransform {
    pub scale: f32,
    /// Translate by -50% of the width before scaling, to center the paper
    pub recenter: bool,
    /// Top and bottom margin as a percentage (negative pulls content in)
    pub margin_y_percent: Option<f32>,
}

impl Default for PaperTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl PaperTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            recenter: false,
            margin_y_percent: None,
        }
    }

    /// Transform for an applied scale.
    ///
    /// `compact` recenters the paper; a scale below `margin_threshold` adds a
    /// `(scale - 1) * 50%` vertical margin.
    pub fn fitted(scale: f32, compact: bool, margin_threshold: f32) -> Self {
        Self {
            scale,
            recenter: compact,
            margin_y_percent: (scale < margin_threshold).then(|| (scale - 1.0) * 50.0),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// CSS-like description, used in logs.
    pub fn describe(&self) -> String {
        let transform = match (self.recenter, self.is_identity()) {
            (_, true) => "none".to_string(),
            (true, false) => format!("translateX(-50%) scale({:.3})", self.scale),
            (false, false) => format!("scale({:.3})", self.scale),
        };
        match self.margin_y_percent {
            Some(margin) => format!("transform: {}; margin: {:.1}% 0", transform, margin),
            None => format!("transform: {}", transform),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Paper Tree
// ─────────────────────────────────────────────────────────────────────────────

/// Render tree of the paper.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperTree {
    pub font_family: FontFamily,
    pub text_align: TextAlign,
    pub color_scheme: ColorScheme,
    pub font_size: FontSize,
    pub transform: PaperTransform,
    pub header: String,
    pub body: RenderedBody,
    pub footer: String,
}

impl PaperTree {
    /// Class list of the paper root.
    pub fn class_name(&self) -> String {
        format!(
            "paper typogram font-{} align-{} scheme-{} size-{}",
            self.font_family.key(),
            self.text_align.key(),
            self.color_scheme.key(),
            self.font_size.key()
        )
    }
}

/// Composes the paper with a fixed transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreviewComposer {
    pub transform: PaperTransform,
}

impl Compose for PreviewComposer {
    type Tree = PaperTree;

    fn compose(&self, gram: &Gram) -> PaperTree {
        PaperTree {
            font_family: gram.font_family,
            text_align: gram.text_align,
            color_scheme: gram.color_scheme,
            font_size: gram.font_size,
            transform: self.transform,
            header: gram.header.clone(),
            body: gram.body.clone(),
            footer: gram.footer.clone(),
        }
    }
}

pub type PreviewView = BoundView<PreviewComposer>;

impl BoundView<PreviewComposer> {
    /// Bind a preview starting at scale 1.
    pub fn new(record: &Rc<Record>, root: NodeId) -> Self {
        Self::bind(record, root, PreviewComposer::default())
    }

    pub fn transform(&self) -> PaperTransform {
        self.composer(|c| c.transform)
    }

    /// Apply a new transform and re-render the preview only.
    pub fn set_transform(&self, transform: PaperTransform) {
        self.reconfigure(|c| c.transform = transform);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gram::GramPatch;
    use crate::markup::{MarkdownTransform, PlainTransform};

    #[test]
    fn test_compose_is_pure() {
        let gram = Gram::initial(&MarkdownTransform::new());
        let composer = PreviewComposer {
            transform: PaperTransform::fitted(0.7, true, 0.8),
        };
        assert_eq!(composer.compose(&gram), composer.compose(&gram));
    }

    #[test]
    fn test_class_name() {
        let gram = Gram::initial(&PlainTransform);
        let tree = PreviewComposer::default().compose(&gram);
        assert_eq!(
            tree.class_name(),
            "paper typogram font-serif align-left scheme-light size-small"
        );
    }

    #[test]
    fn test_fitted_margin_below_threshold() {
        let t = PaperTransform::fitted(0.6, true, 0.8);
        assert!(t.recenter);
        let margin = t.margin_y_percent.unwrap();
        assert!((margin - (-20.0)).abs() < 1e-4);

        let t = PaperTransform::fitted(0.8, true, 0.8);
        assert_eq!(t.margin_y_percent, None);
    }

    #[test]
    fn test_describe() {
        assert_eq!(PaperTransform::identity().describe(), "transform: none");
        assert_eq!(
            PaperTransform::fitted(0.5, true, 0.8).describe(),
            "transform: translateX(-50%) scale(0.500); margin: -25.0% 0"
        );
        assert_eq!(
            PaperTransform::fitted(0.9, false, 0.8).describe(),
            "transform: scale(0.900)"
        );
    }

    #[test]
    fn test_set_transform_rerenders_preview_only() {
        let record = Record::new(PlainTransform);
        let preview = PreviewView::new(&record, NodeId(0));
        let other = PreviewView::new(&record, NodeId(1));
        assert!(preview.transform().is_identity());

        let fitted = PaperTransform::fitted(0.75, true, 0.8);
        preview.set_transform(fitted);

        assert_eq!(preview.tree().transform, fitted);
        assert_eq!(preview.render_count(), 2);
        assert_eq!(other.render_count(), 1);
        assert!(other.tree().transform.is_identity());
    }

    #[test]
    fn test_preview_follows_record() {
        let record = Record::new(PlainTransform);
        let preview = PreviewView::new(&record, NodeId(0));
        record.update(GramPatch::new().body_raw("hello").header("H"));

        let tree = preview.tree();
        assert_eq!(tree.header, "H");
        assert_eq!(tree.body.plain_text(), "hello");
    }
}
