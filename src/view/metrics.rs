//! Paper dimensions
//!
//! The paper has a fixed intrinsic width; only the type sizes change with
//! the chosen text size. Both the on-screen painter and the export
//! rasterizer lay out with these numbers so an export matches the preview.

use crate::gram::FontSize;
use crate::markup::BlockKind;

/// Intrinsic (unscaled) width of the paper in points.
pub const PAPER_WIDTH: f32 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperMetrics {
    pub width: f32,
    pub padding: f32,
    pub header_size: f32,
    pub footer_size: f32,
    pub body_size: f32,
    /// Line height as a multiple of the font size
    pub line_height: f32,
    /// Vertical space between body blocks
    pub block_gap: f32,
    /// Vertical space between header, body and footer
    pub section_gap: f32,
    /// Horizontal indent per list level and for quotes
    pub indent: f32,
}

impl PaperMetrics {
    pub fn for_size(size: FontSize) -> Self {
        let body_size = match size {
            FontSize::Small => 18.0,
            FontSize::Medium => 22.0,
            FontSize::Large => 28.0,
        };
        Self {
            width: PAPER_WIDTH,
            padding: 48.0,
            header_size: 14.0,
            footer_size: 14.0,
            body_size,
            line_height: 1.5,
            block_gap: body_size * 0.75,
            section_gap: 32.0,
            indent: body_size * 1.5,
        }
    }

    /// Width available to text inside the padding.
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.padding
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        let factor = match level {
            1 => 2.0,
            2 => 1.6,
            3 => 1.35,
            4 => 1.15,
            _ => 1.0,
        };
        self.body_size * factor
    }

    /// Font size used for a body block.
    pub fn block_font_size(&self, kind: &BlockKind) -> f32 {
        match kind {
            BlockKind::Heading(level) => self.heading_size(*level),
            BlockKind::Code => self.body_size * 0.85,
            _ => self.body_size,
        }
    }

    /// Left indent of a body block.
    pub fn block_indent(&self, kind: &BlockKind) -> f32 {
        match kind {
            BlockKind::ListItem { depth, .. } => self.indent * (*depth as f32 + 1.0),
            BlockKind::Quote => self.indent,
            _ => 0.0,
        }
    }
}
