//! Paper painter
//!
//! Lays a `PaperTree` out as egui galleys at the tree's scale and paints it.
//! Layout uses the same `PaperMetrics` as the export rasterizer, scaled by
//! the transform, so the preview matches an export at any size.
//!
//! Painting a mounted root also records its unscaled width on the `Stage`,
//! which is what the scale controller measures. Offscreen roots are laid
//! out and recorded but never painted.

use crate::gram::FontFamily;
use crate::markup::{BlockKind, Span, SpanStyle};
use crate::theme::PaperPalette;
use crate::view::{NodeId, PaperMetrics, PaperTransform, PaperTree, Stage};
use eframe::egui::{
    self, epaint::Fonts, pos2, text::LayoutJob, vec2, Align, Color32, FontId, Galley, Pos2, Rect,
    Rounding, Stroke, TextFormat, Vec2,
};
use log::debug;
use std::sync::Arc;

/// Corner radius of the paper at scale 1.
const PAPER_ROUNDING: f32 = 6.0;

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Mark {
    Text {
        pos: Pos2,
        galley: Arc<Galley>,
        /// The strong spans alone, painted slightly offset over `galley`
        bold: Option<Arc<Galley>>,
    },
    Fill {
        rect: Rect,
        color: Color32,
    },
}

/// A laid out paper, in scaled points relative to its top-left corner.
#[derive(Clone)]
pub struct PaperLayout {
    pub size: Vec2,
    pub scale: f32,
    background: Color32,
    ink: Color32,
    marks: Vec<Mark>,
}

impl PaperLayout {
    /// Lay `tree` out at its own transform's scale.
    pub fn build(ctx: &egui::Context, tree: &PaperTree) -> Self {
        let scale = if tree.transform.scale.is_finite() && tree.transform.scale > 0.0 {
            tree.transform.scale
        } else {
            1.0
        };
        ctx.fonts(|fonts| Builder::new(fonts, tree, scale).run())
    }

    /// Width the paper occupies before scaling.
    pub fn intrinsic_width(&self) -> f32 {
        self.size.x / self.scale
    }

    pub fn intrinsic_height(&self) -> f32 {
        self.size.y / self.scale
    }

    /// Paint with the top-left corner at `origin`.
    pub fn paint(&self, painter: &egui::Painter, origin: Pos2) {
        let rect = Rect::from_min_size(origin, self.size);
        painter.rect_filled(
            rect,
            Rounding::same(PAPER_ROUNDING * self.scale),
            self.background,
        );

        let offset = origin.to_vec2();
        for mark in &self.marks {
            match mark {
                Mark::Fill { rect, color } => {
                    painter.rect_filled(rect.translate(offset), 0.0, *color);
                }
                Mark::Text { pos, galley, bold } => {
                    painter.galley(*pos + offset, Arc::clone(galley), self.ink);
                    if let Some(bold) = bold {
                        let nudge = vec2(0.6 * self.scale.max(0.5), 0.0);
                        painter.galley(*pos + offset + nudge, Arc::clone(bold), self.ink);
                    }
                }
            }
        }
    }
}

/// How a paragraph is drawn before span styles apply.
#[derive(Debug, Clone, Copy)]
struct Run {
    color: Color32,
    mono: bool,
    bold: bool,
    italic: bool,
}

impl Run {
    fn plain(color: Color32, mono: bool) -> Self {
        Self {
            color,
            mono,
            bold: false,
            italic: false,
        }
    }
}

struct Builder<'a> {
    fonts: &'a Fonts,
    tree: &'a PaperTree,
    metrics: PaperMetrics,
    palette: PaperPalette,
    scale: f32,
    marks: Vec<Mark>,
    /// Unscaled cursor
    y: f32,
}

impl<'a> Builder<'a> {
    fn new(fonts: &'a Fonts, tree: &'a PaperTree, scale: f32) -> Self {
        let metrics = PaperMetrics::for_size(tree.font_size);
        Self {
            fonts,
            tree,
            metrics,
            palette: PaperPalette::for_scheme(tree.color_scheme),
            scale,
            marks: Vec::new(),
            y: metrics.padding,
        }
    }

    fn run(mut self) -> PaperLayout {
        let muted = Run::plain(self.palette.muted, self.body_mono());

        if !self.tree.header.is_empty() {
            let spans = [Span::plain(self.tree.header.clone())];
            self.paragraph(&spans, self.metrics.header_size, 0.0, muted);
        }
        self.y += self.metrics.section_gap;

        let tree = self.tree;
        for (i, block) in tree.body.blocks.iter().enumerate() {
            if i > 0 {
                self.y += self.metrics.block_gap;
            }
            self.block(&block.kind, &block.spans);
        }

        self.y += self.metrics.section_gap;
        if !self.tree.footer.is_empty() {
            let spans = [Span::plain(self.tree.footer.clone())];
            self.paragraph(&spans, self.metrics.footer_size, 0.0, muted);
        }

        let height = self.y + self.metrics.padding;
        PaperLayout {
            size: vec2(self.metrics.width, height) * self.scale,
            scale: self.scale,
            background: self.palette.background,
            ink: self.palette.text,
            marks: self.marks,
        }
    }

    fn at(&self, x: f32, y: f32) -> Pos2 {
        pos2(x * self.scale, y * self.scale)
    }

    fn scaled_rect(&self, x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::from_min_size(self.at(x, y), vec2(w, h) * self.scale)
    }

    fn body_mono(&self) -> bool {
        self.tree.font_family == FontFamily::Mono
    }

    fn block(&mut self, kind: &BlockKind, spans: &[Span]) {
        let size = self.metrics.block_font_size(kind);
        let indent = self.metrics.block_indent(kind);
        let left = self.metrics.padding;
        let mut run = Run::plain(self.palette.text, self.body_mono());

        match kind {
            BlockKind::Rule => {
                let y = self.y + self.metrics.block_gap / 2.0;
                let rect = self.scaled_rect(left, y, self.metrics.content_width(), 1.0);
                self.marks.push(Mark::Fill {
                    rect,
                    color: self.palette.rule,
                });
                self.y += self.metrics.block_gap;
            }
            BlockKind::Code => {
                let pad = size * 0.5;
                let background = self.marks.len();
                let top = self.y;
                self.y += pad;
                run.mono = true;
                run.color = self.palette.code;
                self.paragraph(spans, size, pad, run);
                self.y += pad;
                let rect = self.scaled_rect(left, top, self.metrics.content_width(), self.y - top);
                self.marks.insert(
                    background,
                    Mark::Fill {
                        rect,
                        color: self.palette.code_background,
                    },
                );
            }
            BlockKind::Quote => {
                let top = self.y;
                run.italic = true;
                self.paragraph(spans, size, indent, run);
                let rect = self.scaled_rect(left + indent * 0.3, top, 3.0, self.y - top);
                self.marks.push(Mark::Fill {
                    rect,
                    color: self.palette.rule,
                });
            }
            BlockKind::ListItem { marker, .. } => {
                let mut job = LayoutJob::single_section(
                    marker.clone(),
                    self.format(SpanStyle::default(), size, run),
                );
                job.halign = Align::RIGHT;
                let galley = self.fonts.layout_job(job);
                self.marks.push(Mark::Text {
                    pos: self.at(left + indent - size * 0.4, self.y),
                    galley,
                    bold: None,
                });
                self.paragraph(spans, size, indent, run);
            }
            BlockKind::Heading(_) => {
                run.bold = true;
                self.paragraph(spans, size, indent, run);
            }
            BlockKind::Paragraph => self.paragraph(spans, size, indent, run),
        }
    }

    fn format(&self, style: SpanStyle, size: f32, run: Run) -> TextFormat {
        let scaled = size * self.scale;
        let font_id = if run.mono || style.code {
            FontId::monospace(scaled)
        } else {
            FontId::proportional(scaled)
        };
        let stroke_width = self.scale.max(0.5);

        let mut format = TextFormat {
            font_id,
            color: run.color,
            italics: run.italic || style.emphasis,
            line_height: Some(scaled * self.metrics.line_height),
            ..Default::default()
        };
        if style.code {
            format.color = self.palette.code;
            format.background = self.palette.code_background;
        }
        if style.link {
            format.color = self.palette.link;
            format.underline = Stroke::new(stroke_width, self.palette.link);
        }
        if style.strikethrough {
            format.strikethrough = Stroke::new(stroke_width, format.color);
        }
        format
    }

    /// Wrap `spans` into the content box and advance the cursor.
    ///
    /// No bold face is loaded. Strong spans, or every span of a bold run,
    /// get a second pass: the same job with everything else transparent.
    fn paragraph(&mut self, spans: &[Span], size: f32, indent: f32, run: Run) {
        let available = self.metrics.content_width() - indent;
        let factor = self.tree.text_align.factor();
        let halign = if factor <= 0.0 {
            Align::LEFT
        } else if factor >= 1.0 {
            Align::RIGHT
        } else {
            Align::Center
        };

        let mut job = LayoutJob::default();
        let mut bold_job = LayoutJob::default();
        let mut any_bold = false;
        for span in spans {
            let format = self.format(span.style, size, run);
            let bold = run.bold || span.style.strong;
            any_bold |= bold;
            let overlay = if bold {
                TextFormat {
                    background: Color32::TRANSPARENT,
                    underline: Stroke::NONE,
                    strikethrough: Stroke::NONE,
                    ..format.clone()
                }
            } else {
                TextFormat {
                    color: Color32::TRANSPARENT,
                    background: Color32::TRANSPARENT,
                    underline: Stroke::NONE,
                    strikethrough: Stroke::NONE,
                    ..format.clone()
                }
            };
            job.append(&span.text, 0.0, format);
            bold_job.append(&span.text, 0.0, overlay);
        }
        for job in [&mut job, &mut bold_job] {
            job.wrap.max_width = available * self.scale;
            job.halign = halign;
        }

        let galley = self.fonts.layout_job(job);
        let bold = any_bold.then(|| self.fonts.layout_job(bold_job));
        let height = galley.size().y / self.scale;
        self.marks.push(Mark::Text {
            pos: self.at(self.metrics.padding + indent + available * factor, self.y),
            galley,
            bold,
        });
        self.y += height.max(size * self.metrics.line_height);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Placement
// ─────────────────────────────────────────────────────────────────────────────

/// Where a scaled paper lands inside the area given to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperPlacement {
    /// Space the paper takes in the surrounding layout
    pub allocated: Rect,
    /// Where the scaled paper is painted
    pub paper: Rect,
}

/// Position a paper of scaled `size` in `area`.
///
/// The paper keeps its unscaled layout box and scales about its center. A
/// recentered paper is centered in `area` horizontally; a vertical margin,
/// given as a percentage of the area width, grows or shrinks the layout box
/// at the top and bottom.
pub fn place(area: Rect, size: Vec2, transform: &PaperTransform) -> PaperPlacement {
    let scale = if transform.scale > 0.0 { transform.scale } else { 1.0 };
    let intrinsic = size / scale;
    let margin = transform
        .margin_y_percent
        .map_or(0.0, |percent| percent / 100.0 * area.width());

    let layout_height = (intrinsic.y + 2.0 * margin).max(0.0);
    let top = (margin + intrinsic.y * (1.0 - scale) / 2.0).max(0.0);
    let allocated_height = layout_height.max(top + size.y);

    let left = if transform.recenter {
        area.center().x - size.x / 2.0
    } else {
        area.left() + (intrinsic.x - size.x) / 2.0
    };

    PaperPlacement {
        allocated: Rect::from_min_size(area.min, vec2(area.width(), allocated_height)),
        paper: Rect::from_min_size(pos2(left, area.top() + top), size),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Widgets
// ─────────────────────────────────────────────────────────────────────────────

/// Paint the paper of a mounted root and record its layout width.
///
/// Nothing is painted for roots that are not mounted in the flow.
pub fn show_paper(ui: &mut egui::Ui, stage: &mut Stage, node: NodeId, tree: &PaperTree) {
    if !stage.placement(node).is_some_and(|p| p.is_in_flow()) {
        return;
    }

    let layout = PaperLayout::build(ui.ctx(), tree);
    let area = Rect::from_min_size(ui.cursor().min, vec2(ui.available_width(), 0.0));
    let placement = place(area, layout.size, &tree.transform);

    ui.allocate_rect(placement.allocated, egui::Sense::hover());
    layout.paint(ui.painter(), placement.paper.min);
    stage.record_width(node, layout.intrinsic_width());
}

/// Lay out an offscreen root without painting it and record its width.
pub fn measure_offscreen(ctx: &egui::Context, stage: &mut Stage, node: NodeId, tree: &PaperTree) {
    if !stage.is_mounted(node) {
        return;
    }
    let layout = PaperLayout::build(ctx, tree);
    debug!(
        "Laid out offscreen {} at {:.0}x{:.0}",
        node,
        layout.intrinsic_width(),
        layout.intrinsic_height()
    );
    stage.record_width(node, layout.intrinsic_width());
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
