//! Software rasterizer
//!
//! Lays the paper out with the same `PaperMetrics` the preview uses, draws
//! glyph outlines with `ab_glyph` into an RGBA buffer, and encodes the
//! buffer as PNG. The fonts are egui's bundled defaults so an export uses
//! the same faces as the window.
//!
//! Bold is drawn as a second pass offset by a pixel; italic as a shear.

use super::raster::{EncodedImage, PendingRaster, RasterOptions, Rasterizer};
use crate::error::{Error, Result};
use crate::gram::FontFamily;
use crate::markup::{Block, BlockKind, Span};
use crate::theme::{rgba, PaperPalette};
use crate::view::{PaperMetrics, PaperTree};
use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use eframe::egui;
use image::{Rgba, RgbaImage};
use log::{debug, warn};
use std::io::Cursor;
use std::thread;

const PROPORTIONAL_FONT: &str = "Ubuntu-Light";
const MONOSPACE_FONT: &str = "Hack";

/// Horizontal shift per pixel above the baseline for emphasis.
const ITALIC_SHEAR: f32 = 0.2;

/// Largest image side accepted.
const MAX_DIMENSION: u32 = 16_384;

// ─────────────────────────────────────────────────────────────────────────────
// Fonts
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct FontSet {
    proportional: FontArc,
    monospace: FontArc,
}

impl FontSet {
    fn from_egui_defaults() -> Result<Self> {
        let definitions = egui::FontDefinitions::default();
        let load = |name: &str| -> Result<FontArc> {
            let data = definitions
                .font_data
                .get(name)
                .ok_or_else(|| Error::Rasterization {
                    message: format!("font '{}' is not bundled", name),
                })?;
            FontArc::try_from_vec(data.font.to_vec()).map_err(|e| Error::Rasterization {
                message: format!("font '{}': {}", name, e),
            })
        };
        Ok(Self {
            proportional: load(PROPORTIONAL_FONT)?,
            monospace: load(MONOSPACE_FONT)?,
        })
    }

    fn get(&self, mono: bool) -> &FontArc {
        if mono {
            &self.monospace
        } else {
            &self.proportional
        }
    }
}

/// Advance width of `text` at `size`.
fn measure(font: &FontArc, text: &str, size: f32) -> f32 {
    let scaled = font.as_scaled(PxScale::from(size));
    let mut width = 0.0;
    let mut prev = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            width += scaled.kern(prev, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

/// How a run of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ink {
    color: [u8; 4],
    mono: bool,
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    background: Option<[u8; 4]>,
}

impl Ink {
    fn plain(color: [u8; 4], mono: bool) -> Self {
        Self {
            color,
            mono,
            bold: false,
            italic: false,
            underline: false,
            strike: false,
            background: None,
        }
    }
}

/// A draw operation in paper points.
#[derive(Debug, Clone, PartialEq)]
enum Item {
    Text {
        x: f32,
        baseline: f32,
        size: f32,
        width: f32,
        text: String,
        ink: Ink,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: [u8; 4],
    },
}

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    ink: Ink,
    width: f32,
    space: bool,
}

enum Token {
    Piece(Piece),
    Break,
}

struct Layout<'a> {
    fonts: &'a FontSet,
    tree: &'a PaperTree,
    metrics: PaperMetrics,
    palette: PaperPalette,
    items: Vec<Item>,
    y: f32,
}

impl<'a> Layout<'a> {
    fn new(fonts: &'a FontSet, tree: &'a PaperTree) -> Self {
        let metrics = PaperMetrics::for_size(tree.font_size);
        Self {
            fonts,
            tree,
            metrics,
            palette: PaperPalette::for_scheme(tree.color_scheme),
            items: Vec::new(),
            y: metrics.padding,
        }
    }

    fn body_mono(&self) -> bool {
        self.tree.font_family == FontFamily::Mono
    }

    fn base_ink(&self) -> Ink {
        Ink::plain(rgba(self.palette.text), self.body_mono())
    }

    fn left(&self) -> f32 {
        self.metrics.padding
    }

    /// Lay out header, body and footer; returns the items and paper height.
    fn run(mut self) -> (Vec<Item>, f32) {
        let muted = Ink::plain(rgba(self.palette.muted), self.body_mono());

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
            self.block(block);
        }

        self.y += self.metrics.section_gap;
        if !self.tree.footer.is_empty() {
            let spans = [Span::plain(self.tree.footer.clone())];
            self.paragraph(&spans, self.metrics.footer_size, 0.0, muted);
        }

        let height = self.y + self.metrics.padding;
        (self.items, height)
    }

    fn block(&mut self, block: &Block) {
        let size = self.metrics.block_font_size(&block.kind);
        let indent = self.metrics.block_indent(&block.kind);
        let mut ink = self.base_ink();

        match &block.kind {
            BlockKind::Rule => {
                let y = self.y + self.metrics.block_gap / 2.0;
                self.items.push(Item::Rect {
                    x: self.left(),
                    y,
                    w: self.metrics.content_width(),
                    h: 1.0,
                    color: rgba(self.palette.rule),
                });
                self.y += self.metrics.block_gap;
            }
            BlockKind::Code => {
                let pad = size * 0.5;
                let background = self.items.len();
                let top = self.y;
                self.y += pad;
                ink.mono = true;
                ink.color = rgba(self.palette.code);
                self.paragraph(&block.spans, size, pad, ink);
                self.y += pad;
                self.items.insert(
                    background,
                    Item::Rect {
                        x: self.left(),
                        y: top,
                        w: self.metrics.content_width(),
                        h: self.y - top,
                        color: rgba(self.palette.code_background),
                    },
                );
            }
            BlockKind::Quote => {
                let top = self.y;
                ink.italic = true;
                self.paragraph(&block.spans, size, indent, ink);
                self.items.push(Item::Rect {
                    x: self.left() + indent * 0.3,
                    y: top,
                    w: 3.0,
                    h: self.y - top,
                    color: rgba(self.palette.rule),
                });
            }
            BlockKind::ListItem { marker, .. } => {
                let width = measure(self.fonts.get(ink.mono), marker, size);
                let baseline = self.baseline(self.y, size);
                self.items.push(Item::Text {
                    x: self.left() + indent - width - size * 0.4,
                    baseline,
                    size,
                    width,
                    text: marker.clone(),
                    ink,
                });
                self.paragraph(&block.spans, size, indent, ink);
            }
            BlockKind::Heading(_) => {
                ink.bold = true;
                self.paragraph(&block.spans, size, indent, ink);
            }
            BlockKind::Paragraph => self.paragraph(&block.spans, size, indent, ink),
        }
    }

    fn line_height(&self, size: f32) -> f32 {
        size * self.metrics.line_height
    }

    /// Baseline of a line whose box starts at `top`.
    fn baseline(&self, top: f32, size: f32) -> f32 {
        let scaled = self.fonts.proportional.as_scaled(PxScale::from(size));
        let text_height = scaled.ascent() - scaled.descent();
        top + (self.line_height(size) - text_height) / 2.0 + scaled.ascent()
    }

    fn span_ink(&self, span: &Span, base: Ink) -> Ink {
        let mut ink = base;
        ink.bold |= span.style.strong;
        ink.italic |= span.style.emphasis;
        ink.strike |= span.style.strikethrough;
        if span.style.code {
            ink.mono = true;
            ink.color = rgba(self.palette.code);
            ink.background = Some(rgba(self.palette.code_background));
        }
        if span.style.link {
            ink.underline = true;
            ink.color = rgba(self.palette.link);
        }
        ink
    }

    fn tokens(&self, spans: &[Span], size: f32, base: Ink) -> Vec<Token> {
        let mut tokens = Vec::new();
        for span in spans {
            if span.is_line_break() {
                tokens.push(Token::Break);
                continue;
            }
            let ink = self.span_ink(span, base);
            let font = self.fonts.get(ink.mono);

            let mut current = String::new();
            let mut current_space = false;
            for c in span.text.chars() {
                let space = c.is_whitespace();
                if !current.is_empty() && space != current_space {
                    let text = std::mem::take(&mut current);
                    tokens.push(Token::Piece(Piece {
                        width: measure(font, &text, size),
                        text,
                        ink,
                        space: current_space,
                    }));
                }
                current.push(if space { ' ' } else { c });
                current_space = space;
            }
            if !current.is_empty() {
                tokens.push(Token::Piece(Piece {
                    width: measure(font, &current, size),
                    text: current,
                    ink,
                    space: current_space,
                }));
            }
        }
        tokens
    }

    /// Word-wrap `spans` into the content box and emit their items.
    fn paragraph(&mut self, spans: &[Span], size: f32, indent: f32, base: Ink) {
        let available = self.metrics.content_width() - indent;
        let mut lines: Vec<Vec<Piece>> = vec![Vec::new()];
        let mut width = 0.0;

        for token in self.tokens(spans, size, base) {
            match token {
                Token::Break => {
                    lines.push(Vec::new());
                    width = 0.0;
                }
                Token::Piece(piece) => {
                    let line_empty = lines.last().map_or(true, |l| l.is_empty());
                    if piece.space && line_empty {
                        continue;
                    }
                    if !piece.space && !line_empty && width + piece.width > available {
                        lines.push(Vec::new());
                        width = 0.0;
                    }
                    width += piece.width;
                    if let Some(line) = lines.last_mut() {
                        line.push(piece);
                    }
                }
            }
        }

        let factor = self.tree.text_align.factor();
        let line_height = self.line_height(size);
        for mut line in lines {
            while line.last().map_or(false, |p| p.space) {
                line.pop();
            }
            let line_width: f32 = line.iter().map(|p| p.width).sum();
            let baseline = self.baseline(self.y, size);
            let mut x = self.left() + indent + (available - line_width).max(0.0) * factor;

            for piece in line {
                if let Some(color) = piece.ink.background {
                    self.items.push(Item::Rect {
                        x,
                        y: self.y + line_height * 0.1,
                        w: piece.width,
                        h: line_height * 0.8,
                        color,
                    });
                }
                let next = x + piece.width;
                if !piece.space || piece.ink.underline || piece.ink.strike {
                    self.items.push(Item::Text {
                        x,
                        baseline,
                        size,
                        width: piece.width,
                        text: piece.text,
                        ink: piece.ink,
                    });
                }
                x = next;
            }
            self.y += line_height;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Painting
// ─────────────────────────────────────────────────────────────────────────────

fn blend(canvas: &mut RgbaImage, x: i32, y: i32, color: [u8; 4], coverage: f32) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32) / 255.0;
    let pixel = canvas.get_pixel_mut(x as u32, y as u32);
    for channel in 0..3 {
        let under = pixel.0[channel] as f32;
        pixel.0[channel] = (under + (color[channel] as f32 - under) * alpha).round() as u8;
    }
    pixel.0[3] = 255;
}

fn fill_rect(canvas: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, color: [u8; 4]) {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let x1 = (x + w).ceil().max(x0 as f32 + 1.0) as i32;
    let y1 = (y + h).ceil().max(y0 as f32 + 1.0) as i32;
    for py in y0..y1 {
        for px in x0..x1 {
            blend(canvas, px, py, color, 1.0);
        }
    }
}

fn draw_text(canvas: &mut RgbaImage, font: &FontArc, item: &Item, ratio: f32) {
    let Item::Text {
        x,
        baseline,
        size,
        width,
        text,
        ink,
    } = item
    else {
        return;
    };

    let px = PxScale::from(size * ratio);
    let scaled = font.as_scaled(px);
    let base = baseline * ratio;
    let bold_offset = (size * ratio / 28.0).max(1.0);
    let passes = if ink.bold { 2 } else { 1 };

    let mut caret = x * ratio;
    let mut prev = None;
    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(px, point(caret, base));
        caret += scaled.h_advance(id);
        prev = Some(id);

        let Some(outlined) = font.outline_glyph(glyph) else {
            continue;
        };
        let bounds = outlined.px_bounds();
        outlined.draw(|gx, gy, coverage| {
            let py = bounds.min.y + gy as f32;
            let shear = if ink.italic {
                (base - py) * ITALIC_SHEAR
            } else {
                0.0
            };
            let px = bounds.min.x + gx as f32 + shear;
            for pass in 0..passes {
                let dx = pass as f32 * bold_offset;
                blend(canvas, (px + dx) as i32, py as i32, ink.color, coverage);
            }
        });
    }

    let thickness = (size / 16.0).max(1.0);
    if ink.underline {
        let y = baseline + size * 0.12;
        fill_rect_points(canvas, *x, y, *width, thickness, ink.color, ratio);
    }
    if ink.strike {
        let y = baseline - size * 0.3;
        fill_rect_points(canvas, *x, y, *width, thickness, ink.color, ratio);
    }
}

fn fill_rect_points(
    canvas: &mut RgbaImage,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    color: [u8; 4],
    ratio: f32,
) {
    fill_rect(canvas, x * ratio, y * ratio, w * ratio, h * ratio, color);
}

fn dimension(points: f32, ratio: f32) -> u32 {
    ((points * ratio).ceil() as u32).clamp(1, MAX_DIMENSION)
}

/// The largest pixel ratio up to `requested` at which a paper of
/// `width` x `height` points stays within `MAX_DIMENSION` on both sides.
fn fit_ratio(width: f32, height: f32, requested: f32) -> f32 {
    let longest = width.max(height);
    if longest <= 0.0 {
        return requested;
    }
    requested.min(MAX_DIMENSION as f32 / longest)
}

// ─────────────────────────────────────────────────────────────────────────────
// Rasterizer
// ─────────────────────────────────────────────────────────────────────────────

/// Renders paper trees into PNGs on a worker thread.
#[derive(Clone)]
pub struct SoftwareRasterizer {
    fonts: FontSet,
}

impl SoftwareRasterizer {
    /// Load the bundled fonts.
    ///
    /// # Errors
    ///
    /// `Error::Rasterization` if a bundled font is missing or unreadable.
    pub fn new() -> Result<Self> {
        Ok(Self {
            fonts: FontSet::from_egui_defaults()?,
        })
    }

    /// Render synchronously on the calling thread.
    ///
    /// The tree is rendered as laid out at scale 1, whatever its transform.
    #[cfg(test)]
    pub fn render(&self, tree: &PaperTree, options: RasterOptions) -> Result<EncodedImage> {
        render(&self.fonts, tree, options)
    }
}

fn render(fonts: &FontSet, tree: &PaperTree, options: RasterOptions) -> Result<EncodedImage> {
    if !options.pixel_ratio.is_finite() || options.pixel_ratio <= 0.0 {
        return Err(Error::Rasterization {
            message: format!("invalid pixel ratio {}", options.pixel_ratio),
        });
    }
    let metrics = PaperMetrics::for_size(tree.font_size);
    let palette = PaperPalette::for_scheme(tree.color_scheme);

    let (items, height) = Layout::new(fonts, tree).run();
    let ratio = fit_ratio(metrics.width, height, options.pixel_ratio);
    if ratio < options.pixel_ratio {
        warn!(
            "Paper is {:.0} points tall, exporting at {:.2}x instead of {:.2}x",
            height, ratio, options.pixel_ratio
        );
    }
    let width = dimension(metrics.width, ratio);
    let height = dimension(height, ratio);
    debug!(
        "Rasterizing {} ({}x{} px, {} items, scroll {})",
        tree.class_name(),
        width,
        height,
        items.len(),
        options.scroll_y
    );

    let mut canvas = RgbaImage::from_pixel(width, height, Rgba(rgba(palette.background)));
    for item in &items {
        match item {
            Item::Rect { x, y, w, h, color } => {
                fill_rect_points(&mut canvas, *x, *y, *w, *h, *color, ratio)
            }
            Item::Text { ink, .. } => draw_text(&mut canvas, fonts.get(ink.mono), item, ratio),
        }
    }

    let mut bytes = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(EncodedImage {
        bytes,
        width,
        height,
    })
}

impl Rasterizer for SoftwareRasterizer {
    fn rasterize(&self, tree: &PaperTree, options: RasterOptions) -> PendingRaster {
        let (tx, pending) = PendingRaster::channel();
        let fonts = self.fonts.clone();
        let tree = tree.clone();

        let spawned = thread::Builder::new()
            .name("typogram-raster".to_string())
            .spawn(move || {
                // The receiver is gone only if the export was abandoned
                let _ = tx.send(render(&fonts, &tree, options));
            });

        match spawned {
            Ok(_) => pending,
            Err(e) => PendingRaster::ready(Err(Error::Rasterization {
                message: format!("could not start worker: {}", e),
            })),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
