//! Body text transform for Typogram
//!
//! The body of a gram is typed as lightweight markup and stored alongside its
//! rendered form. This module defines the rendered representation and the
//! `TextTransform` seam that produces it.
//!
//! # Architecture
//!
//! - `mod.rs` - `RenderedBody` block/span model and the `TextTransform` trait
//! - `parser.rs` - comrak-backed markdown transform used by the application

mod parser;

pub use parser::MarkdownTransform;

// ─────────────────────────────────────────────────────────────────────────────
// Rendered Body Model
// ─────────────────────────────────────────────────────────────────────────────

/// Inline styling flags for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub code: bool,
    pub strikethrough: bool,
    pub link: bool,
}

/// A run of text sharing one style.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SpanStyle::default(),
        }
    }

    pub fn styled(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// A forced line break inside a block.
    pub fn line_break() -> Self {
        Self::plain("\n")
    }

    pub fn is_line_break(&self) -> bool {
        self.text == "\n"
    }
}

/// Kind of a block-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    /// Heading level 1-6
    Heading(u8),
    Quote,
    /// List item carrying its marker ("•", "1.", ...)
    ListItem { marker: String, depth: u8 },
    Code,
    Rule,
}

/// A block-level element made of inline spans.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
}

impl Block {
    pub fn new(kind: BlockKind, spans: Vec<Span>) -> Self {
        Self { kind, spans }
    }

    /// Plain text of the block with line breaks preserved.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Rendered form of the gram body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedBody {
    pub blocks: Vec<Block>,
}

impl RenderedBody {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Plain text of every block, one block per line.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transform Seam
// ─────────────────────────────────────────────────────────────────────────────

/// Converts raw body text into its rendered form.
///
/// Implementations must be pure: the same input always yields the same body.
pub trait TextTransform {
    fn transform(&self, raw: &str) -> RenderedBody;
}

impl<F> TextTransform for F
where
    F: Fn(&str) -> RenderedBody,
{
    fn transform(&self, raw: &str) -> RenderedBody {
        self(raw)
    }
}

/// Transform that keeps every non-empty line as its own plain paragraph.
#[cfg(test)]
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTransform;

#[cfg(test)]
impl TextTransform for PlainTransform {
    fn transform(&self, raw: &str) -> RenderedBody {
        RenderedBody::new(
            raw.lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| Block::new(BlockKind::Paragraph, vec![Span::plain(line)]))
                .collect(),
        )
    }
}
