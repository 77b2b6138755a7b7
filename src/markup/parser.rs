//! Markdown body transform using comrak
//!
//! This module wraps comrak's parser and flattens its AST into the
//! block/span model the paper painter and the rasterizer understand.

use comrak::{
    nodes::{AstNode, ListDelimType, ListType, NodeValue},
    parse_document, Arena, Options,
};

use super::{Block, BlockKind, RenderedBody, Span, SpanStyle, TextTransform};

// ─────────────────────────────────────────────────────────────────────────────
// Transform
// ─────────────────────────────────────────────────────────────────────────────

/// CommonMark transform with strikethrough and autolinks enabled.
///
/// Raw HTML is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownTransform;

impl MarkdownTransform {
    pub fn new() -> Self {
        Self
    }

    fn comrak_options() -> Options {
        let mut options = Options::default();
        options.extension.strikethrough = true;
        options.extension.autolink = true;
        options
    }
}

impl TextTransform for MarkdownTransform {
    fn transform(&self, raw: &str) -> RenderedBody {
        let arena = Arena::new();
        let root = parse_document(&arena, raw, &Self::comrak_options());

        let mut walker = Walker {
            blocks: Vec::new(),
            lists: Vec::new(),
            pending_marker: None,
            quote_depth: 0,
        };
        walker.visit_children(root);

        RenderedBody::new(walker.blocks)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AST Walking
// ─────────────────────────────────────────────────────────────────────────────

struct ListState {
    ordered: bool,
    next: usize,
    delimiter: char,
}

struct Walker {
    blocks: Vec<Block>,
    lists: Vec<ListState>,
    /// Marker waiting for the first paragraph of the current list item
    pending_marker: Option<String>,
    quote_depth: usize,
}

impl Walker {
    fn visit_children<'a>(&mut self, node: &'a AstNode<'a>) {
        for child in node.children() {
            self.visit_block(child);
        }
    }

    fn visit_block<'a>(&mut self, node: &'a AstNode<'a>) {
        let value = node.data.borrow().value.clone();
        match value {
            NodeValue::Paragraph => {
                let spans = self.inline_spans(node);
                let kind = self.paragraph_kind();
                self.push(kind, spans);
            }
            NodeValue::Heading(heading) => {
                let spans = self.inline_spans(node);
                self.push(BlockKind::Heading(heading.level.clamp(1, 6)), spans);
            }
            NodeValue::BlockQuote => {
                self.quote_depth += 1;
                self.visit_children(node);
                self.quote_depth -= 1;
            }
            NodeValue::List(list) => {
                self.lists.push(ListState {
                    ordered: matches!(list.list_type, ListType::Ordered),
                    next: list.start,
                    delimiter: if matches!(list.delimiter, ListDelimType::Paren) {
                        ')'
                    } else {
                        '.'
                    },
                });
                self.visit_children(node);
                self.lists.pop();
            }
            NodeValue::Item(_) => {
                let marker = match self.lists.last_mut() {
                    Some(list) if list.ordered => {
                        let marker = format!("{}{}", list.next, list.delimiter);
                        list.next += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                self.pending_marker = Some(marker);
                self.visit_children(node);
                // An item without a paragraph still shows its marker
                if let Some(marker) = self.pending_marker.take() {
                    let depth = self.list_depth();
                    self.push(BlockKind::ListItem { marker, depth }, Vec::new());
                }
            }
            NodeValue::CodeBlock(code) => {
                let literal = code.literal.trim_end_matches('\n');
                let style = SpanStyle {
                    code: true,
                    ..SpanStyle::default()
                };
                let mut spans = Vec::new();
                for (i, line) in literal.split('\n').enumerate() {
                    if i > 0 {
                        spans.push(Span::line_break());
                    }
                    spans.push(Span::styled(line, style));
                }
                self.push(BlockKind::Code, spans);
            }
            NodeValue::HtmlBlock(_) => {}
            NodeValue::ThematicBreak => self.push(BlockKind::Rule, Vec::new()),
            _ => self.visit_children(node),
        }
    }

    fn list_depth(&self) -> u8 {
        self.lists.len().saturating_sub(1).min(u8::MAX as usize) as u8
    }

    fn paragraph_kind(&mut self) -> BlockKind {
        if !self.lists.is_empty() {
            let marker = self.pending_marker.take().unwrap_or_default();
            BlockKind::ListItem {
                marker,
                depth: self.list_depth(),
            }
        } else if self.quote_depth > 0 {
            BlockKind::Quote
        } else {
            BlockKind::Paragraph
        }
    }

    fn push(&mut self, kind: BlockKind, spans: Vec<Span>) {
        self.blocks.push(Block::new(kind, spans));
    }

    fn inline_spans<'a>(&self, node: &'a AstNode<'a>) -> Vec<Span> {
        let mut spans = Vec::new();
        self.collect_inlines(node, SpanStyle::default(), &mut spans);
        // Trailing breaks add nothing visible
        while spans.last().is_some_and(Span::is_line_break) {
            spans.pop();
        }
        spans
    }

    fn collect_inlines<'a>(&self, node: &'a AstNode<'a>, style: SpanStyle, out: &mut Vec<Span>) {
        for child in node.children() {
            let value = child.data.borrow().value.clone();
            match value {
                NodeValue::Text(text) => push_span(out, text, style),
                NodeValue::Code(code) => {
                    let style = SpanStyle { code: true, ..style };
                    push_span(out, code.literal, style);
                }
                NodeValue::SoftBreak => push_span(out, " ".to_string(), style),
                NodeValue::LineBreak => out.push(Span::line_break()),
                NodeValue::HtmlInline(_) => {}
                NodeValue::Emph => {
                    let style = SpanStyle {
                        emphasis: true,
                        ..style
                    };
                    self.collect_inlines(child, style, out);
                }
                NodeValue::Strong => {
                    let style = SpanStyle {
                        strong: true,
                        ..style
                    };
                    self.collect_inlines(child, style, out);
                }
                NodeValue::Strikethrough => {
                    let style = SpanStyle {
                        strikethrough: true,
                        ..style
                    };
                    self.collect_inlines(child, style, out);
                }
                NodeValue::Link(_) => {
                    let style = SpanStyle { link: true, ..style };
                    self.collect_inlines(child, style, out);
                }
                _ => self.collect_inlines(child, style, out),
            }
        }
    }
}

/// Append text, merging with the previous span when the style matches.
fn push_span(out: &mut Vec<Span>, text: String, style: SpanStyle) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = out.last_mut() {
        if last.style == style && !last.is_line_break() {
            last.text.push_str(&text);
            return;
        }
    }
    out.push(Span::styled(text, style));
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
