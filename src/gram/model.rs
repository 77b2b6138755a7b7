//! The gram record: document content plus style choices
//!
//! A `Gram` is plain data. All mutation goes through `GramPatch`, which is
//! merged by the `Record` so the derived body can never fall behind its raw
//! text.

use crate::error::{Error, Result};
use crate::markup::{RenderedBody, TextTransform};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Style Choices
// ─────────────────────────────────────────────────────────────────────────────

/// A closed set of values selectable from the editor.
///
/// `key` is the stable string used by select controls and `GramPatch::parse`;
/// `label` is what the user sees.
pub trait Choice: Copy + PartialEq + Sized + 'static {
    /// Name of the gram field this choice belongs to.
    const FIELD: Field;

    fn all() -> &'static [Self];
    fn key(&self) -> &'static str;
    fn label(&self) -> &'static str;

    /// Look up a value by key.
    fn from_key(key: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|choice| choice.key() == key)
            .ok_or_else(|| Error::InvalidFieldValue {
                field: Self::FIELD.key(),
                value: key.to_string(),
            })
    }
}

/// Typeface family of the paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontFamily {
    #[default]
    Serif,
    Sans,
    Mono,
}

impl Choice for FontFamily {
    const FIELD: Field = Field::FontFamily;

    fn all() -> &'static [Self] {
        &[FontFamily::Serif, FontFamily::Sans, FontFamily::Mono]
    }

    fn key(&self) -> &'static str {
        match self {
            FontFamily::Serif => "serif",
            FontFamily::Sans => "sans",
            FontFamily::Mono => "mono",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FontFamily::Serif => "serif",
            FontFamily::Sans => "sans-serif",
            FontFamily::Mono => "monospace",
        }
    }
}

/// Horizontal alignment of every text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Fraction of the free space placed before a line (0 = left, 1 = right).
    pub fn factor(&self) -> f32 {
        match self {
            TextAlign::Left => 0.0,
            TextAlign::Center => 0.5,
            TextAlign::Right => 1.0,
        }
    }
}

impl Choice for TextAlign {
    const FIELD: Field = Field::TextAlign;

    fn all() -> &'static [Self] {
        &[TextAlign::Left, TextAlign::Center, TextAlign::Right]
    }

    fn key(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
        }
    }

    fn label(&self) -> &'static str {
        self.key()
    }
}

/// Paper color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl Choice for ColorScheme {
    const FIELD: Field = Field::ColorScheme;

    fn all() -> &'static [Self] {
        &[ColorScheme::Light, ColorScheme::Dark]
    }

    fn key(&self) -> &'static str {
        match self {
            ColorScheme::Light => "light",
            ColorScheme::Dark => "dark",
        }
    }

    fn label(&self) -> &'static str {
        self.key()
    }
}

/// Body text size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl Choice for FontSize {
    const FIELD: Field = Field::FontSize;

    fn all() -> &'static [Self] {
        &[FontSize::Small, FontSize::Medium, FontSize::Large]
    }

    fn key(&self) -> &'static str {
        match self {
            FontSize::Small => "small",
            FontSize::Medium => "medium",
            FontSize::Large => "large",
        }
    }

    fn label(&self) -> &'static str {
        self.key()
    }
}

macro_rules! impl_from_str_for_choice {
    ($($ty:ty),*) => {
        $(
            impl FromStr for $ty {
                type Err = Error;

                fn from_str(s: &str) -> Result<Self> {
                    <$ty as Choice>::from_key(s)
                }
            }
        )*
    };
}

impl_from_str_for_choice!(FontFamily, TextAlign, ColorScheme, FontSize);

// ─────────────────────────────────────────────────────────────────────────────
// Fields
// ─────────────────────────────────────────────────────────────────────────────

/// Names of the gram fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Header,
    Footer,
    BodyRaw,
    /// Derived from `BodyRaw`; readable, never written directly
    Body,
    FontFamily,
    TextAlign,
    ColorScheme,
    FontSize,
}

impl Field {
    #[cfg(test)]
    pub fn all() -> &'static [Field] {
        &[
            Field::Header,
            Field::Footer,
            Field::BodyRaw,
            Field::Body,
            Field::FontFamily,
            Field::TextAlign,
            Field::ColorScheme,
            Field::FontSize,
        ]
    }

    pub fn key(&self) -> &'static str {
        match self {
            Field::Header => "header",
            Field::Footer => "footer",
            Field::BodyRaw => "bodyRaw",
            Field::Body => "body",
            Field::FontFamily => "fontFamily",
            Field::TextAlign => "textAlign",
            Field::ColorScheme => "colorScheme",
            Field::FontSize => "fontSize",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// The value of a single field, as returned by `Record::get`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Body(RenderedBody),
    FontFamily(FontFamily),
    TextAlign(TextAlign),
    ColorScheme(ColorScheme),
    FontSize(FontSize),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gram
// ─────────────────────────────────────────────────────────────────────────────

/// Placeholder content shown on first launch.
pub const DEFAULT_HEADER: &str = "Typogram";
pub const DEFAULT_FOOTER: &str = "typogram.app";
pub const DEFAULT_BODY: &str = "Start writing...";

/// Snapshot of the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Gram {
    pub header: String,
    pub footer: String,
    pub body_raw: String,
    pub body: RenderedBody,
    pub font_family: FontFamily,
    pub text_align: TextAlign,
    pub color_scheme: ColorScheme,
    pub font_size: FontSize,
}

impl Gram {
    /// The startup document: placeholder text, serif, left, light, small.
    pub fn initial(transform: &dyn TextTransform) -> Self {
        Self {
            header: DEFAULT_HEADER.to_string(),
            footer: DEFAULT_FOOTER.to_string(),
            body_raw: DEFAULT_BODY.to_string(),
            body: transform.transform(DEFAULT_BODY),
            font_family: FontFamily::default(),
            text_align: TextAlign::default(),
            color_scheme: ColorScheme::default(),
            font_size: FontSize::default(),
        }
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Header => FieldValue::Text(self.header.clone()),
            Field::Footer => FieldValue::Text(self.footer.clone()),
            Field::BodyRaw => FieldValue::Text(self.body_raw.clone()),
            Field::Body => FieldValue::Body(self.body.clone()),
            Field::FontFamily => FieldValue::FontFamily(self.font_family),
            Field::TextAlign => FieldValue::TextAlign(self.text_align),
            Field::ColorScheme => FieldValue::ColorScheme(self.color_scheme),
            Field::FontSize => FieldValue::FontSize(self.font_size),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Patches
// ─────────────────────────────────────────────────────────────────────────────

/// A partial update. Unset fields are left untouched by a merge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GramPatch {
    pub header: Option<String>,
    pub footer: Option<String>,
    pub body_raw: Option<String>,
    pub font_family: Option<FontFamily>,
    pub text_align: Option<TextAlign>,
    pub color_scheme: Option<ColorScheme>,
    pub font_size: Option<FontSize>,
}

impl GramPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn body_raw(mut self, body_raw: impl Into<String>) -> Self {
        self.body_raw = Some(body_raw.into());
        self
    }

    pub fn font_family(mut self, font_family: FontFamily) -> Self {
        self.font_family = Some(font_family);
        self
    }

    pub fn text_align(mut self, text_align: TextAlign) -> Self {
        self.text_align = Some(text_align);
        self
    }

    pub fn color_scheme(mut self, color_scheme: ColorScheme) -> Self {
        self.color_scheme = Some(color_scheme);
        self
    }

    pub fn font_size(mut self, font_size: FontSize) -> Self {
        self.font_size = Some(font_size);
        self
    }

    /// Build a single-field patch from a string value.
    ///
    /// # Errors
    ///
    /// `Error::InvalidFieldValue` when the value is outside the field's set,
    /// or when the field is the derived `body`.
    pub fn parse(field: Field, value: &str) -> Result<Self> {
        let patch = Self::new();
        Ok(match field {
            Field::Header => patch.header(value),
            Field::Footer => patch.footer(value),
            Field::BodyRaw => patch.body_raw(value),
            Field::FontFamily => patch.font_family(value.parse()?),
            Field::TextAlign => patch.text_align(value.parse()?),
            Field::ColorScheme => patch.color_scheme(value.parse()?),
            Field::FontSize => patch.font_size(value.parse()?),
            Field::Body => {
                return Err(Error::InvalidFieldValue {
                    field: field.key(),
                    value: value.to_string(),
                })
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `gram`, re-deriving the body when the raw text is written.
    pub fn apply(self, gram: &mut Gram, transform: &dyn TextTransform) {
        if let Some(header) = self.header {
            gram.header = header;
        }
        if let Some(footer) = self.footer {
            gram.footer = footer;
        }
        if let Some(body_raw) = self.body_raw {
            gram.body = transform.transform(&body_raw);
            gram.body_raw = body_raw;
        }
        if let Some(font_family) = self.font_family {
            gram.font_family = font_family;
        }
        if let Some(text_align) = self.text_align {
            gram.text_align = text_align;
        }
        if let Some(color_scheme) = self.color_scheme {
            gram.color_scheme = color_scheme;
        }
        if let Some(font_size) = self.font_size {
            gram.font_size = font_size;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
