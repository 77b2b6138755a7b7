//! Paper and window colors
//!
//! The paper palette is chosen by the gram's color scheme and is shared by
//! the on-screen painter and the export rasterizer, so it is expressed with
//! egui's `Color32` and converted to RGBA bytes for the `image` crate.
//!
//! # Architecture
//!
//! - `PaperPalette` - colors for one color scheme
//! - `chrome_visuals` - egui visuals for the window around the paper

use crate::gram::ColorScheme;
use eframe::egui::{self, Color32, Rounding, Stroke, Visuals};

// ─────────────────────────────────────────────────────────────────────────────
// Paper Palette
// ─────────────────────────────────────────────────────────────────────────────

/// Colors of the paper for one color scheme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperPalette {
    /// Paper fill
    pub background: Color32,
    /// Body text
    pub text: Color32,
    /// Header and footer text
    pub muted: Color32,
    pub link: Color32,
    /// Inline code and code block text
    pub code: Color32,
    /// Code block and inline code fill
    pub code_background: Color32,
    /// Quote bar and horizontal rules
    pub rule: Color32,
}

impl PaperPalette {
    pub fn for_scheme(scheme: ColorScheme) -> Self {
        match scheme {
            ColorScheme::Light => Self::light(),
            ColorScheme::Dark => Self::dark(),
        }
    }

    pub fn light() -> Self {
        Self {
            background: Color32::from_rgb(253, 252, 250),
            text: Color32::from_rgb(34, 34, 34),
            muted: Color32::from_rgb(120, 120, 120),
            link: Color32::from_rgb(40, 96, 170),
            code: Color32::from_rgb(70, 70, 70),
            code_background: Color32::from_rgb(238, 236, 232),
            rule: Color32::from_rgb(210, 208, 204),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: Color32::from_rgb(28, 28, 30),
            text: Color32::from_rgb(232, 230, 226),
            muted: Color32::from_rgb(150, 150, 150),
            link: Color32::from_rgb(120, 176, 240),
            code: Color32::from_rgb(210, 206, 170),
            code_background: Color32::from_rgb(44, 44, 48),
            rule: Color32::from_rgb(70, 70, 74),
        }
    }

    /// Whether the paper is dark (used to pick the canvas around it).
    pub fn is_dark(&self) -> bool {
        self.background.r() < 128
    }
}

/// RGBA bytes of an opaque color, for the rasterizer.
pub fn rgba(color: Color32) -> [u8; 4] {
    [color.r(), color.g(), color.b(), color.a()]
}

// ─────────────────────────────────────────────────────────────────────────────
// Window Chrome
// ─────────────────────────────────────────────────────────────────────────────

/// Visuals for the window around the paper: a light, low contrast frame so
/// the paper stands out in both schemes.
pub fn chrome_visuals() -> Visuals {
    let mut visuals = Visuals::light();

    visuals.panel_fill = Color32::from_rgb(244, 243, 240);
    visuals.window_fill = Color32::from_rgb(250, 250, 248);
    visuals.extreme_bg_color = Color32::WHITE;
    visuals.faint_bg_color = Color32::from_rgb(236, 235, 232);
    visuals.hyperlink_color = PaperPalette::light().link;

    visuals.selection.bg_fill = Color32::from_rgb(210, 226, 246);
    visuals.selection.stroke = Stroke::new(1.0, Color32::from_rgb(40, 96, 170));

    visuals.widgets.inactive.rounding = Rounding::same(4.0);
    visuals.widgets.hovered.rounding = Rounding::same(4.0);
    visuals.widgets.active.rounding = Rounding::same(4.0);
    visuals.window_rounding = Rounding::same(6.0);

    visuals
}

/// Apply the chrome visuals to a context.
pub fn apply(ctx: &egui::Context) {
    ctx.set_visuals(chrome_visuals());
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
