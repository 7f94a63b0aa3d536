//! Physical paper sizes shared by the preview and the print renderer.
//!
//! The PDF service renders at 1:1 scale, so the millimetre sizes declared here
//! are exactly the page boxes it produces.

use serde::{Deserialize, Serialize};

/// CSS reference pixels per millimetre (96 px per inch).
const PX_PER_MM: f32 = 96.0 / 25.4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

impl PageFormat {
    pub fn width_mm(&self) -> u32 {
        match self {
            PageFormat::A4 => 210,
            PageFormat::Letter => 216,
        }
    }

    pub fn height_mm(&self) -> u32 {
        match self {
            PageFormat::A4 => 297,
            PageFormat::Letter => 279,
        }
    }

    /// Value for the CSS `@page { size: ... }` rule.
    pub fn css_size(&self) -> String {
        format!("{}mm {}mm", self.width_mm(), self.height_mm())
    }

    pub fn label(&self) -> &'static str {
        match self {
            PageFormat::A4 => "A4",
            PageFormat::Letter => "Letter",
        }
    }
}

/// Page box geometry in CSS pixels, used by the preview to size page containers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_px: f32,
    pub height_px: f32,
    pub margin_px: f32,
}

/// Uniform page margin used by both renderers.
pub const PAGE_MARGIN_MM: f32 = 14.0;

impl PageGeometry {
    pub fn for_format(format: PageFormat) -> Self {
        Self {
            width_px: format.width_mm() as f32 * PX_PER_MM,
            height_px: format.height_mm() as f32 * PX_PER_MM,
            margin_px: PAGE_MARGIN_MM * PX_PER_MM,
        }
    }

    /// Height available to content inside the margins.
    pub fn printable_height_px(&self) -> f32 {
        (self.height_px - 2.0 * self.margin_px).max(0.0)
    }
}
