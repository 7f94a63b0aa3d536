//! CSS custom properties derived from display settings.

use crate::layout::page_format::{PageFormat, PAGE_MARGIN_MM};
use crate::models::cv::FontFamily;

pub fn font_stack(font: FontFamily) -> &'static str {
    match font {
        FontFamily::Inter => "'Inter', 'Helvetica Neue', Arial, sans-serif",
        FontFamily::Lato => "'Lato', 'Helvetica Neue', Arial, sans-serif",
        FontFamily::Roboto => "'Roboto', 'Helvetica Neue', Arial, sans-serif",
        FontFamily::Merriweather => "'Merriweather', Georgia, serif",
        FontFamily::EbGaramond => "'EB Garamond', Garamond, Georgia, serif",
    }
}

/// Black or white, whichever reads better on top of `accent`.
///
/// Falls back to white for anything that is not `#rrggbb`.
pub fn contrast_color(accent: &str) -> &'static str {
    let channel = |range: std::ops::Range<usize>| {
        accent
            .get(range)
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
    };
    match (channel(1..3), channel(3..5), channel(5..7)) {
        (Some(r), Some(g), Some(b)) if accent.len() == 7 => {
            // ITU-R BT.601 luma
            let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
            if luma > 150.0 {
                "#111111"
            } else {
                "#ffffff"
            }
        }
        _ => "#ffffff",
    }
}

/// `:root` block with every theme variable the stylesheet reads.
pub fn root_variables(accent: &str, font: FontFamily, format: PageFormat) -> String {
    format!(
        ":root {{\n  --accent: {accent};\n  --accent-contrast: {contrast};\n  --font-family: {font};\n  --page-width: {width}mm;\n  --page-height: {height}mm;\n  --page-margin: {margin}mm;\n}}\n",
        contrast = contrast_color(accent),
        font = font_stack(font),
        width = format.width_mm(),
        height = format.height_mm(),
        margin = PAGE_MARGIN_MM,
    )
}
