//! Page geometry and watermark layout math
//!
//! Everything here works in PDF points (1/72 inch). The rotation and
//! centering math is shared between the overlay renderer and its tests.

/// Width/height of one page in points, read from that page's MediaBox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    /// A4 size in points (210mm x 297mm)
    pub fn a4() -> Self {
        Self {
            width: 595.276,
            height: 841.89,
        }
    }

    /// US Letter size in points (8.5" x 11")
    pub fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }
}

/// Watermark rotation angle in degrees
pub const ROTATION_DEGREES: f64 = 30.0;

/// Horizontal margin kept clear on each side, as a fraction of page width
pub const MARGIN_FRACTION: f64 = 0.10;

/// Font-size search bounds for the watermark text
pub const MAX_FONT_SIZE: f64 = 24.0;
pub const MIN_FONT_SIZE: f64 = 8.0;

/// Vertical positions of the repeated watermark rows, as fractions of
/// page height
pub const ROW_FRACTIONS: [f64; 4] = [0.2, 0.4, 0.6, 0.8];

/// Maximum text width allowed at a given font size on a page of the given
/// width.
///
/// The usable width excludes the side margins; the rotation factor accounts
/// for the extra horizontal span a rotated run of text occupies. The factor
/// depends on the font size itself, so the font-size search re-evaluates
/// this bound at every candidate size.
pub fn max_allowed_text_width(page_width: f64, font_size: f64) -> f64 {
    let rotation_rad = ROTATION_DEGREES.to_radians();
    let usable_width = page_width * (1.0 - 2.0 * MARGIN_FRACTION);
    let rotation_width_factor =
        rotation_rad.cos().abs() + rotation_rad.sin().abs() * (font_size / page_width);
    usable_width / rotation_width_factor
}

/// Rotate the half-extent vector of an axis-aligned text run by the
/// watermark angle.
///
/// The result is the offset from the translation origin to the visual
/// center of the rotated text; subtracting it from the desired center gives
/// the translation to apply before rotating.
pub fn rotated_center_offset(text_width: f64, text_height: f64) -> (f64, f64) {
    let rotation_rad = ROTATION_DEGREES.to_radians();
    let half_w = text_width / 2.0;
    let half_h = text_height / 2.0;
    let offset_x = half_w * rotation_rad.cos() - half_h * rotation_rad.sin();
    let offset_y = half_w * rotation_rad.sin() + half_h * rotation_rad.cos();
    (offset_x, offset_y)
}
