//! Built-in font metrics and text measurement
//!
//! The pipeline renders all of its own text (watermark overlays, title page,
//! TOC) with the standard Helvetica regular/bold pair, so nothing has to be
//! embedded. Width tables are the AFM advance widths in 1/1000 em for the
//! printable ASCII range; measurement with them is exact for the glyphs we
//! draw, which the overlay font-size search and the TOC dot leaders rely on.

/// One of the two standard faces the pipeline draws with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
}

impl BuiltinFont {
    /// The BaseFont name used in the PDF font dictionary
    pub fn base_name(&self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "Helvetica",
            BuiltinFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    fn widths(&self) -> &'static [u16; 95] {
        match self {
            BuiltinFont::Helvetica => &HELVETICA_WIDTHS,
            BuiltinFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Measure a string at the given font size, in points
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let widths = self.widths();
        let units: u32 = text
            .chars()
            .map(|c| {
                let code = c as u32;
                if (0x20..=0x7e).contains(&code) {
                    widths[(code - 0x20) as usize] as u32
                } else {
                    // Outside the table (accented letters etc): digit width
                    // is a reasonable stand-in for both faces
                    556
                }
            })
            .sum();
        units as f64 * font_size / 1000.0
    }
}

/// Escape special characters for a PDF literal string
pub fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

/// Helvetica advance widths for characters 32..=126 (1/1000 em)
static HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // 58-64
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // 91-96
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // 123-126
];

/// Helvetica-Bold advance widths for characters 32..=126 (1/1000 em)
static HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 32-47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    333, 333, 584, 584, 584, 611, 975, // 58-64
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    333, 278, 333, 584, 556, 333, // 91-96
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a-m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n-z
    389, 280, 389, 584, // 123-126
];
