//! Watermark overlay rendering
//!
//! Builds a one-page PDF containing the watermark text repeated down the
//! page, rotated 30 degrees and auto-scaled to fit the page width. The
//! overlay page's MediaBox equals the target page exactly, so the
//! compositor can merge it onto the source page coordinate-for-coordinate.

use lopdf::{Dictionary, Document, Object, Stream};

use crate::error::Result;
use crate::font::{escape_pdf_string, BuiltinFont};
use crate::layout::{
    max_allowed_text_width, rotated_center_offset, PageGeometry, MAX_FONT_SIZE, MIN_FONT_SIZE,
    ROTATION_DEGREES, ROW_FRACTIONS,
};

const WATERMARK_FONT: BuiltinFont = BuiltinFont::HelveticaBold;

/// A layout adjustment the renderer had to make to fit the text
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayDiagnostic {
    /// Font size was reduced below the 24pt default
    FontSizeReduced { font_size: f64 },
    /// Text still overflowed at the minimum size and was truncated
    TextTruncated { rendered: String },
}

/// One rendered overlay page plus any adjustment warnings
///
/// Diagnostics are a return channel rather than log calls so the caller
/// decides how to surface them; they are populated at most once per
/// renderer instance.
pub struct OverlayPage {
    pub document: Document,
    pub diagnostics: Vec<OverlayDiagnostic>,
}

/// Renders watermark overlays for one watermark text at one opacity
///
/// Holds the once-per-instance adjustment flag: the first render that has
/// to shrink or truncate the text reports it, later renders stay quiet.
pub struct OverlayRenderer {
    text: String,
    opacity: f64,
    adjustment_logged: bool,
}

impl OverlayRenderer {
    pub fn new(text: impl Into<String>, opacity: f64) -> Self {
        Self {
            text: text.into(),
            opacity: opacity.clamp(0.0, 1.0),
            adjustment_logged: false,
        }
    }

    /// Find the font size (and possibly truncated text) that fits the page.
    ///
    /// Shrinks from 24pt in 1pt steps, re-evaluating the width bound at
    /// each candidate size since the bound itself depends on the font size.
    /// If 8pt still overflows, drops 3 characters at a time from the
    /// original text and appends an ellipsis until the result fits or
    /// would drop below 10 characters.
    fn fit_text(&self, page_width: f64) -> (String, f64, Vec<OverlayDiagnostic>) {
        let mut diagnostics = Vec::new();
        let mut font_size = MAX_FONT_SIZE;
        let mut text_width = WATERMARK_FONT.text_width(&self.text, font_size);

        while text_width > max_allowed_text_width(page_width, font_size)
            && font_size > MIN_FONT_SIZE
        {
            font_size -= 1.0;
            text_width = WATERMARK_FONT.text_width(&self.text, font_size);
        }

        if font_size < MAX_FONT_SIZE {
            diagnostics.push(OverlayDiagnostic::FontSizeReduced { font_size });
        }

        let max_allowed = max_allowed_text_width(page_width, font_size);
        let mut rendered = self.text.clone();

        if text_width > max_allowed {
            let mut stem: Vec<char> = self.text.chars().collect();
            while text_width > max_allowed && stem.len() > 10 {
                stem.truncate(stem.len().saturating_sub(3));
                rendered = stem.iter().collect::<String>() + "...";
                text_width = WATERMARK_FONT.text_width(&rendered, font_size);
            }
            diagnostics.push(OverlayDiagnostic::TextTruncated {
                rendered: rendered.clone(),
            });
        }

        (rendered, font_size, diagnostics)
    }

    /// Render a transparent overlay page of exactly the given dimensions
    pub fn render(&mut self, geometry: PageGeometry) -> Result<OverlayPage> {
        let (text, font_size, diagnostics) = self.fit_text(geometry.width);

        let content = self.overlay_content(&text, font_size, geometry);
        let document = build_overlay_document(geometry, content, self.opacity);

        // Report adjustments only on the first render that makes any
        let diagnostics = if !diagnostics.is_empty() && !self.adjustment_logged {
            self.adjustment_logged = true;
            diagnostics
        } else {
            Vec::new()
        };

        Ok(OverlayPage {
            document,
            diagnostics,
        })
    }

    /// Generate the content stream: one rotated text run per row fraction
    fn overlay_content(&self, text: &str, font_size: f64, geometry: PageGeometry) -> String {
        let rotation_rad = ROTATION_DEGREES.to_radians();
        let (cos, sin) = (rotation_rad.cos(), rotation_rad.sin());

        let text_width = WATERMARK_FONT.text_width(text, font_size);
        let (offset_x, offset_y) = rotated_center_offset(text_width, font_size);

        // The horizontal translation centers the rotated run on the page
        // and is shared by every row
        let translate_x = geometry.width / 2.0 - offset_x;

        let mut content = String::new();
        for fraction in ROW_FRACTIONS {
            let translate_y = geometry.height * fraction - offset_y;
            content.push_str("q\n/GS0 gs\n1 0 0 rg\n");
            content.push_str(&format!(
                "{:.4} {:.4} {:.4} {:.4} {:.4} {:.4} cm\n",
                cos, sin, -sin, cos, translate_x, translate_y
            ));
            content.push_str(&format!("BT\n/F1 {} Tf\n0 0 Td\n", font_size));
            content.push_str(&format!("({}) Tj\nET\nQ\n", escape_pdf_string(text)));
        }
        content
    }
}

/// Wrap a content stream into a complete one-page document
fn build_overlay_document(geometry: PageGeometry, content: String, opacity: f64) -> Document {
    let mut doc = Document::with_version("1.5");

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set(
        "BaseFont",
        Object::Name(WATERMARK_FONT.base_name().as_bytes().to_vec()),
    );
    let font_id = doc.add_object(Object::Dictionary(font));

    let mut gstate = Dictionary::new();
    gstate.set("Type", Object::Name(b"ExtGState".to_vec()));
    gstate.set("ca", Object::Real(opacity as f32));
    gstate.set("CA", Object::Real(opacity as f32));
    let gstate_id = doc.add_object(Object::Dictionary(gstate));

    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    let mut gstates = Dictionary::new();
    gstates.set("GS0", Object::Reference(gstate_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    resources.set("ExtGState", Object::Dictionary(gstates));

    let pages_id = doc.new_object_id();

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(geometry.width as f32),
            Object::Real(geometry.height as f32),
        ]),
    );
    page.set("Contents", Object::Reference(content_id));
    page.set("Resources", Object::Dictionary(resources));
    let page_id = doc.add_object(Object::Dictionary(page));

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(1));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));

    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}
