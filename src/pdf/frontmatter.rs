//! Title page and table-of-contents rendering
//!
//! Front matter is laid out top-down (layout space: y measured from the top
//! of the page, increasing downward) and converted to PDF text positions
//! with `pdf_y = page_height - cursor` at draw time. TOC link rectangles
//! are recorded in layout space and flipped later by the link-injection
//! pass, using the TOC page's actual height.
//!
//! The TOC line flow depends only on the sequence of group headers and
//! entry lines, never on the page numbers printed, so `count_toc_pages`
//! can compute the exact page count before any start page is assigned.

use lopdf::{Dictionary, Document, Object, Stream};

use crate::font::{escape_pdf_string, BuiltinFont};
use crate::layout::PageGeometry;
use crate::pdf::entries::DocumentEntry;

const SIDE_MARGIN: f64 = 72.0;
const TOP_MARGIN: f64 = 72.0;
const BOTTOM_MARGIN: f64 = 72.0;

const HEADING_TEXT: &str = "Table of Contents";
const HEADING_SIZE: f64 = 18.0;
const HEADING_HEIGHT: f64 = 40.0;

const GROUP_HEADER_SIZE: f64 = 13.0;
const GROUP_HEADER_HEIGHT: f64 = 28.0;

const ENTRY_SIZE: f64 = 11.0;
const ENTRY_HEIGHT: f64 = 18.0;

const TITLE_SIZE: f64 = 28.0;
const DATE_SIZE: f64 = 12.0;

/// Clickable region recorded while drawing one TOC entry
///
/// The rectangle is in layout space (top-down y); the link-injection pass
/// flips it into page-description space once the assembled page heights
/// are known. Consumed once, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct TocLinkRecord {
    /// x1, y_top, x2, y_bottom with y measured from the top of the page
    pub rect: [f64; 4],
    /// Absolute 1-based page the entry points at
    pub target_page: usize,
    /// 0-based index among the TOC pages this rect was drawn on
    pub toc_page: usize,
}

/// Top-down line flow with page breaks at the bottom margin
struct TocFlow {
    cursor: f64,
    page: usize,
    page_height: f64,
}

impl TocFlow {
    fn new(page_height: f64) -> Self {
        Self {
            // The first page starts below the heading
            cursor: TOP_MARGIN + HEADING_HEIGHT,
            page: 0,
            page_height,
        }
    }

    /// Claim a line of the given height; returns (page, top-down y of the
    /// line's top edge), breaking to a new page first if it would cross
    /// the bottom margin
    fn take_line(&mut self, height: f64) -> (usize, f64) {
        if self.cursor + height > self.page_height - BOTTOM_MARGIN {
            self.page += 1;
            self.cursor = TOP_MARGIN;
        }
        let top = self.cursor;
        self.cursor += height;
        (self.page, top)
    }
}

/// Exact number of TOC pages the renderer will produce for this group
/// sequence
pub fn count_toc_pages<'a>(groups: impl IntoIterator<Item = &'a str>) -> usize {
    let mut flow = TocFlow::new(PageGeometry::a4().height);
    let mut previous: Option<&str> = None;

    for group in groups {
        if previous != Some(group) {
            flow.take_line(GROUP_HEADER_HEIGHT);
            previous = Some(group);
        }
        flow.take_line(ENTRY_HEIGHT);
    }

    flow.page + 1
}

/// Render the one-page title sheet: centered title and generation date
pub fn render_title_page(title: &str, date_line: &str) -> Document {
    let geometry = PageGeometry::a4();
    let mut content = String::new();

    let title_width = BuiltinFont::HelveticaBold.text_width(title, TITLE_SIZE);
    let title_x = (geometry.width - title_width) / 2.0;
    let title_y = geometry.height * 0.55;
    content.push_str(&format!(
        "BT\n/F2 {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
        TITLE_SIZE,
        title_x,
        title_y,
        escape_pdf_string(title)
    ));

    let date_width = BuiltinFont::Helvetica.text_width(date_line, DATE_SIZE);
    let date_x = (geometry.width - date_width) / 2.0;
    let date_y = title_y - 36.0;
    content.push_str(&format!(
        "BT\n/F1 {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
        DATE_SIZE,
        date_x,
        date_y,
        escape_pdf_string(date_line)
    ));

    build_text_document(vec![content], geometry)
}

/// Render the TOC pages for the entry list.
///
/// Returns the rendered document, the link records to inject later, and
/// the number of pages produced. The page count always equals what
/// `count_toc_pages` predicts for the same entries.
pub fn render_toc(entries: &[DocumentEntry]) -> (Document, Vec<TocLinkRecord>, usize) {
    let geometry = PageGeometry::a4();
    let mut flow = TocFlow::new(geometry.height);
    let mut pages: Vec<String> = vec![heading_content(geometry)];
    let mut links = Vec::new();
    let mut previous_group: Option<&str> = None;

    for entry in entries {
        if previous_group != Some(entry.group.as_str()) {
            let (page, top) = flow.take_line(GROUP_HEADER_HEIGHT);
            grow_pages(&mut pages, page);
            let baseline = geometry.height - top - GROUP_HEADER_HEIGHT + 6.0;
            pages[page].push_str(&format!(
                "BT\n/F2 {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
                GROUP_HEADER_SIZE,
                SIDE_MARGIN,
                baseline,
                escape_pdf_string(&entry.group)
            ));
            previous_group = Some(entry.group.as_str());
        }

        let (page, top) = flow.take_line(ENTRY_HEIGHT);
        grow_pages(&mut pages, page);
        let baseline = geometry.height - top - ENTRY_HEIGHT + 5.0;

        let name_width = BuiltinFont::Helvetica.text_width(&entry.display_name, ENTRY_SIZE);
        let number_text = entry.start_page.to_string();
        let number_width = BuiltinFont::Helvetica.text_width(&number_text, ENTRY_SIZE);
        let number_x = geometry.width - SIDE_MARGIN - number_width;

        pages[page].push_str(&format!(
            "BT\n/F1 {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
            ENTRY_SIZE,
            SIDE_MARGIN,
            baseline,
            escape_pdf_string(&entry.display_name)
        ));

        // Dot leader between the end of the name and the page number
        let leader_start = SIDE_MARGIN + name_width + 4.0;
        let leader_end = number_x - 4.0;
        let dot_width = BuiltinFont::Helvetica.text_width(".", ENTRY_SIZE);
        if leader_end > leader_start + dot_width {
            let dots = ".".repeat(((leader_end - leader_start) / dot_width) as usize);
            pages[page].push_str(&format!(
                "BT\n/F1 {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
                ENTRY_SIZE, leader_start, baseline, dots
            ));
        }

        pages[page].push_str(&format!(
            "BT\n/F1 {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
            ENTRY_SIZE, number_x, baseline, number_text
        ));

        links.push(TocLinkRecord {
            rect: [SIDE_MARGIN, top, leader_end, top + ENTRY_HEIGHT],
            target_page: entry.start_page,
            toc_page: page,
        });
    }

    let page_count = pages.len();
    let document = build_text_document(pages, geometry);
    (document, links, page_count)
}

fn heading_content(geometry: PageGeometry) -> String {
    let width = BuiltinFont::HelveticaBold.text_width(HEADING_TEXT, HEADING_SIZE);
    let x = (geometry.width - width) / 2.0;
    let y = geometry.height - TOP_MARGIN;
    format!(
        "BT\n/F2 {} Tf\n1 0 0 1 {:.2} {:.2} Tm\n({}) Tj\nET\n",
        HEADING_SIZE, x, y, HEADING_TEXT
    )
}

fn grow_pages(pages: &mut Vec<String>, page: usize) {
    while pages.len() <= page {
        pages.push(String::new());
    }
}

/// Wrap per-page content streams into a complete document with the
/// Helvetica pair available as /F1 (regular) and /F2 (bold)
fn build_text_document(page_contents: Vec<String>, geometry: PageGeometry) -> Document {
    let mut doc = Document::with_version("1.5");

    let mut regular = Dictionary::new();
    regular.set("Type", Object::Name(b"Font".to_vec()));
    regular.set("Subtype", Object::Name(b"Type1".to_vec()));
    regular.set(
        "BaseFont",
        Object::Name(BuiltinFont::Helvetica.base_name().as_bytes().to_vec()),
    );
    let regular_id = doc.add_object(Object::Dictionary(regular));

    let mut bold = Dictionary::new();
    bold.set("Type", Object::Name(b"Font".to_vec()));
    bold.set("Subtype", Object::Name(b"Type1".to_vec()));
    bold.set(
        "BaseFont",
        Object::Name(BuiltinFont::HelveticaBold.base_name().as_bytes().to_vec()),
    );
    let bold_id = doc.add_object(Object::Dictionary(bold));

    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();

    for content in page_contents {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(regular_id));
        fonts.set("F2", Object::Reference(bold_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

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
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(kids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));

    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(group: &str, name: &str, start_page: usize) -> DocumentEntry {
        DocumentEntry {
            group: group.to_string(),
            display_name: name.to_string(),
            start_page,
            page_count: 1,
        }
    }

    #[test]
    fn test_title_page_is_single_page() {
        let doc = render_title_page("Dossier de Location", "Generated on August 26, 2026");
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_short_toc_fits_one_page() {
        let entries = vec![
            entry("Alice", "Payslip", 3),
            entry("Alice", "Id Card", 4),
            entry("Bob", "Tax Notice", 5),
        ];
        let (doc, links, page_count) = render_toc(&entries);
        assert_eq!(page_count, 1);
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(links.len(), 3);
        assert!(links.iter().all(|l| l.toc_page == 0));
    }

    #[test]
    fn test_toc_page_flow_matches_rendered_count() {
        // Enough entries to force several pages
        let mut entries = Vec::new();
        for group_index in 0..6 {
            let group = format!("Person{group_index}");
            for doc_index in 0..12 {
                entries.push(entry(&group, &format!("Document {doc_index}"), 3));
            }
        }
        let predicted = count_toc_pages(entries.iter().map(|e| e.group.as_str()));
        let (doc, links, page_count) = render_toc(&entries);

        assert!(page_count > 1);
        assert_eq!(predicted, page_count);
        assert_eq!(doc.get_pages().len(), page_count);
        assert_eq!(links.len(), entries.len());
        assert_eq!(
            links.iter().map(|l| l.toc_page).max().unwrap(),
            page_count - 1
        );
    }

    #[test]
    fn test_link_rects_are_top_down_layout_space() {
        let entries = vec![entry("Alice", "Payslip", 3)];
        let (_, links, _) = render_toc(&entries);
        let rect = links[0].rect;
        // y_top < y_bottom in top-down units, inside the page band
        assert!(rect[1] < rect[3]);
        assert!(rect[1] >= TOP_MARGIN);
        assert!(rect[0] < rect[2]);
    }

    #[test]
    fn test_group_header_drawn_once_per_group() {
        let entries = vec![
            entry("Alice", "One", 3),
            entry("Alice", "Two", 4),
            entry("Bob", "Three", 5),
        ];
        let predicted = count_toc_pages(entries.iter().map(|e| e.group.as_str()));
        assert_eq!(predicted, 1);
        // Two groups + heading: flow consumed 2 header lines and 3 entries
        let (_, links, _) = render_toc(&entries);
        // Entries below a header start lower than the header band
        assert!(links[0].rect[1] > TOP_MARGIN + HEADING_HEIGHT);
    }
}
