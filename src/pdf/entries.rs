//! Document metadata for the combined dossier
//!
//! Turns the ordered list of watermarked documents into the entry list the
//! TOC, link and bookmark passes all share: one entry per document with its
//! group, display name and the absolute 1-based page it will start on in
//! the final output.

/// One source document's slot in the combined output
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEntry {
    /// Folder-derived group label (e.g. one person's documents)
    pub group: String,
    /// Human-readable name shown in the TOC and bookmarks
    pub display_name: String,
    /// Absolute 1-based page where this document starts in the output
    pub start_page: usize,
    /// Number of pages this document contributes
    pub page_count: usize,
}

/// A watermarked document waiting to be assembled, identified by the
/// intermediate naming convention `<group>_<stem>_watermarked.pdf`
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub watermarked_name: String,
    pub page_count: usize,
}

/// Split a watermarked file name into (group, display name).
///
/// `Alice_payslip-june_watermarked.pdf` → `("Alice", "Payslip")`:
/// strip the extension and the `_watermarked` suffix, take the group from
/// before the first underscore, cut the remainder at the first `-`, then
/// title-case with underscores as spaces.
pub fn derive_entry_name(file_name: &str) -> (String, String) {
    let stem = strip_suffix_ignore_case(file_name, ".pdf");
    let stem = stem.strip_suffix("_watermarked").unwrap_or(stem);

    let (group, rest) = match stem.split_once('_') {
        Some((group, rest)) => (group, rest),
        None => (stem, stem),
    };

    let rest = rest.split_once('-').map_or(rest, |(head, _)| head);
    let display = title_case(&rest.replace('_', " "));

    (group.to_string(), display)
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> &'a str {
    if name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        &name[..name.len() - suffix.len()]
    } else {
        name
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Assign absolute start pages to the ordered document list.
///
/// The counter is seeded past the front matter: page 1 is the title page,
/// pages 2..=1+toc_page_count are the TOC, so the first document starts at
/// `2 + toc_page_count`. The TOC page count here must be the exact count
/// the renderer will produce; the layout pre-pass in the frontmatter module
/// provides it before any page number is resolved.
pub fn build_entries(documents: &[SourceDocument], toc_page_count: usize) -> Vec<DocumentEntry> {
    let mut next_page = 2 + toc_page_count;
    documents
        .iter()
        .map(|doc| {
            let (group, display_name) = derive_entry_name(&doc.watermarked_name);
            let entry = DocumentEntry {
                group,
                display_name,
                start_page: next_page,
                page_count: doc.page_count,
            };
            next_page += doc.page_count;
            entry
        })
        .collect()
}

/// Total page count of the assembled output
pub fn total_pages(entries: &[DocumentEntry], toc_page_count: usize) -> usize {
    1 + toc_page_count + entries.iter().map(|e| e.page_count).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, pages: usize) -> SourceDocument {
        SourceDocument {
            watermarked_name: name.to_string(),
            page_count: pages,
        }
    }

    #[test]
    fn test_derive_entry_name() {
        let (group, display) = derive_entry_name("Alice_payslip_june_watermarked.pdf");
        assert_eq!(group, "Alice");
        assert_eq!(display, "Payslip June");
    }

    #[test]
    fn test_derive_entry_name_cuts_at_dash() {
        let (group, display) = derive_entry_name("Bob_tax_notice-2024-final_watermarked.pdf");
        assert_eq!(group, "Bob");
        assert_eq!(display, "Tax Notice");
    }

    #[test]
    fn test_derive_entry_name_uppercase_extension() {
        let (group, display) = derive_entry_name("Bob_id_card_watermarked.PDF");
        assert_eq!(group, "Bob");
        assert_eq!(display, "Id Card");
    }

    #[test]
    fn test_start_pages_are_contiguous() {
        let documents = vec![
            source("A_one_watermarked.pdf", 3),
            source("A_two_watermarked.pdf", 1),
            source("B_three_watermarked.pdf", 5),
        ];
        let entries = build_entries(&documents, 1);

        assert_eq!(entries[0].start_page, 3);
        for window in entries.windows(2) {
            assert_eq!(
                window[1].start_page,
                window[0].start_page + window[0].page_count
            );
        }
        assert_eq!(total_pages(&entries, 1), 2 + 3 + 1 + 5);
    }

    #[test]
    fn test_start_pages_account_for_toc_length() {
        let documents = vec![source("A_one_watermarked.pdf", 2)];
        let entries = build_entries(&documents, 3);
        // 1 title page + 3 TOC pages, then the document
        assert_eq!(entries[0].start_page, 5);
    }
}
