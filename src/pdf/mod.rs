//! PDF processing: watermark overlays, front matter, and assembly

pub mod assemble;
pub mod entries;
pub mod frontmatter;
pub mod metadata;
pub mod overlay;
pub mod watermark;

pub use assemble::{assemble, concatenate, inject_bookmarks, inject_links};
pub use entries::{build_entries, derive_entry_name, total_pages, DocumentEntry, SourceDocument};
pub use frontmatter::{count_toc_pages, render_title_page, render_toc, TocLinkRecord};
pub use metadata::{count_pages, ordered_page_ids, page_geometry};
pub use overlay::{OverlayDiagnostic, OverlayRenderer};
pub use watermark::watermark_document;
