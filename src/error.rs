//! Error types for the dossier pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the dossier pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {}", .0.display())]
    EmptyPdf(PathBuf),

    /// A page is missing a readable MediaBox
    #[error("page {page} of {} has no readable dimensions", .path.display())]
    MissingPageGeometry { path: PathBuf, page: u32 },

    /// A computed page index does not exist in the assembled document
    #[error("page index {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    /// No source document could be watermarked
    #[error("no PDF documents were successfully processed")]
    NoDocumentsProcessed,

    /// General error
    #[error("{0}")]
    General(String),
}
