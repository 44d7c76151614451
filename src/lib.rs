//! Batch watermarking and dossier assembly for PDF files.
//!
//! Walks a folder of grouped source PDFs, stamps a repeated diagonal
//! watermark on every page, and merges everything into one combined
//! document with a generated title page, a clickable table of contents
//! and a two-level bookmark outline.

pub mod error;
pub mod font;
pub mod layout;
pub mod pdf;
pub mod walker;

pub use error::{Error, Result};
pub use walker::{run_pipeline, PipelineOptions, PipelineReport, DEFAULT_OPACITY};
