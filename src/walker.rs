//! Folder discovery and the end-to-end pipeline
//!
//! Walks the immediate subfolders of a source directory (one folder per
//! group), watermarks every PDF found, then assembles the title page, TOC
//! and watermarked documents into one combined output saved next to the
//! source folders.
//!
//! Documents are processed independently: one unreadable PDF is reported
//! and skipped, the rest of the batch continues. The run only fails
//! outright when no document at all could be processed.

use std::fs;
use std::path::{Path, PathBuf};

use lopdf::Document;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::pdf::entries::{build_entries, derive_entry_name, total_pages, SourceDocument};
use crate::pdf::frontmatter::{count_toc_pages, render_title_page, render_toc};
use crate::pdf::metadata::count_pages;
use crate::pdf::overlay::{OverlayDiagnostic, OverlayRenderer};
use crate::pdf::watermark::watermark_document;
use crate::pdf::{assemble, DocumentEntry};

/// Folder names never treated as document groups
const EXCLUDED_FOLDERS: [&str; 3] = ["temp_watermarked", "protected_files", "Dossier Location"];

/// Subfolder that receives intermediate watermarked files when kept
const INTERMEDIATE_FOLDER: &str = "temp_watermarked";

/// Watermark opacity used when the caller does not override it
pub const DEFAULT_OPACITY: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory whose subfolders hold the source PDFs
    pub source: PathBuf,
    /// Text repeated diagonally on every page
    pub watermark_text: String,
    /// Title printed on the generated title page
    pub title: String,
    /// Watermark fill opacity, 0.0..=1.0
    pub opacity: f64,
    /// Write the per-document watermarked PDFs alongside the output
    pub keep_intermediates: bool,
}

/// Outcome of one source document within a run
#[derive(Debug)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub watermarked_name: String,
    /// Page count on success, the error that sank this document otherwise
    pub result: std::result::Result<usize, Error>,
}

/// Summary of a completed run
#[derive(Debug)]
pub struct PipelineReport {
    pub output: PathBuf,
    pub documents: Vec<DocumentReport>,
    pub total_pages: usize,
}

impl PipelineReport {
    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|d| d.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.documents.len() - self.succeeded()
    }
}

/// One discovered source PDF with its intermediate name
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDocument {
    pub path: PathBuf,
    pub watermarked_name: String,
}

/// Find every source PDF under the group subfolders of `source`.
///
/// Groups are the immediate subdirectories, minus the excluded working
/// folders. Results are ordered by group then file name, so repeat runs
/// assemble pages in the same order.
pub fn discover_documents(source: &Path) -> Result<Vec<DiscoveredDocument>> {
    if !source.is_dir() {
        return Err(Error::FileNotFound(source.to_path_buf()));
    }

    let mut groups: Vec<(String, PathBuf)> = Vec::new();
    for dir_entry in fs::read_dir(source)? {
        let dir_entry = dir_entry?;
        if !dir_entry.path().is_dir() {
            continue;
        }
        let name = dir_entry.file_name().to_string_lossy().into_owned();
        if EXCLUDED_FOLDERS.contains(&name.as_str()) {
            continue;
        }
        groups.push((name, dir_entry.path()));
    }
    groups.sort();

    let mut documents = Vec::new();
    for (group, folder) in groups {
        let mut files: Vec<PathBuf> = fs::read_dir(&folder)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                        .unwrap_or(false)
            })
            .collect();
        files.sort();

        for path in files {
            let stem = match path.file_stem() {
                Some(stem) => stem.to_string_lossy().into_owned(),
                None => continue,
            };
            let watermarked_name = format!("{group}_{stem}_watermarked.pdf");
            // A duplicate stem within one group would collide in the entry
            // list; keep the first occurrence
            if documents
                .iter()
                .any(|d: &DiscoveredDocument| d.watermarked_name == watermarked_name)
            {
                warn!(path = %path.display(), "skipping duplicate document name");
                continue;
            }
            documents.push(DiscoveredDocument {
                path,
                watermarked_name,
            });
        }
    }

    Ok(documents)
}

/// Output file name for a given watermark text
pub fn output_file_name(watermark_text: &str) -> String {
    format!(
        "Dossier_Location_Complete_{}.pdf",
        watermark_text.replace(' ', "_")
    )
}

/// Run the whole pipeline: discover, watermark, assemble, save
pub fn run_pipeline(options: &PipelineOptions) -> Result<PipelineReport> {
    let discovered = discover_documents(&options.source)?;
    info!(count = discovered.len(), "discovered source documents");

    // One renderer for the run: fit diagnostics are reported once per
    // text/size combination, not once per page
    let mut renderer = OverlayRenderer::new(&options.watermark_text, options.opacity);

    let mut reports: Vec<DocumentReport> = Vec::new();
    let mut watermarked: Vec<(String, Document)> = Vec::new();

    for item in &discovered {
        match watermark_one(&item.path, &mut renderer) {
            Ok((doc, page_count, diagnostics)) => {
                for diagnostic in diagnostics {
                    match diagnostic {
                        OverlayDiagnostic::FontSizeReduced { font_size } => {
                            info!(font_size, "watermark font size reduced to fit page width");
                        }
                        OverlayDiagnostic::TextTruncated { rendered } => {
                            info!(rendered = %rendered, "watermark text truncated to fit page width");
                        }
                    }
                }
                info!(path = %item.path.display(), pages = page_count, "watermarked");
                watermarked.push((item.watermarked_name.clone(), doc));
                reports.push(DocumentReport {
                    source: item.path.clone(),
                    watermarked_name: item.watermarked_name.clone(),
                    result: Ok(page_count),
                });
            }
            Err(error) => {
                warn!(path = %item.path.display(), %error, "skipping document");
                reports.push(DocumentReport {
                    source: item.path.clone(),
                    watermarked_name: item.watermarked_name.clone(),
                    result: Err(error),
                });
            }
        }
    }

    if watermarked.is_empty() {
        return Err(Error::NoDocumentsProcessed);
    }

    if options.keep_intermediates {
        write_intermediates(&options.source, &mut watermarked)?;
    }

    let sources: Vec<SourceDocument> = watermarked
        .iter()
        .map(|(name, doc)| {
            Ok(SourceDocument {
                watermarked_name: name.clone(),
                page_count: count_pages(doc)?,
            })
        })
        .collect::<Result<_>>()?;

    let groups: Vec<String> = sources
        .iter()
        .map(|s| derive_entry_name(&s.watermarked_name).0)
        .collect();
    let toc_page_count = count_toc_pages(groups.iter().map(String::as_str));
    let entries: Vec<DocumentEntry> = build_entries(&sources, toc_page_count);

    let title = render_title_page(&options.title, &generated_line());
    let (toc, links, rendered_toc_pages) = render_toc(&entries);
    debug_assert_eq!(rendered_toc_pages, toc_page_count);

    let documents: Vec<Document> = watermarked.into_iter().map(|(_, doc)| doc).collect();
    let mut combined = assemble(title, toc, documents, &links, &entries)?;

    let expected_pages = total_pages(&entries, toc_page_count);
    let actual_pages = count_pages(&combined)?;
    if actual_pages != expected_pages {
        warn!(expected_pages, actual_pages, "combined page count mismatch");
    }

    let output = options.source.join(output_file_name(&options.watermark_text));
    combined.compress();
    combined.save(&output)?;
    info!(output = %output.display(), pages = actual_pages, "combined dossier saved");

    Ok(PipelineReport {
        output,
        documents: reports,
        total_pages: actual_pages,
    })
}

fn watermark_one(
    path: &Path,
    renderer: &mut OverlayRenderer,
) -> Result<(Document, usize, Vec<OverlayDiagnostic>)> {
    let mut doc = Document::load(path)?;
    let diagnostics = watermark_document(&mut doc, renderer, path)?;
    let page_count = count_pages(&doc)?;
    Ok((doc, page_count, diagnostics))
}

fn write_intermediates(source: &Path, watermarked: &mut [(String, Document)]) -> Result<()> {
    let folder = source.join(INTERMEDIATE_FOLDER);
    fs::create_dir_all(&folder)?;
    for (name, doc) in watermarked {
        let path = folder.join(name.as_str());
        doc.save(&path)?;
        info!(path = %path.display(), "kept intermediate");
    }
    Ok(())
}

fn generated_line() -> String {
    format!("Generated on {}", chrono::Local::now().format("%B %-d, %Y"))
}
