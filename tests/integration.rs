//! End-to-end tests over synthetic source PDFs

use std::fs;
use std::path::Path;

use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use pdf_dossier::error::Error;
use pdf_dossier::pdf::{count_pages, ordered_page_ids};
use pdf_dossier::{run_pipeline, PipelineOptions, DEFAULT_OPACITY};

/// Write a minimal valid PDF with the given number of A4 pages
fn write_source_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for index in 0..pages {
        let content = format!("BT\n/F1 12 Tf\n72 770 Td\n(Page {}) Tj\nET\n", index + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(595.276),
                Object::Real(841.89),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => count,
            "Kids" => kids,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc.save(path).expect("failed to save source PDF");
}

fn options(source: &Path) -> PipelineOptions {
    PipelineOptions {
        source: source.to_path_buf(),
        watermark_text: "DOCUMENT RESERVE A LA LOCATION".to_string(),
        title: "Dossier de Location".to_string(),
        opacity: DEFAULT_OPACITY,
        keep_intermediates: false,
    }
}

fn resolve_dict(doc: &Document, object: &Object) -> lopdf::Dictionary {
    match object {
        Object::Reference(id) => doc
            .get_object(*id)
            .and_then(Object::as_dict)
            .expect("reference does not resolve to a dictionary")
            .clone(),
        Object::Dictionary(dict) => dict.clone(),
        other => panic!("expected dictionary, got {other:?}"),
    }
}

#[test]
fn test_pipeline_two_groups_three_documents() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Alice")).unwrap();
    fs::create_dir(dir.path().join("Bob")).unwrap();
    write_source_pdf(&dir.path().join("Alice/payslip.pdf"), 1);
    write_source_pdf(&dir.path().join("Bob/id_card.pdf"), 1);
    write_source_pdf(&dir.path().join("Bob/tax_notice.pdf"), 1);

    let report = run_pipeline(&options(dir.path())).unwrap();
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failed(), 0);

    let combined = Document::load(&report.output).unwrap();
    // Title page + one TOC page + three single-page documents
    assert_eq!(count_pages(&combined).unwrap(), 5);
    assert_eq!(report.total_pages, 5);

    let page_ids = ordered_page_ids(&combined);

    // The TOC page carries one link per document, targeting pages 3, 4, 5
    let toc_page = combined
        .get_object(page_ids[1])
        .and_then(Object::as_dict)
        .unwrap();
    let annots = toc_page.get(b"Annots").and_then(Object::as_array).unwrap();
    assert_eq!(annots.len(), 3);
    for (annot_ref, expected_index) in annots.iter().zip([2usize, 3, 4]) {
        let annot = resolve_dict(&combined, annot_ref);
        assert_eq!(
            annot.get(b"Subtype").unwrap().as_name().unwrap(),
            b"Link".as_slice()
        );
        let dest = annot.get(b"Dest").and_then(Object::as_array).unwrap();
        assert_eq!(dest[0], Object::Reference(page_ids[expected_index]));
    }

    // Outline: Title Page, Table of Contents, Alice (1 child), Bob (2)
    let catalog = combined.catalog().unwrap();
    let outlines = resolve_dict(&combined, catalog.get(b"Outlines").unwrap());
    assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 4);
    assert_eq!(
        catalog.get(b"PageMode").unwrap().as_name().unwrap(),
        b"UseOutlines".as_slice()
    );

    let mut node = resolve_dict(&combined, outlines.get(b"First").unwrap());
    let mut titles = Vec::new();
    let mut child_counts = Vec::new();
    loop {
        titles.push(String::from_utf8(node.get(b"Title").unwrap().as_str().unwrap().to_vec()).unwrap());
        child_counts.push(node.get(b"Count").and_then(|c| c.as_i64()).unwrap_or(0));
        match node.get(b"Next") {
            Ok(next) => node = resolve_dict(&combined, next),
            Err(_) => break,
        }
    }
    assert_eq!(
        titles,
        vec!["Title Page", "Table of Contents", "Alice", "Bob"]
    );
    assert_eq!(child_counts, vec![0, 0, -1, -2]);
}

#[test]
fn test_pipeline_multi_page_documents_shift_start_pages() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Alice")).unwrap();
    fs::create_dir(dir.path().join("Bob")).unwrap();
    write_source_pdf(&dir.path().join("Alice/lease.pdf"), 3);
    write_source_pdf(&dir.path().join("Bob/id_card.pdf"), 1);

    let report = run_pipeline(&options(dir.path())).unwrap();
    let combined = Document::load(&report.output).unwrap();
    // 1 title + 1 TOC + 3 + 1
    assert_eq!(count_pages(&combined).unwrap(), 6);

    // Bob's group bookmark lands after Alice's three pages: 0-based index 5
    let page_ids = ordered_page_ids(&combined);
    let catalog = combined.catalog().unwrap();
    let outlines = resolve_dict(&combined, catalog.get(b"Outlines").unwrap());
    let mut node = resolve_dict(&combined, outlines.get(b"First").unwrap());
    while node.get(b"Title").unwrap().as_str().unwrap() != b"Bob".as_slice() {
        node = resolve_dict(&combined, node.get(b"Next").expect("Bob bookmark missing"));
    }
    let dest = node.get(b"Dest").and_then(Object::as_array).unwrap();
    assert_eq!(dest[0], Object::Reference(page_ids[5]));
}

#[test]
fn test_pipeline_preserves_source_files_and_page_sizes() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Alice")).unwrap();
    let source = dir.path().join("Alice/payslip.pdf");
    write_source_pdf(&source, 2);
    let original_bytes = fs::read(&source).unwrap();

    let report = run_pipeline(&options(dir.path())).unwrap();

    // Sources are read, never rewritten
    assert_eq!(fs::read(&source).unwrap(), original_bytes);

    let combined = Document::load(&report.output).unwrap();
    let page_ids = ordered_page_ids(&combined);
    // Watermarked pages keep the source A4 size
    let geometry = pdf_dossier::pdf::page_geometry(&combined, page_ids[2]).unwrap();
    assert!((geometry.width - 595.276).abs() < 0.01);
    assert!((geometry.height - 841.89).abs() < 0.01);
}

#[test]
fn test_pipeline_repeat_run_reproduces_page_content() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Alice")).unwrap();
    fs::create_dir(dir.path().join("Bob")).unwrap();
    write_source_pdf(&dir.path().join("Alice/payslip.pdf"), 2);
    write_source_pdf(&dir.path().join("Bob/id_card.pdf"), 1);

    let first_report = run_pipeline(&options(dir.path())).unwrap();
    let saved = dir.path().join("first_run.pdf");
    fs::copy(&first_report.output, &saved).unwrap();

    let second_report = run_pipeline(&options(dir.path())).unwrap();

    let first = Document::load(&saved).unwrap();
    let second = Document::load(&second_report.output).unwrap();
    let first_pages = ordered_page_ids(&first);
    let second_pages = ordered_page_ids(&second);
    assert_eq!(first_pages.len(), second_pages.len());

    // Object numbering may differ between runs; the decoded page content
    // streams must not
    for (a, b) in first_pages.iter().zip(&second_pages) {
        assert_eq!(
            first.get_page_content(*a).unwrap(),
            second.get_page_content(*b).unwrap()
        );
    }
}

#[test]
fn test_pipeline_skips_corrupt_document_and_continues() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Alice")).unwrap();
    write_source_pdf(&dir.path().join("Alice/payslip.pdf"), 1);
    fs::write(dir.path().join("Alice/broken.pdf"), b"this is not a pdf").unwrap();

    let report = run_pipeline(&options(dir.path())).unwrap();
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    let combined = Document::load(&report.output).unwrap();
    // Title + TOC + the one surviving document
    assert_eq!(count_pages(&combined).unwrap(), 3);
}

#[test]
fn test_pipeline_fails_when_nothing_processed() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Alice")).unwrap();
    fs::write(dir.path().join("Alice/broken.pdf"), b"junk").unwrap();

    let result = run_pipeline(&options(dir.path()));
    assert!(matches!(result, Err(Error::NoDocumentsProcessed)));
}

#[test]
fn test_pipeline_keeps_intermediates_on_request() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Alice")).unwrap();
    write_source_pdf(&dir.path().join("Alice/payslip.pdf"), 1);

    let mut opts = options(dir.path());
    opts.keep_intermediates = true;
    run_pipeline(&opts).unwrap();

    let intermediate = dir
        .path()
        .join("temp_watermarked/Alice_payslip_watermarked.pdf");
    assert!(intermediate.exists());
    assert_eq!(count_pages(&Document::load(&intermediate).unwrap()).unwrap(), 1);

    // A second run must not pick the intermediates up as sources
    let report = run_pipeline(&options(dir.path())).unwrap();
    assert_eq!(report.succeeded(), 1);
}

#[test]
fn test_pipeline_output_name_includes_watermark_text() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("Alice")).unwrap();
    write_source_pdf(&dir.path().join("Alice/payslip.pdf"), 1);

    let mut opts = options(dir.path());
    opts.watermark_text = "CONFIDENTIAL COPY".to_string();
    let report = run_pipeline(&opts).unwrap();
    assert_eq!(
        report.output.file_name().unwrap().to_str().unwrap(),
        "Dossier_Location_Complete_CONFIDENTIAL_COPY.pdf"
    );
    assert!(report.output.exists());
}
