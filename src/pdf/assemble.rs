//! Combined-document assembly
//!
//! Three passes over one in-memory document, in a fixed order:
//! 1. concatenate title page + TOC pages + every watermarked document;
//! 2. inject clickable link annotations on the TOC pages;
//! 3. inject the two-level outline tree (group -> document).
//!
//! Links and bookmarks need the final page sequence and the per-page
//! heights, which only exist after concatenation, hence the ordering.
//! Page indices: the title page is absolute index 0, the first TOC page
//! is index 1, and a document entry's 1-based `start_page` maps to the
//! 0-based index `start_page - 1`.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::warn;

use crate::error::{Error, Result};
use crate::pdf::entries::DocumentEntry;
use crate::pdf::frontmatter::TocLinkRecord;
use crate::pdf::metadata::{ordered_page_ids, page_geometry};

/// Run all three passes and return the finished document
pub fn assemble(
    title: Document,
    toc: Document,
    documents: Vec<Document>,
    links: &[TocLinkRecord],
    entries: &[DocumentEntry],
) -> Result<Document> {
    let mut parts = Vec::with_capacity(documents.len() + 2);
    parts.push(title);
    parts.push(toc);
    parts.extend(documents);

    let mut merged = concatenate(parts)?;
    inject_links(&mut merged, links);
    inject_bookmarks(&mut merged, entries)?;
    Ok(merged)
}

/// Concatenate documents into one page sequence, in order.
///
/// Objects from each document are renumbered past the previous maximum,
/// collected into one object table, and a fresh Pages/Catalog pair is
/// built over the combined page list.
pub fn concatenate(documents: Vec<Document>) -> Result<Document> {
    if documents.is_empty() {
        return Err(Error::General("No documents to concatenate".to_string()));
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let doc_pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &doc_pages {
            pull_down_inherited_attributes(&mut doc, page_id);
        }
        page_ids.extend(doc_pages);
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);
    // new_object_id() must not collide with the objects just imported
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    pages.set("Kids", Object::Array(kids));

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.objects.insert(pages_id, Object::Dictionary(pages));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(page_dict)) = merged.get_object_mut(page_id) {
            page_dict.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(merged)
}

/// Page-tree attributes a page may inherit from its Pages ancestors
const INHERITABLE_PAGE_KEYS: [&[u8]; 3] = [b"MediaBox", b"Resources", b"Rotate"];

/// Copy inherited attributes onto the page dictionary itself.
///
/// Reparenting onto the flat merged Pages node severs the original Parent
/// chain, so anything the page inherits from its old ancestors has to be
/// materialized on the page first.
fn pull_down_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    let mut pulled: Vec<(&[u8], Object)> = Vec::new();
    if let Ok(page_dict) = doc.get_object(page_id).and_then(Object::as_dict) {
        for key in INHERITABLE_PAGE_KEYS {
            if page_dict.get(key).is_err() {
                if let Some(value) = inherited_value(doc, page_id, key) {
                    pulled.push((key, value));
                }
            }
        }
    }
    if pulled.is_empty() {
        return;
    }
    if let Ok(page_dict) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
        for (key, value) in pulled {
            page_dict.set(key, value);
        }
    }
}

/// Walk the Parent chain until a node carries `key`
fn inherited_value(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current_id = page_id;
    // Bounded walk, same discipline as the geometry reader
    for _ in 0..32 {
        let dict = doc.get_object(current_id).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current_id = match dict.get(b"Parent") {
            Ok(Object::Reference(id)) => *id,
            _ => return None,
        };
    }
    None
}

/// Convert a layout-space rectangle (top-down y) into page-description
/// space (bottom-up y) for a page of the given height
pub(crate) fn flip_rect(rect: [f64; 4], page_height: f64) -> [f64; 4] {
    [
        rect[0],
        page_height - rect[3],
        rect[2],
        page_height - rect[1],
    ]
}

/// Attach one link annotation per TOC record.
///
/// A failing record (target drifted out of range, unreadable TOC page) is
/// logged and skipped; the remaining links are still injected. Returns the
/// number of links actually attached.
pub fn inject_links(doc: &mut Document, links: &[TocLinkRecord]) -> usize {
    let page_ids = ordered_page_ids(doc);
    let page_count = page_ids.len();
    let mut injected = 0;

    for record in links {
        // Title page occupies absolute index 0; TOC pages follow
        let toc_index = 1 + record.toc_page;
        let target_index = record.target_page - 1;

        if toc_index >= page_count || target_index >= page_count {
            warn!(
                toc_index,
                target_index, page_count, "skipping TOC link with out-of-range page index"
            );
            continue;
        }

        let toc_page_id = page_ids[toc_index];
        let target_page_id = page_ids[target_index];

        let Some(geometry) = page_geometry(doc, toc_page_id) else {
            warn!(toc_index, "skipping TOC link: TOC page height unreadable");
            continue;
        };

        let rect = flip_rect(record.rect, geometry.height);
        let mut annot = Dictionary::new();
        annot.set("Type", Object::Name(b"Annot".to_vec()));
        annot.set("Subtype", Object::Name(b"Link".to_vec()));
        annot.set(
            "Rect",
            Object::Array(rect.iter().map(|&v| Object::Real(v as f32)).collect()),
        );
        annot.set(
            "Border",
            Object::Array(vec![0.into(), 0.into(), 0.into()]),
        );
        annot.set(
            "Dest",
            Object::Array(vec![
                Object::Reference(target_page_id),
                Object::Name(b"Fit".to_vec()),
            ]),
        );
        let annot_id = doc.add_object(Object::Dictionary(annot));

        if let Err(error) = attach_annotation(doc, toc_page_id, annot_id) {
            warn!(%error, toc_index, "skipping TOC link: could not attach annotation");
            continue;
        }
        injected += 1;
    }

    injected
}

fn attach_annotation(doc: &mut Document, page_id: ObjectId, annot_id: ObjectId) -> Result<()> {
    // A referenced Annots array is copied onto the page before extending
    let existing = {
        let page_dict = doc.get_object(page_id).and_then(Object::as_dict)?;
        match page_dict.get(b"Annots") {
            Ok(Object::Array(values)) => Some(values.clone()),
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Array(values)) => Some(values.clone()),
                _ => None,
            },
            _ => None,
        }
    };

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)?;
    let mut annots = existing.unwrap_or_default();
    annots.push(Object::Reference(annot_id));
    page_dict.set("Annots", Object::Array(annots));
    Ok(())
}

/// One prospective outline node before objects are allocated
struct OutlineNode {
    title: String,
    page_index: usize,
    children: Vec<(String, usize)>,
}

/// Build and attach the outline tree: the two front-matter entries, then
/// one node per group with its documents as children.
pub fn inject_bookmarks(doc: &mut Document, entries: &[DocumentEntry]) -> Result<()> {
    let page_ids = ordered_page_ids(doc);
    let page_count = page_ids.len();

    let mut nodes: Vec<OutlineNode> = vec![
        OutlineNode {
            title: "Title Page".to_string(),
            page_index: 0,
            children: Vec::new(),
        },
        OutlineNode {
            title: "Table of Contents".to_string(),
            page_index: 1,
            children: Vec::new(),
        },
    ];

    let mut previous_group: Option<&str> = None;
    for entry in entries {
        let page_index = entry.start_page - 1;
        if page_index >= page_count {
            warn!(
                page_index,
                page_count,
                title = entry.display_name,
                "skipping bookmark with out-of-range page index"
            );
            continue;
        }
        if previous_group != Some(entry.group.as_str()) {
            nodes.push(OutlineNode {
                title: entry.group.clone(),
                page_index,
                children: Vec::new(),
            });
            previous_group = Some(entry.group.as_str());
        }
        if let Some(group_node) = nodes.last_mut() {
            group_node
                .children
                .push((entry.display_name.clone(), page_index));
        }
    }

    let outlines_id = doc.new_object_id();
    let node_ids: Vec<ObjectId> = nodes.iter().map(|_| doc.new_object_id()).collect();

    for (index, node) in nodes.iter().enumerate() {
        let node_id = node_ids[index];
        let mut dict = Dictionary::new();
        dict.set(
            "Title",
            Object::String(node.title.as_bytes().to_vec(), StringFormat::Literal),
        );
        dict.set("Parent", Object::Reference(outlines_id));
        dict.set(
            "Dest",
            fit_destination(page_ids[node.page_index]),
        );
        if index > 0 {
            dict.set("Prev", Object::Reference(node_ids[index - 1]));
        }
        if index < nodes.len() - 1 {
            dict.set("Next", Object::Reference(node_ids[index + 1]));
        }

        if !node.children.is_empty() {
            let child_ids: Vec<ObjectId> =
                node.children.iter().map(|_| doc.new_object_id()).collect();
            dict.set("First", Object::Reference(child_ids[0]));
            dict.set("Last", Object::Reference(child_ids[child_ids.len() - 1]));
            // Negative count: children start collapsed
            dict.set("Count", Object::Integer(-(node.children.len() as i64)));

            for (child_index, (title, page_index)) in node.children.iter().enumerate() {
                let mut child = Dictionary::new();
                child.set(
                    "Title",
                    Object::String(title.as_bytes().to_vec(), StringFormat::Literal),
                );
                child.set("Parent", Object::Reference(node_id));
                child.set("Dest", fit_destination(page_ids[*page_index]));
                if child_index > 0 {
                    child.set("Prev", Object::Reference(child_ids[child_index - 1]));
                }
                if child_index < child_ids.len() - 1 {
                    child.set("Next", Object::Reference(child_ids[child_index + 1]));
                }
                doc.objects
                    .insert(child_ids[child_index], Object::Dictionary(child));
            }
        }

        doc.objects.insert(node_id, Object::Dictionary(dict));
    }

    let mut outlines = Dictionary::new();
    outlines.set("Type", Object::Name(b"Outlines".to_vec()));
    outlines.set("First", Object::Reference(node_ids[0]));
    outlines.set("Last", Object::Reference(node_ids[node_ids.len() - 1]));
    outlines.set("Count", Object::Integer(node_ids.len() as i64));
    doc.objects.insert(outlines_id, Object::Dictionary(outlines));

    let catalog_id = match doc.trailer.get(b"Root") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::General("assembled document has no Root".to_string())),
    };
    let catalog = doc
        .get_object_mut(catalog_id)
        .and_then(Object::as_dict_mut)?;
    catalog.set("Outlines", Object::Reference(outlines_id));
    catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

    Ok(())
}

fn fit_destination(page_id: ObjectId) -> Object {
    Object::Array(vec![
        Object::Reference(page_id),
        Object::Name(b"Fit".to_vec()),
    ])
}
