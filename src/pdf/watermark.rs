//! Per-page watermark composition
//!
//! Merges a freshly rendered overlay onto every page of a source document.
//! Pages within one document may have different sizes, so each page gets an
//! overlay rendered to its own MediaBox; the overlay content is painted
//! after (on top of) the original content and the original streams are left
//! untouched underneath.

use std::collections::HashMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::pdf::metadata::page_geometry;
use crate::pdf::overlay::{OverlayDiagnostic, OverlayRenderer};

/// Watermark every page of `doc` in place.
///
/// `source` is only used for error reporting. Returns the overlay
/// diagnostics collected across pages (at most one batch per renderer
/// instance). Any unreadable page fails the whole document; the caller
/// decides whether to skip it and continue with other documents.
pub fn watermark_document(
    doc: &mut Document,
    renderer: &mut OverlayRenderer,
    source: &Path,
) -> Result<Vec<OverlayDiagnostic>> {
    let pages: Vec<(u32, ObjectId)> = doc.get_pages().into_iter().collect();
    if pages.is_empty() {
        return Err(Error::EmptyPdf(source.to_path_buf()));
    }

    let mut diagnostics = Vec::new();

    for (page_num, page_id) in pages {
        let geometry =
            page_geometry(doc, page_id).ok_or_else(|| Error::MissingPageGeometry {
                path: source.to_path_buf(),
                page: page_num,
            })?;

        let overlay = renderer.render(geometry)?;
        diagnostics.extend(overlay.diagnostics);

        apply_overlay_to_page(doc, page_id, &overlay.document)?;
    }

    Ok(diagnostics)
}

/// Import one overlay document's objects and paint its page over `page_id`
fn apply_overlay_to_page(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: &Document,
) -> Result<()> {
    // Renumber the overlay's objects past the target document's IDs
    let id_offset = doc.max_id + 1;
    let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    for old_id in overlay.objects.keys() {
        id_map.insert(*old_id, (old_id.0 + id_offset, old_id.1));
    }

    for (old_id, object) in overlay.objects.iter() {
        let new_object = renumber_object_references(object, &id_map);
        doc.objects.insert(id_map[old_id], new_object);
    }
    doc.max_id = overlay.max_id + id_offset;

    let (content_refs, resources) = overlay_page_parts(overlay, &id_map)?;

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)?;

    // Append overlay content after the original streams
    let existing_content = page_dict.get(b"Contents").ok().cloned();
    match existing_content {
        Some(Object::Reference(content_id)) => {
            let mut contents = vec![Object::Reference(content_id)];
            contents.extend(content_refs);
            page_dict.set("Contents", Object::Array(contents));
        }
        Some(Object::Array(mut contents)) => {
            contents.extend(content_refs);
            page_dict.set("Contents", Object::Array(contents));
        }
        _ => {
            page_dict.set("Contents", Object::Array(content_refs));
        }
    }

    merge_page_resources(doc, page_id, &resources)
}

/// Renumber all object references inside an object
fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => match id_map.get(old_id) {
            Some(new_id) => Object::Reference(*new_id),
            None => Object::Reference(*old_id),
        },
        Object::Array(values) => Object::Array(
            values
                .iter()
                .map(|value| renumber_object_references(value, id_map))
                .collect(),
        ),
        Object::Dictionary(dict) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in dict.iter() {
                new_dict.set(key.clone(), renumber_object_references(value, id_map));
            }
            Object::Dictionary(new_dict)
        }
        Object::Stream(stream) => {
            let mut new_dict = Dictionary::new();
            for (key, value) in stream.dict.iter() {
                new_dict.set(key.clone(), renumber_object_references(value, id_map));
            }
            Object::Stream(lopdf::Stream {
                dict: new_dict,
                content: stream.content.clone(),
                allows_compression: stream.allows_compression,
                start_position: stream.start_position,
            })
        }
        _ => object.clone(),
    }
}

/// Content references and resources of the overlay's single page, with IDs
/// remapped into the target document's numbering
fn overlay_page_parts(
    overlay: &Document,
    id_map: &HashMap<ObjectId, ObjectId>,
) -> Result<(Vec<Object>, Object)> {
    let page_id = overlay
        .get_pages()
        .into_values()
        .next()
        .ok_or_else(|| Error::General("overlay document has no page".to_string()))?;

    let page_dict = overlay.get_object(page_id).and_then(Object::as_dict)?;

    let content_refs = match page_dict.get(b"Contents") {
        Ok(contents) => match renumber_object_references(contents, id_map) {
            Object::Reference(id) => vec![Object::Reference(id)],
            Object::Array(values) => values,
            other => vec![other],
        },
        Err(_) => vec![],
    };

    let resources = match page_dict.get(b"Resources") {
        Ok(resources) => renumber_object_references(resources, id_map),
        Err(_) => Object::Dictionary(Dictionary::new()),
    };

    Ok((content_refs, resources))
}

/// Merge overlay resources into the page's Resources dictionary
///
/// The page's Resources may itself be an indirect reference; it is copied
/// onto the page so the merge affects only this page.
fn merge_page_resources(
    doc: &mut Document,
    page_id: ObjectId,
    overlay_resources: &Object,
) -> Result<()> {
    let existing = {
        let page_dict = doc.get_object(page_id).and_then(Object::as_dict)?;
        match page_dict.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            Ok(Object::Reference(id)) => match doc.get_object(*id) {
                Ok(Object::Dictionary(dict)) => dict.clone(),
                _ => Dictionary::new(),
            },
            _ => Dictionary::new(),
        }
    };

    let mut merged = existing;
    if let Object::Dictionary(overlay_dict) = overlay_resources {
        for (key, value) in overlay_dict.iter() {
            match (merged.get(key).ok().cloned(), value) {
                // Both sides have this resource class: merge the entries
                (Some(Object::Dictionary(mut existing_sub)), Object::Dictionary(overlay_sub)) => {
                    for (sub_key, sub_value) in overlay_sub.iter() {
                        existing_sub.set(sub_key.clone(), sub_value.clone());
                    }
                    merged.set(key.clone(), Object::Dictionary(existing_sub));
                }
                _ => {
                    merged.set(key.clone(), value.clone());
                }
            }
        }
    }

    let page_dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)?;
    page_dict.set("Resources", Object::Dictionary(merged));

    Ok(())
}
