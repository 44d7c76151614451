//! Page counting and per-page geometry reads

use lopdf::{Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::layout::PageGeometry;

/// Count pages by reading the Count field from the Pages dictionary
///
/// More reliable than `get_pages()` for documents with nested page trees.
pub fn count_pages(doc: &Document) -> Result<usize> {
    let catalog_ref = doc
        .trailer
        .get(b"Root")
        .map_err(|_| Error::General("No Root in trailer".to_string()))?;

    let catalog_id = match catalog_ref {
        Object::Reference(id) => *id,
        _ => return Err(Error::General("Root is not a reference".to_string())),
    };

    let catalog = doc.get_object(catalog_id)?;
    let catalog_dict = catalog
        .as_dict()
        .map_err(|_| Error::General("Catalog is not a dictionary".to_string()))?;

    let pages_id = match catalog_dict.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        _ => return Err(Error::General("No Pages reference in catalog".to_string())),
    };

    let pages_dict = doc
        .get_object(pages_id)?
        .as_dict()
        .map_err(|_| Error::General("Pages is not a dictionary".to_string()))?;

    let count = pages_dict
        .get(b"Count")
        .and_then(|c| c.as_i64())
        .map_err(|_| Error::General("No Count in Pages".to_string()))?;

    Ok(count as usize)
}

/// Read the width/height of one page from its MediaBox
///
/// The MediaBox is inheritable: if the page dictionary does not carry one,
/// the Parent chain is walked until a node does.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Option<PageGeometry> {
    let mut current_id = page_id;

    // Bounded walk up the page tree
    for _ in 0..32 {
        let dict = doc.get_object(current_id).ok()?.as_dict().ok()?;

        if let Ok(media_box) = dict.get(b"MediaBox") {
            // The MediaBox entry itself may be an indirect reference
            let resolved = match media_box {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            let values = resolved.as_array().ok()?;
            if values.len() != 4 {
                return None;
            }
            let x1 = values[0].as_float().ok()? as f64;
            let y1 = values[1].as_float().ok()? as f64;
            let x2 = values[2].as_float().ok()? as f64;
            let y2 = values[3].as_float().ok()? as f64;
            return Some(PageGeometry {
                width: x2 - x1,
                height: y2 - y1,
            });
        }

        current_id = match dict.get(b"Parent") {
            Ok(Object::Reference(id)) => *id,
            _ => return None,
        };
    }

    None
}

/// Page object IDs in page order (1-based page number keys discarded)
pub fn ordered_page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::single_page_document;

    #[test]
    fn test_count_pages_single_page() {
        let doc = single_page_document(612.0, 792.0);
        assert_eq!(count_pages(&doc).unwrap(), 1);
    }

    #[test]
    fn test_page_geometry_reads_media_box() {
        let doc = single_page_document(420.5, 713.0);
        let page_id = ordered_page_ids(&doc)[0];
        let geometry = page_geometry(&doc, page_id).unwrap();
        assert!((geometry.width - 420.5).abs() < 0.01);
        assert!((geometry.height - 713.0).abs() < 0.01);
    }

    #[test]
    fn test_page_geometry_inherited_from_parent() {
        let mut doc = single_page_document(612.0, 792.0);
        // Strip the page-level MediaBox and put one on the Pages node instead
        let page_id = ordered_page_ids(&doc)[0];
        let parent_id = {
            let page = doc.get_object_mut(page_id).unwrap().as_dict_mut().unwrap();
            page.remove(b"MediaBox");
            match page.get(b"Parent") {
                Ok(Object::Reference(id)) => *id,
                _ => panic!("page has no parent"),
            }
        };
        let pages = doc
            .get_object_mut(parent_id)
            .unwrap()
            .as_dict_mut()
            .unwrap();
        pages.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(300),
                Object::Integer(500),
            ]),
        );

        let geometry = page_geometry(&doc, page_id).unwrap();
        assert!((geometry.width - 300.0).abs() < 0.01);
        assert!((geometry.height - 500.0).abs() < 0.01);
    }
}
