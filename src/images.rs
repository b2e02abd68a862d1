//! Discovery of the image XObjects a page draws.
//!
//! Images are found through the page's `/Resources /XObject` dictionary, with
//! `/Resources` inherited from ancestor page-tree nodes when the page has none.
//! Form XObjects are walked recursively so images nested in forms are found as
//! well. Inline images are not XObjects and are never reported.

use crate::formats::{resolve, ImageEncoding, PdfColorSpace};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;

/// Limit on how many page-tree ancestors are consulted for inherited resources.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// One image XObject as seen from the page that first draws it.
#[derive(Debug, Clone)]
pub struct ImageRef {
    pub id: ObjectId,
    pub page: u32,
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
    pub color_space: String,
    pub bits_per_component: u8,
    pub is_mask: bool,
    pub stream_len: usize,
}

impl ImageRef {
    pub fn from_stream(doc: &Document, id: ObjectId, page: u32, stream: &Stream) -> Self {
        let dict = &stream.dict;
        let is_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
        let color_space = if is_mask {
            "stencil".to_string()
        } else {
            dict.get(b"ColorSpace")
                .map(|cs| PdfColorSpace::from_object(doc, cs).to_string())
                .unwrap_or_else(|_| "none".to_string())
        };

        Self {
            id,
            page,
            width: dict_u32(dict, b"Width"),
            height: dict_u32(dict, b"Height"),
            encoding: ImageEncoding::from_dict(dict),
            color_space,
            bits_per_component: if is_mask {
                1
            } else {
                dict_u32(dict, b"BitsPerComponent").min(u8::MAX as u32) as u8
            },
            is_mask,
            stream_len: stream.content.len(),
        }
    }

    pub fn largest_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Reads a non-negative integer entry, falling back to 0.
pub fn dict_u32(dict: &Dictionary, key: &[u8]) -> u32 {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .filter(|v| *v >= 0)
        .map(|v| v.min(u32::MAX as i64) as u32)
        .unwrap_or(0)
}

pub fn is_image_stream(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
}

fn is_form_stream(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Form")
}

/// Returns the image XObject ids drawn by a page, in resource order, without
/// duplicates.
pub fn collect_page_images(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    let Some(resources) = page_resources(doc, page_id) else {
        return images;
    };

    for xobject_id in xobject_ids(doc, resources) {
        collect_recursive(doc, xobject_id, &mut images, &mut seen);
    }

    images
}

/// Collects every image in the document, grouped by the first page that uses
/// it. Images shared between pages are reported once.
pub fn collect_document_images(doc: &Document) -> Vec<ImageRef> {
    let mut reported = HashSet::new();
    let mut result = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        for image_id in collect_page_images(doc, page_id) {
            if !reported.insert(image_id) {
                continue;
            }
            if let Ok(Object::Stream(stream)) = doc.get_object(image_id) {
                result.push(ImageRef::from_stream(doc, image_id, page_number, stream));
            }
        }
    }

    result
}

fn collect_recursive(
    doc: &Document,
    obj_id: ObjectId,
    images: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
) {
    if !seen.insert(obj_id) {
        return;
    }

    let Ok(Object::Stream(stream)) = doc.get_object(obj_id) else {
        return;
    };

    if is_image_stream(stream) {
        images.push(obj_id);
    } else if is_form_stream(stream) {
        if let Ok(resources) = stream.dict.get(b"Resources") {
            for child in xobject_ids(doc, resources) {
                collect_recursive(doc, child, images, seen);
            }
        }
    }
}

/// Finds the `/Resources` entry that applies to a page, walking up `/Parent`
/// links for inherited resources.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;

    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            return Some(resources);
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }

    None
}

fn xobject_ids(doc: &Document, resources: &Object) -> Vec<ObjectId> {
    let Some(Object::Dictionary(resources)) = resolve(doc, resources) else {
        return Vec::new();
    };
    let Some(Object::Dictionary(xobjects)) = resources
        .get(b"XObject")
        .ok()
        .and_then(|x| resolve(doc, x))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, value)| value.as_reference().ok())
        .collect()
}
