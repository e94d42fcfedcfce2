//! Outline, link annotations and document info, read with lopdf.
//!
//! Destinations come in three shapes: explicit arrays `[page /XYZ left top
//! zoom]`, names looked up in the catalog's `/Dests` dictionary or the
//! `/Names /Dests` tree, and `GoTo` actions wrapping either. Coordinates are
//! converted to top-left page space to match the glyph geometry.

use std::collections::{BTreeMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};
use paper_core::{LinkTarget, OutlineEntry, PdfInfo, RawLink};

use crate::objects::{
    catalog, decode_text, dict_get, dict_get_dict, dict_text, name_of, number, page_box, page_numbers,
    rect_of, resolve,
};

const MAX_OUTLINE_DEPTH: u32 = 64;
const MAX_OUTLINE_ITEMS: usize = 10_000;

/// A resolved destination: target page and optional `[x, y]` on it.
type Destination = (usize, Option<[f64; 2]>);

pub(crate) struct Structure {
    pub outline: Vec<OutlineEntry>,
    pub links: Vec<RawLink>,
    pub info: PdfInfo,
}

pub(crate) fn read_structure(doc: &Document) -> Structure {
    let pages = page_numbers(doc);
    Structure {
        outline: read_outline(doc, &pages),
        links: read_links(doc, &pages),
        info: read_info(doc),
    }
}

fn read_info(doc: &Document) -> PdfInfo {
    let Some(info) = dict_get_dict(doc, &doc.trailer, b"Info") else {
        return PdfInfo::default();
    };
    let field = |key: &[u8]| {
        dict_text(doc, info, key)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    PdfInfo {
        title: field(b"Title"),
        author: field(b"Author"),
    }
}

fn read_outline(doc: &Document, pages: &BTreeMap<ObjectId, usize>) -> Vec<OutlineEntry> {
    let first = catalog(doc)
        .and_then(|c| dict_get_dict(doc, c, b"Outlines"))
        .and_then(|o| o.get(b"First").ok())
        .and_then(|f| f.as_reference().ok());
    let mut entries = Vec::new();
    if let Some(first) = first {
        let mut visited = HashSet::new();
        walk_outline(doc, first, 1, pages, &mut visited, &mut entries);
    }
    entries
}

fn walk_outline(
    doc: &Document,
    first: ObjectId,
    level: u32,
    pages: &BTreeMap<ObjectId, usize>,
    visited: &mut HashSet<ObjectId>,
    entries: &mut Vec<OutlineEntry>,
) {
    if level > MAX_OUTLINE_DEPTH {
        return;
    }
    let mut current = Some(first);
    while let Some(id) = current {
        if !visited.insert(id) || visited.len() > MAX_OUTLINE_ITEMS {
            break;
        }
        let Ok(item) = doc.get_dictionary(id) else {
            break;
        };

        let title = dict_text(doc, item, b"Title").unwrap_or_default();
        match item_destination(doc, item, pages) {
            Some((page, _)) => entries.push(OutlineEntry {
                level,
                title: title.trim().to_string(),
                page,
            }),
            None => tracing::debug!(title = %title, "outline entry without a page target"),
        }

        if let Ok(Object::Reference(child)) = item.get(b"First") {
            walk_outline(doc, *child, level + 1, pages, visited, entries);
        }
        current = item.get(b"Next").ok().and_then(|n| n.as_reference().ok());
    }
}

/// Destination of an outline item or link: `/Dest`, else a `GoTo` action.
fn item_destination(doc: &Document, item: &Dictionary, pages: &BTreeMap<ObjectId, usize>) -> Option<Destination> {
    if let Some(dest) = dict_get(doc, item, b"Dest") {
        return resolve_dest(doc, dest, pages);
    }
    let action = dict_get_dict(doc, item, b"A")?;
    if action.get(b"S").ok().and_then(name_of) != Some(b"GoTo".as_slice()) {
        return None;
    }
    resolve_dest(doc, dict_get(doc, action, b"D")?, pages)
}

fn resolve_dest(doc: &Document, dest: &Object, pages: &BTreeMap<ObjectId, usize>) -> Option<Destination> {
    match resolve(doc, dest)? {
        Object::Array(arr) => explicit_dest(doc, arr, pages),
        Object::String(bytes, _) => named_dest(doc, &decode_text(bytes), pages),
        Object::Name(name) => named_dest(doc, &String::from_utf8_lossy(name), pages),
        Object::Dictionary(d) => resolve_dest(doc, d.get(b"D").ok()?, pages),
        _ => None,
    }
}

fn explicit_dest(doc: &Document, arr: &[Object], pages: &BTreeMap<ObjectId, usize>) -> Option<Destination> {
    let page_id = arr.first()?.as_reference().ok()?;
    let page = *pages.get(&page_id)?;
    let geometry = page_box(doc, page_id);

    let coord = |i: usize| arr.get(i).and_then(|o| resolve(doc, o)).and_then(number);
    let (left, top) = match arr.get(1).and_then(name_of) {
        Some(b"XYZ") => (coord(2), coord(3)),
        Some(b"FitH") | Some(b"FitBH") => (None, coord(2)),
        Some(b"FitR") => (coord(2), coord(5)),
        _ => (None, None),
    };
    let xy = top.map(|top| [left.map_or(0.0, |x| geometry.shift_x(x)), geometry.flip_y(top)]);
    Some((page, xy))
}

fn named_dest(doc: &Document, name: &str, pages: &BTreeMap<ObjectId, usize>) -> Option<Destination> {
    let catalog = catalog(doc)?;
    let target = dict_get_dict(doc, catalog, b"Names")
        .and_then(|names| dict_get_dict(doc, names, b"Dests"))
        .and_then(|tree| lookup_name_tree(doc, tree, name, 0))
        .or_else(|| {
            dict_get_dict(doc, catalog, b"Dests")
                .and_then(|dests| dict_get(doc, dests, name.as_bytes()))
        })?;
    // Guard against a name that maps back to itself
    match resolve(doc, target)? {
        Object::String(..) | Object::Name(_) => None,
        other => resolve_dest(doc, other, pages),
    }
}

fn lookup_name_tree<'a>(doc: &'a Document, node: &'a Dictionary, name: &str, depth: u32) -> Option<&'a Object> {
    if depth > 32 {
        return None;
    }
    if let Some(names) = dict_get(doc, node, b"Names").and_then(|n| n.as_array().ok()) {
        for pair in names.chunks_exact(2) {
            let key = resolve(doc, &pair[0]).and_then(|k| match k {
                Object::String(bytes, _) => Some(decode_text(bytes)),
                _ => None,
            });
            if key.as_deref() == Some(name) {
                return Some(&pair[1]);
            }
        }
    }
    let kids = dict_get(doc, node, b"Kids").and_then(|k| k.as_array().ok())?;
    kids.iter()
        .filter_map(|kid| resolve(doc, kid)?.as_dict().ok())
        .find_map(|kid| lookup_name_tree(doc, kid, name, depth + 1))
}

fn read_links(doc: &Document, pages: &BTreeMap<ObjectId, usize>) -> Vec<RawLink> {
    let mut links = Vec::new();
    for (&page_id, &page) in pages {
        let Ok(page_dict) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Some(annots) = dict_get(doc, page_dict, b"Annots").and_then(|a| a.as_array().ok()) else {
            continue;
        };
        let geometry = page_box(doc, page_id);

        for annot in annots {
            let Some(annot) = resolve(doc, annot).and_then(|a| a.as_dict().ok()) else {
                continue;
            };
            if annot.get(b"Subtype").ok().and_then(name_of) != Some(b"Link".as_slice()) {
                continue;
            }
            let Some([a, b, c, d]) = rect_of(doc, annot, b"Rect") else {
                continue;
            };
            let Some(target) = link_target(doc, annot, pages) else {
                continue;
            };
            links.push(RawLink {
                page,
                rect: geometry.to_top_left(a, b, c, d),
                target,
            });
        }
    }
    links.sort_by_key(|l| l.page);
    links
}

fn link_target(doc: &Document, annot: &Dictionary, pages: &BTreeMap<ObjectId, usize>) -> Option<LinkTarget> {
    let (dest, action_uri) = match dict_get_dict(doc, annot, b"A") {
        Some(action) => match action.get(b"S").ok().and_then(name_of) {
            Some(b"URI") => (None, dict_text(doc, action, b"URI")),
            Some(b"GoTo") => (dict_get(doc, action, b"D"), None),
            _ => (None, None),
        },
        None => (dict_get(doc, annot, b"Dest"), None),
    };
    if let Some(uri) = action_uri {
        return Some(LinkTarget::Uri(uri));
    }

    let dest = dest?;
    let name = match dest {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    };
    let resolved = resolve_dest(doc, dest, pages);
    Some(match name {
        Some(name) => LinkTarget::Named {
            name,
            page: resolved.map(|(p, _)| p),
            xy: resolved.and_then(|(_, xy)| xy),
        },
        None => {
            let (page, xy) = resolved?;
            LinkTarget::Page { page, xy }
        }
    })
}
