//! Small helpers over lopdf's object model.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};
use paper_core::Rect;

/// Follow one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn dict_get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

pub(crate) fn dict_get_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict_get(doc, dict, key)?.as_dict().ok()
}

pub(crate) fn name_of(obj: &Object) -> Option<&[u8]> {
    match obj {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, else UTF-8, else Latin-1.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

pub(crate) fn text_of(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

pub(crate) fn dict_text(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    text_of(dict_get(doc, dict, key)?)
}

pub(crate) fn catalog(doc: &Document) -> Option<&Dictionary> {
    dict_get_dict(doc, &doc.trailer, b"Root")
}

/// Visible page box in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    const LETTER: PageBox = PageBox {
        x0: 0.0,
        y0: 0.0,
        x1: 612.0,
        y1: 792.0,
    };

    /// User-space rectangle `[llx lly urx ury]` to top-left page coordinates.
    pub fn to_top_left(&self, llx: f64, lly: f64, urx: f64, ury: f64) -> Rect {
        Rect::new(
            llx.min(urx) - self.x0,
            self.y1 - lly.max(ury),
            llx.max(urx) - self.x0,
            self.y1 - lly.min(ury),
        )
    }

    /// Top-left page rectangle back to user space `[llx lly urx ury]`.
    pub fn to_user_space(&self, rect: &Rect) -> [f64; 4] {
        [
            rect.x0 + self.x0,
            self.y1 - rect.y1,
            rect.x1 + self.x0,
            self.y1 - rect.y0,
        ]
    }

    pub fn flip_y(&self, y: f64) -> f64 {
        self.y1 - y
    }

    pub fn shift_x(&self, x: f64) -> f64 {
        x - self.x0
    }
}

fn rect_array(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let arr = resolve(doc, obj)?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, item) in out.iter_mut().zip(arr) {
        *slot = number(resolve(doc, item)?)?;
    }
    Some(out)
}

pub(crate) fn rect_of(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<[f64; 4]> {
    rect_array(doc, dict.get(key).ok()?)
}

/// CropBox, else MediaBox, inherited through `/Parent`; US Letter when
/// neither is present.
pub(crate) fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let mut media = None;
    let mut crop = None;
    let mut current = doc.get_dictionary(page_id).ok();
    let mut depth = 0;
    while let Some(dict) = current {
        if crop.is_none() {
            crop = rect_of(doc, dict, b"CropBox");
        }
        if media.is_none() {
            media = rect_of(doc, dict, b"MediaBox");
        }
        if (crop.is_some() && media.is_some()) || depth > 32 {
            break;
        }
        depth += 1;
        current = dict_get_dict(doc, dict, b"Parent");
    }
    crop.or(media).map_or(PageBox::LETTER, |[a, b, c, d]| PageBox {
        x0: a.min(c),
        y0: b.min(d),
        x1: a.max(c),
        y1: b.max(d),
    })
}

/// Page object id → 0-indexed page number.
pub(crate) fn page_numbers(doc: &Document) -> BTreeMap<ObjectId, usize> {
    doc.get_pages()
        .into_iter()
        .map(|(n, id)| (id, n as usize - 1))
        .collect()
}
