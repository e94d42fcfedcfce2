//! Highlight annotations appended as an incremental update.
//!
//! The output starts with the source bytes unchanged; new annotation objects
//! and the touched page dictionaries follow in a new revision, so existing
//! signatures and the encryption dictionary are left as they were.

use std::path::Path;

use lopdf::{Dictionary, IncrementalDocument, Object, ObjectId, dictionary};
use paper_core::{BackendError, HighlightMark, Rect};

use crate::objects::{PageBox, page_box};

fn write_err(e: impl std::fmt::Display) -> BackendError {
    BackendError::WriteError(e.to_string())
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Annotation dictionary for one mark, one quad per rect.
fn highlight_annot(page_id: ObjectId, page: &PageBox, mark: &HighlightMark, with_note: bool) -> Option<Dictionary> {
    let bounds = Rect::union_all(&mark.rects)?;
    let [llx, lly, urx, ury] = page.to_user_space(&bounds);

    let mut quads = Vec::with_capacity(mark.rects.len() * 8);
    for rect in &mark.rects {
        let [x0, y0, x1, y1] = page.to_user_space(rect);
        // UL, UR, LL, LR
        for v in [x0, y1, x1, y1, x0, y0, x1, y0] {
            quads.push(real(v));
        }
    }

    let mut annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => vec![real(llx), real(lly), real(urx), real(ury)],
        "QuadPoints" => quads,
        "C" => mark.color.iter().map(|&c| Object::Real(c)).collect::<Vec<_>>(),
        "F" => 4_i64,
        "P" => page_id,
    };
    if with_note && !mark.note.is_empty() {
        annot.set("Contents", Object::string_literal(mark.note.as_str()));
    }
    Some(annot)
}

pub(crate) fn write_highlights(source: &Path, output: &Path, marks: &[HighlightMark]) -> Result<(), BackendError> {
    let mut doc = IncrementalDocument::load(source).map_err(|e| BackendError::OpenError(e.to_string()))?;

    // Gather everything needed from the previous revision first
    let (encrypted, targets) = {
        let prev = doc.get_prev_documents();
        let pages = prev.get_pages();
        let mut targets = Vec::new();
        for mark in marks {
            let Some(&page_id) = u32::try_from(mark.page + 1).ok().and_then(|n| pages.get(&n)) else {
                tracing::warn!(page = mark.page, pages = pages.len(), "highlight on a missing page skipped");
                continue;
            };
            let annots_ref = prev
                .get_dictionary(page_id)
                .ok()
                .and_then(|p| p.get(b"Annots").ok())
                .and_then(|a| a.as_reference().ok());
            targets.push((mark, page_id, page_box(prev, page_id), annots_ref));
        }
        (prev.trailer.get(b"Encrypt").is_ok(), targets)
    };
    if encrypted {
        tracing::debug!("encrypted source, highlight notes omitted");
    }

    for (mark, page_id, page, annots_ref) in targets {
        let Some(annot) = highlight_annot(page_id, &page, mark, !encrypted) else {
            continue;
        };
        let annot_id = doc.new_document.add_object(annot);

        match annots_ref {
            Some(array_id) => {
                doc.opt_clone_object_to_new_document(array_id).map_err(write_err)?;
                let array = doc
                    .new_document
                    .get_object_mut(array_id)
                    .and_then(Object::as_array_mut)
                    .map_err(write_err)?;
                array.push(Object::Reference(annot_id));
            }
            None => {
                doc.opt_clone_object_to_new_document(page_id).map_err(write_err)?;
                let page_dict = doc
                    .new_document
                    .get_object_mut(page_id)
                    .and_then(Object::as_dict_mut)
                    .map_err(write_err)?;
                match page_dict.get_mut(b"Annots") {
                    Ok(Object::Array(annots)) => annots.push(Object::Reference(annot_id)),
                    _ => page_dict.set("Annots", vec![Object::Reference(annot_id)]),
                }
            }
        }
    }

    doc.save(output).map_err(write_err)?;
    Ok(())
}
