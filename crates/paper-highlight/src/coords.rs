//! Page-relative coordinates for highlight viewers.
//!
//! Viewers position highlights as fractions of the page size, with 1-indexed
//! page numbers.

use paper_core::{Document, Rect};
use serde::Serialize;

use crate::search::SearchMatch;

/// Page size assumed when the document has no record of a page (US Letter).
pub const DEFAULT_PAGE_SIZE: (f64, f64) = (612.0, 792.0);

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub width: f64,
    pub height: f64,
    pub page_number: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaledPosition {
    pub bounding_rect: ScaledRect,
    pub rects: Vec<ScaledRect>,
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Normalize PDF-point rectangles to `[0, 1]` page fractions.
///
/// `page_number` is 1-indexed. The bounding rect is the union of all rects;
/// with no rects it is all zeros.
pub fn to_scaled_position(rects: &[Rect], page_width: f64, page_height: f64, page_number: usize) -> ScaledPosition {
    let scaled: Vec<ScaledRect> = rects
        .iter()
        .map(|r| {
            let (x1, y1) = (r.x0 / page_width, r.y0 / page_height);
            let (x2, y2) = (r.x1 / page_width, r.y1 / page_height);
            ScaledRect {
                x1: round4(x1),
                y1: round4(y1),
                x2: round4(x2),
                y2: round4(y2),
                width: round4(x2 - x1),
                height: round4(y2 - y1),
                page_number,
            }
        })
        .collect();

    let bounding_rect = match scaled.split_first() {
        Some((first, rest)) => {
            let mut b = *first;
            for r in rest {
                b.x1 = b.x1.min(r.x1);
                b.y1 = b.y1.min(r.y1);
                b.x2 = b.x2.max(r.x2);
                b.y2 = b.y2.max(r.y2);
            }
            b.width = round4(b.x2 - b.x1);
            b.height = round4(b.y2 - b.y1);
            b
        }
        None => ScaledRect {
            page_number,
            ..Default::default()
        },
    };

    ScaledPosition {
        bounding_rect,
        rects: scaled,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightContent {
    pub text: String,
}

/// A search match in the shape a highlight viewer accepts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightPayload {
    pub position: ScaledPosition,
    pub content: HighlightContent,
    pub selected_text: String,
    /// 0-indexed page.
    pub page_index: usize,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

pub fn match_to_json(m: &SearchMatch, doc: &Document) -> HighlightPayload {
    let (width, height) = doc.page_size(m.page).unwrap_or(DEFAULT_PAGE_SIZE);
    let text = m.context.trim().to_string();
    HighlightPayload {
        position: to_scaled_position(&m.rects, width, height, m.page + 1),
        content: HighlightContent { text: text.clone() },
        selected_text: text,
        page_index: m.page,
        kind: "text",
    }
}
