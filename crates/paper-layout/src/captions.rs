//! Labels and captions for detected elements.

use once_cell::sync::Lazy;
use paper_core::{LayoutElement, LayoutKind, PageContent, Rect};
use regex::Regex;

static CAPTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:Figure|Fig\.|Table)\s+\d+").unwrap());

const MAX_CAPTION_CHARS: usize = 200;

/// Number elements per kind in their current order: `Figure 1`, `Table 1`,
/// `Eq. 1`, `Figure 2`...
pub fn assign_labels(elements: &mut [LayoutElement]) {
    let (mut figures, mut tables, mut equations) = (0, 0, 0);
    for element in elements {
        let counter = match element.kind {
            LayoutKind::Figure => &mut figures,
            LayoutKind::Table => &mut tables,
            LayoutKind::Equation => &mut equations,
        };
        *counter += 1;
        element.label = format!("{} {}", element.kind.label_prefix(), counter);
    }
}

/// Caption text near a figure (below it) or table (above it).
///
/// The band spans the element's width and `band` points vertically. Only
/// text starting with `Figure N`, `Fig. N` or `Table N` counts.
pub fn extract_caption(page: &PageContent, element: &LayoutElement, band: f64) -> Option<String> {
    let b = &element.bbox;
    let clip = match element.kind {
        LayoutKind::Figure => Rect::new(b.x0, b.y1, b.x1, (b.y1 + band).min(page.height)),
        LayoutKind::Table => Rect::new(b.x0, (b.y0 - band).max(0.0), b.x1, b.y0),
        LayoutKind::Equation => return None,
    };

    let text = page.text_in(&clip);
    let text = text.trim();
    if !CAPTION_RE.is_match(text) {
        return None;
    }
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    Some(collapsed.chars().take(MAX_CAPTION_CHARS).collect())
}
