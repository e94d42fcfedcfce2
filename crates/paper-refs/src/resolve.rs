//! Bibliography entry text behind a citation.
//!
//! LaTeX citation links jump to the bibliography page, so the entry is found by
//! looking for the first author's surname on that page. Two-column reference
//! lists mention co-authors mid-line ("Smith, J. and Vaswani, A."), so only
//! hits at the start of a column count. Numeric citations without a target
//! page fall back to the parsed references section.

use once_cell::sync::Lazy;
use paper_core::{Document, Link, PageContent, PdfContent, Rect};
use regex::Regex;

use crate::citation::{citation_number, citation_surname, citation_year};

/// Height of the text band clipped below a matched surname.
const BAND_HEIGHT: f64 = 41.0;
/// Hits left of this x are at the left column margin.
const LEFT_MARGIN_MAX: f64 = 100.0;
/// Tolerance around the estimated right-column start.
const COLUMN_TOLERANCE: f64 = 50.0;

static ENTRY_START_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:\[\d+\]|\d+\.\s)").unwrap());
static REFERENCES_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)reference|bibliography").unwrap());

/// Resolve the bibliography text of a citation link.
///
/// `content` is the PDF content the document was parsed from; without it only
/// the references-section fallback runs. `None` means the entry could not be
/// found.
pub fn resolve_citation_text(doc: &Document, link: &Link, content: Option<&PdfContent>) -> Option<String> {
    if let (Some(target), Some(content)) = (link.target_page, content) {
        if let Some(text) = content.page(target).and_then(|page| resolve_on_page(page, link)) {
            return Some(text);
        }
        tracing::debug!(citation = %link.text, page = target, "no margin hit on target page");
    }
    resolve_from_references(doc, link)
}

fn right_column_start(page: &PageContent) -> f64 {
    page.width / 2.0 - 20.0
}

fn at_column_margin(page: &PageContent, rect: &Rect) -> bool {
    rect.x0 < LEFT_MARGIN_MAX || (rect.x0 - right_column_start(page)).abs() <= COLUMN_TOLERANCE
}

fn is_two_column(page: &PageContent) -> bool {
    let right = right_column_start(page) - COLUMN_TOLERANCE;
    page.lines.iter().any(|l| l.bbox.x0 >= right && l.bbox.x0 > LEFT_MARGIN_MAX)
}

/// Text band of the entry starting at `hit`, limited to the hit's column.
fn entry_band(page: &PageContent, hit: &Rect) -> String {
    let in_right_column = hit.x0 >= LEFT_MARGIN_MAX;
    let (x0, x1) = if in_right_column {
        (hit.x0 - 2.0, page.width)
    } else if is_two_column(page) {
        (0.0, right_column_start(page))
    } else {
        (0.0, page.width)
    };
    let clip = Rect::new(x0, hit.y0 - 1.0, x1, hit.y0 + BAND_HEIGHT);
    page.text_in(&clip).split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve_on_page(page: &PageContent, link: &Link) -> Option<String> {
    let surname = citation_surname(&link.text)?;
    let year = citation_year(&link.text);

    let mut hits = page.search(&format!("{surname},"));
    if hits.is_empty() {
        hits = page.search(surname);
    }
    let candidates: Vec<Rect> = hits
        .iter()
        .filter_map(|rects| rects.first().copied())
        .filter(|r| at_column_margin(page, r))
        .collect();

    let bands: Vec<String> = candidates.iter().map(|r| entry_band(page, r)).collect();
    let chosen = match year {
        Some(year) if bands.len() > 1 => bands
            .iter()
            .find(|b| b.contains(year))
            .or_else(|| bands.first()),
        _ => bands.first(),
    }?;

    let start = chosen.find(surname)?;
    let text = chosen[start..].trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn resolve_from_references(doc: &Document, link: &Link) -> Option<String> {
    let number = citation_number(&link.text)?;
    let section = doc
        .sections
        .iter()
        .rev()
        .find(|s| REFERENCES_HEADING_RE.is_match(&s.heading))?;

    let bracket = format!("[{number}]");
    let dotted = format!("{number}. ");
    let mut lines = section.content.lines().skip_while(|line| {
        let line = line.trim_start();
        !(line.starts_with(&bracket) || line.starts_with(&dotted))
    });

    let mut entry = vec![lines.next()?.trim()];
    entry.extend(
        lines
            .take_while(|line| !ENTRY_START_RE.is_match(line))
            .map(str::trim),
    );
    let text = entry.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
    Some(text)
}
