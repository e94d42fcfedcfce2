use once_cell::sync::Lazy;
use paper_core::{Metadata, PdfInfo, Section};
use regex::Regex;

use crate::lines::Line;
use crate::text_processing::collapse_whitespace;

static ARXIV_BANNER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)arXiv:\d+\.\d+").unwrap());
static ABSTRACT_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:[A-Z0-9]+\.?\s+)?abstract\s*$").unwrap());

/// Best-guess paper metadata from the first page, the PDF info dictionary
/// and the parsed sections.
///
/// The title is the largest-font text on the first page (arXiv banners
/// excluded), continued over directly following lines of the same size; the
/// PDF title is the fallback. Authors come from the PDF author field.
pub fn extract_metadata(lines: &[Line], info: &PdfInfo, sections: &[Section], paper_id: &str) -> Metadata {
    let title = title_from_first_page(lines)
        .or_else(|| info.title.as_deref().map(collapse_whitespace))
        .unwrap_or_default();

    let authors = info
        .author
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();

    let abstract_text = sections
        .iter()
        .find(|s| ABSTRACT_HEADING_RE.is_match(s.heading.trim()))
        .map(|s| collapse_whitespace(&s.content))
        .unwrap_or_default();

    Metadata {
        title,
        authors,
        arxiv_id: paper_id.to_string(),
        url: format!("https://arxiv.org/abs/{paper_id}"),
        abstract_text,
    }
}

fn title_from_first_page(lines: &[Line]) -> Option<String> {
    let candidates: Vec<(usize, &Line)> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.page == 0 && !ARXIV_BANNER_RE.is_match(&l.text))
        .collect();

    let mut largest: Option<(usize, &Line)> = None;
    for &(i, line) in &candidates {
        if largest.is_none_or(|(_, best)| line.font_size > best.font_size) {
            largest = Some((i, line));
        }
    }
    let (first, line) = largest?;

    let mut parts = vec![line.text.trim()];
    for next in &lines[first + 1..] {
        if next.page != 0 || (next.font_size - line.font_size).abs() > 0.05 {
            break;
        }
        parts.push(next.text.trim());
    }
    let title = collapse_whitespace(&parts.join(" "));
    (!title.is_empty()).then_some(title)
}
