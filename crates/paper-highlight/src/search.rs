//! Text search over PDF pages and parsed sections.

use paper_core::{Document, PageContent, PdfContent, Rect};
use regex::RegexBuilder;
use serde::Serialize;

/// Vertical margin of the context band around a hit, in points.
const CONTEXT_MARGIN: f64 = 30.0;

/// One occurrence of a query on a PDF page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchMatch {
    /// 0-indexed page.
    pub page: usize,
    /// One rectangle per visual line the hit touches, in PDF points.
    pub rects: Vec<Rect>,
    /// Page text in a full-width band around the hit.
    pub context: String,
}

/// Case-insensitive search over every page of the PDF.
pub fn search_pdf(content: &PdfContent, query: &str) -> Vec<SearchMatch> {
    let mut matches = Vec::new();
    for page in &content.pages {
        for rects in page.search(query) {
            let Some(bounds) = Rect::union_all(&rects) else {
                continue;
            };
            matches.push(SearchMatch {
                page: page.number,
                context: context_around(page, &bounds),
                rects,
            });
        }
    }
    tracing::debug!(query, matches = matches.len(), "pdf search");
    matches
}

fn context_around(page: &PageContent, hit: &Rect) -> String {
    let band = Rect::new(
        0.0,
        (hit.y0 - CONTEXT_MARGIN).max(0.0),
        page.width,
        (hit.y1 + CONTEXT_MARGIN).min(page.height),
    );
    page.text_in(&band).trim().to_string()
}

/// A query hit inside a parsed section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionMatch {
    pub section: String,
    pub page: usize,
    /// From the start of the matching line through `context_lines` further
    /// line breaks.
    pub context: String,
    /// Byte offset of the hit in the section content.
    pub match_start: usize,
}

/// Case-insensitive search over section contents, with section context.
pub fn search_in_document(doc: &Document, query: &str, context_lines: usize) -> Vec<SectionMatch> {
    if query.is_empty() {
        return Vec::new();
    }
    let Ok(pattern) = RegexBuilder::new(&regex::escape(query)).case_insensitive(true).build() else {
        return Vec::new();
    };

    let mut matches = Vec::new();
    for section in &doc.sections {
        let text = section.content.as_str();
        for hit in pattern.find_iter(text) {
            let line_start = text[..hit.start()].rfind('\n').map_or(0, |i| i + 1);
            let mut context_end = hit.end();
            for _ in 0..context_lines {
                match text[context_end..].find('\n') {
                    Some(i) => context_end += i + 1,
                    None => {
                        context_end = text.len();
                        break;
                    }
                }
            }
            matches.push(SectionMatch {
                section: section.heading.clone(),
                page: section.page_start,
                context: text[line_start..context_end].trim().to_string(),
                match_start: hit.start(),
            });
        }
    }
    matches
}
