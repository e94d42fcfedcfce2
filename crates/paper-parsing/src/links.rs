//! Link and citation extraction.
//!
//! Link annotations come in three flavours: URIs (external), page jumps
//! (internal) and named destinations. LaTeX emits citations as named
//! destinations called `cite.<key>`, and a single citation such as
//! `(Kingma & Ba, 2015)` is often split into several rectangles, sometimes
//! across a line break. Consecutive fragments with the same destination on the
//! same page are stitched back into one occurrence.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use paper_core::{Link, LinkKind, LinkTarget, PdfContent, RawLink, Rect, Span};
use regex::Regex;

use crate::lines::Line;
use crate::text_processing::normalize_anchor_text;

/// Numeric citation markers: `[1]`, `[2, 3]`, `[1–5]`, `[4; 7]`.
static NUMERIC_CITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+(?:\s*[,;–-]\s*\d+)*)\]").unwrap());

/// Prefix LaTeX uses for bibliography destinations.
pub const CITATION_DEST_PREFIX: &str = "cite.";

/// First line on `page` whose bbox intersects `rect`.
pub fn find_anchor_line<'a>(lines: &'a [Line], page: usize, rect: &Rect) -> Option<&'a Line> {
    lines
        .iter()
        .find(|l| l.page == page && l.bbox.intersects(rect))
}

fn anchor(lines: &[Line], page: usize, rect: &Rect) -> (String, Span) {
    match find_anchor_line(lines, page, rect) {
        Some(line) => (line.text.clone(), Span::new(line.char_start, line.char_end)),
        None => (String::new(), Span::new(0, 0)),
    }
}

struct NamedFragment {
    name: String,
    page: usize,
    rect: Rect,
    target_page: Option<usize>,
    target_xy: Option<[f64; 2]>,
}

/// Accumulates raw link annotations and finalizes them into [`Link`]s.
pub struct LinkCollector<'a> {
    content: &'a PdfContent,
    lines: &'a [Line],
    links: Vec<Link>,
    seen_urls: HashSet<String>,
    seen_pages: HashSet<usize>,
    named: Vec<NamedFragment>,
}

impl<'a> LinkCollector<'a> {
    pub fn new(content: &'a PdfContent, lines: &'a [Line]) -> Self {
        Self {
            content,
            lines,
            links: Vec::new(),
            seen_urls: HashSet::new(),
            seen_pages: HashSet::new(),
            named: Vec::new(),
        }
    }

    pub fn push(&mut self, raw: &RawLink) {
        match &raw.target {
            LinkTarget::Uri(url) => {
                if url.is_empty() || !self.seen_urls.insert(url.clone()) {
                    return;
                }
                let (text, span) = anchor(self.lines, raw.page, &raw.rect);
                self.links.push(Link {
                    kind: LinkKind::External,
                    text,
                    url: url.clone(),
                    target_page: None,
                    page: raw.page,
                    span,
                    target_xy: None,
                    dest_name: String::new(),
                });
            }
            LinkTarget::Page { page, xy } => {
                if !self.seen_pages.insert(*page) {
                    return;
                }
                let (text, span) = anchor(self.lines, raw.page, &raw.rect);
                self.links.push(Link {
                    kind: LinkKind::Internal,
                    text,
                    url: String::new(),
                    target_page: Some(*page),
                    page: raw.page,
                    span,
                    target_xy: *xy,
                    dest_name: String::new(),
                });
            }
            LinkTarget::Named { name, page, xy } => {
                if name.is_empty() {
                    return;
                }
                self.named.push(NamedFragment {
                    name: name.clone(),
                    page: raw.page,
                    rect: raw.rect,
                    target_page: *page,
                    target_xy: *xy,
                });
            }
        }
    }

    /// Group named fragments and return every collected link.
    pub fn finish(mut self) -> Vec<Link> {
        let named = std::mem::take(&mut self.named);
        let mut seen_dests: HashSet<&str> = HashSet::new();

        let mut i = 0;
        while i < named.len() {
            let first = &named[i];
            let mut j = i + 1;
            while j < named.len() && named[j].name == first.name && named[j].page == first.page {
                j += 1;
            }
            let group = &named[i..j];
            i = j;

            let is_citation = first.name.starts_with(CITATION_DEST_PREFIX);
            // Every citation occurrence is kept; other destinations once
            if !seen_dests.insert(first.name.as_str()) && !is_citation {
                continue;
            }

            let page = self.content.page(first.page);
            let parts: Vec<String> = group
                .iter()
                .filter_map(|f| page.map(|p| p.text_in(&f.rect)))
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            let text = normalize_anchor_text(&parts.join(" "));

            // Union of first and last fragment lines covers citations that
            // wrap onto the next line
            let (_, first_span) = anchor(self.lines, first.page, &first.rect);
            let span = match group.last() {
                Some(last) if group.len() > 1 => {
                    let (_, last_span) = anchor(self.lines, last.page, &last.rect);
                    Span::new(first_span.start, first_span.end.max(last_span.end))
                }
                _ => first_span,
            };

            self.links.push(Link {
                kind: if is_citation {
                    LinkKind::Citation
                } else {
                    LinkKind::Internal
                },
                text,
                url: String::new(),
                target_page: first.target_page,
                page: first.page,
                span,
                target_xy: first.target_xy,
                dest_name: first.name.clone(),
            });
        }
        self.links
    }
}

/// Extract all links of a document in annotation order.
pub fn extract_links(content: &PdfContent, lines: &[Line]) -> Vec<Link> {
    let mut collector = LinkCollector::new(content, lines);
    for raw in &content.links {
        collector.push(raw);
    }
    collector.finish()
}

/// Find numeric citation markers in the document text.
///
/// Each distinct marker is reported once, at its first occurrence. The page is
/// not resolved and is always 0.
pub fn detect_numeric_citations(raw_text: &str) -> Vec<Link> {
    let mut seen: HashSet<&str> = HashSet::new();
    NUMERIC_CITATION_RE
        .find_iter(raw_text)
        .filter(|m| seen.insert(m.as_str()))
        .map(|m| Link {
            kind: LinkKind::Citation,
            text: m.as_str().to_string(),
            url: String::new(),
            target_page: None,
            page: 0,
            span: Span::new(m.start(), m.end()),
            target_xy: None,
            dest_name: String::new(),
        })
        .collect()
}
