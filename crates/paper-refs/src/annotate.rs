//! Inline `[ref=cN]` tags for citations.
//!
//! A citation's visible text is often split across a sentence boundary by the
//! segmenter, e.g. `( Houlsby et al.` ends one sentence and `, 2019 )` starts
//! the next. Each fragment is offered every citation whose span it overlaps;
//! a citation is tagged in the first fragment where its end can be located
//! and is skipped from then on.

use std::collections::HashSet;

use paper_core::{Document, Link};

use crate::citation::{citation_surname, citation_year, word_matches};
use crate::registry::{RefKind, RefRegistry};

/// How far past the surname the year may appear.
const YEAR_WINDOW: usize = 150;

/// Offset in `text` right after the visible end of `link`, or `None` when the
/// citation cannot be located in this fragment.
///
/// Tried in order:
/// 1. surname at a word boundary followed within [`YEAR_WINDOW`] bytes by the
///    year; the position skips closing brackets and whitespace after the year
/// 2. when the surname is absent, a year that occurs exactly once
/// 3. the literal bracket marker of a numeric citation
pub fn find_cite_end(text: &str, link: &Link) -> Option<usize> {
    let surname = citation_surname(&link.text);
    let year = citation_year(&link.text);

    let mut surname_found = false;
    if let Some(surname) = surname {
        for start in word_matches(text, surname) {
            surname_found = true;
            let Some(year) = year else { break };
            let after = start + surname.len();
            let window_end = floor_char_boundary(text, after + YEAR_WINDOW);
            if let Some(pos) = year_matches(&text[after..window_end], year).next() {
                return Some(skip_closers(text, after + pos + year.len()));
            }
        }
    }

    if !surname_found && let Some(year) = year {
        let mut hits = year_matches(text, year);
        if let (Some(pos), None) = (hits.next(), hits.next()) {
            return Some(pos + year.len());
        }
    }

    if link.text.starts_with('[') {
        return text.find(link.text.as_str()).map(|pos| pos + link.text.len());
    }
    None
}

fn year_matches<'a>(text: &'a str, year: &'a str) -> impl Iterator<Item = usize> + 'a {
    text.match_indices(year).filter_map(move |(pos, _)| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + year.len()..].chars().next();
        let bounded = !before.is_some_and(|c| c.is_ascii_digit())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric());
        bounded.then_some(pos)
    })
}

fn skip_closers(text: &str, mut pos: usize) -> usize {
    for c in text[pos..].chars() {
        if c == ')' || c == ']' || c.is_whitespace() {
            pos += c.len_utf8();
        } else {
            break;
        }
    }
    pos
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Insert `[ref=cN]` tags into one fragment of document text.
///
/// `span_start..span_end` is the fragment's range in `doc.raw_text`. Citations
/// placed here are added to `seen_refs`; citations that cannot be placed stay
/// out of it so a later fragment covering the same span can claim them.
pub fn annotate_text(
    text: &str,
    doc: &Document,
    registry: &RefRegistry,
    span_start: usize,
    span_end: usize,
    seen_refs: &mut HashSet<String>,
) -> String {
    let mut placements: Vec<(usize, &str)> = Vec::new();
    for link in doc.citations() {
        if !link.span.overlaps(span_start, span_end) {
            continue;
        }
        let Some(ref_id) = registry.citation_id(link) else {
            continue;
        };
        if seen_refs.contains(ref_id) || placements.iter().any(|(_, id)| *id == ref_id) {
            continue;
        }
        if let Some(pos) = find_cite_end(text, link) {
            placements.push((pos, ref_id));
        }
    }

    // Right to left so earlier offsets stay valid
    placements.sort_by(|a, b| b.0.cmp(&a.0));
    let mut out = text.to_string();
    for (pos, ref_id) in placements {
        out.insert_str(pos, &format!("[ref={ref_id}]"));
        seen_refs.insert(ref_id.to_string());
    }
    out
}

/// Annotate every sentence of the document in reading order, one list of
/// sentences per section.
pub fn annotate_document(doc: &Document, registry: &RefRegistry) -> Vec<Vec<String>> {
    let mut seen = HashSet::new();
    let annotated: Vec<Vec<String>> = doc
        .sections
        .iter()
        .map(|section| {
            section
                .sentences
                .iter()
                .map(|s| annotate_text(&s.text, doc, registry, s.span.start, s.span.end, &mut seen))
                .collect()
        })
        .collect();

    let total = registry.of_kind(RefKind::Citation).count();
    if seen.len() < total {
        tracing::debug!(placed = seen.len(), total, "some citations could not be placed inline");
    }
    annotated
}
