//! Section and sentence segmentation over the document text.

use paper_core::{Section, Sentence, Span};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::Language;
use crate::headings::Heading;
use crate::lines::Line;

/// Heading of the single section produced when no headings were detected.
pub const FULL_DOCUMENT_HEADING: &str = "(Full Document)";

/// Abbreviations after which a sentence boundary is spurious.
const ABBREVIATIONS: &[&str] = &[
    "et al.", "e.g.", "i.e.", "fig.", "figs.", "eq.", "eqs.", "cf.", "vs.", "sec.", "resp.",
    "no.", "approx.", "ref.", "refs.", "tab.",
];

/// Split `raw_text` into sections at the heading offsets and fill their
/// sentences.
///
/// Section *i* spans from heading *i* to heading *i + 1*; the last runs to the
/// end. The first section's span also covers any text before its heading
/// (title, authors), so the spans tile the whole document. Content is the
/// trimmed text from the heading on, with the heading itself removed.
pub fn segment_sections(
    raw_text: &str,
    lines: &[Line],
    headings: &[Heading],
    language: Language,
) -> Vec<Section> {
    if headings.is_empty() {
        let (content_start, content) = content_of(raw_text, 0, raw_text.len(), "");
        let page_start = lines.first().map_or(0, |l| l.page);
        return vec![Section {
            heading: FULL_DOCUMENT_HEADING.to_string(),
            level: 1,
            content: content.to_string(),
            sentences: sentences_on_pages(content, content_start, lines, page_start, language),
            spans: vec![Span::new(0, raw_text.len())],
            page_start,
            page_end: lines.last().map_or(0, |l| l.page),
        }];
    }

    let mut sections = Vec::with_capacity(headings.len());
    for (i, heading) in headings.iter().enumerate() {
        let start = if i == 0 { 0 } else { heading.char_start };
        let end = headings
            .get(i + 1)
            .map_or(raw_text.len(), |next| next.char_start)
            .max(start);
        let body_start = heading.char_start.clamp(start, end);
        let (content_start, content) = content_of(raw_text, body_start, end, &heading.text);

        let page_start = heading.page;
        let page_end = lines
            .iter()
            .filter(|l| l.char_start >= start && l.char_start < end)
            .map(|l| l.page)
            .fold(page_start, usize::max);

        sections.push(Section {
            heading: heading.text.clone(),
            level: heading.level,
            content: content.to_string(),
            sentences: sentences_on_pages(content, content_start, lines, page_start, language),
            spans: vec![Span::new(start, end)],
            page_start,
            page_end,
        });
    }
    sections
}

/// Absolute start offset and text of a section's content.
fn content_of<'a>(raw_text: &'a str, start: usize, end: usize, heading: &str) -> (usize, &'a str) {
    let slice = &raw_text[start..end];
    let trimmed_front = slice.trim_start();
    let mut offset = start + (slice.len() - trimmed_front.len());
    let mut content = trimmed_front.trim_end();

    if !heading.is_empty()
        && let Some(rest) = content.strip_prefix(heading)
    {
        let rest_front = rest.trim_start();
        offset += heading.len() + (rest.len() - rest_front.len());
        content = rest_front;
    }
    (offset, content)
}

/// Sentences of a section, each on the page of the line it starts in.
fn sentences_on_pages(
    content: &str,
    content_start: usize,
    lines: &[Line],
    fallback_page: usize,
    language: Language,
) -> Vec<Sentence> {
    let mut sentences = split_sentences(content, content_start, fallback_page, language);
    for sentence in &mut sentences {
        sentence.page = page_at(lines, sentence.span.start).unwrap_or(fallback_page);
    }
    sentences
}

/// Page of the last line starting at or before `offset`.
fn page_at(lines: &[Line], offset: usize) -> Option<usize> {
    let idx = lines.partition_point(|l| l.char_start <= offset);
    idx.checked_sub(1).map(|i| lines[i].page)
}

/// Split section content starting at `content_start` in the document text.
pub fn split_sentences(
    content: &str,
    content_start: usize,
    page: usize,
    language: Language,
) -> Vec<Sentence> {
    sentence_ranges(content, language)
        .into_iter()
        .map(|(s, e)| Sentence {
            text: content[s..e].replace('\n', " "),
            span: Span::new(content_start + s, content_start + e),
            page,
        })
        .collect()
}

/// Byte ranges of the sentences in `text`, trimmed of surrounding whitespace.
pub fn sentence_ranges(text: &str, language: Language) -> Vec<(usize, usize)> {
    // Line breaks inside a paragraph are layout, not sentence boundaries.
    // Same byte length, so offsets carry over.
    let flat = text.replace('\n', " ");

    let raw: Vec<(usize, usize)> = match language {
        Language::Universal => flat
            .split_sentence_bound_indices()
            .map(|(i, s)| (i, i + s.len()))
            .collect(),
        Language::Japanese | Language::Chinese => cjk_ranges(&flat),
    };

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in raw {
        match merged.last_mut() {
            Some(last) if ends_with_abbreviation(&flat[last.0..last.1]) => last.1 = end,
            _ => merged.push((start, end)),
        }
    }

    merged
        .into_iter()
        .filter_map(|(start, end)| trim_range(&flat, start, end))
        .collect()
}

fn trim_range(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let piece = &text[start..end];
    let front = piece.len() - piece.trim_start().len();
    let back = piece.len() - piece.trim_end().len();
    let (s, e) = (start + front, end - back);
    (s < e).then_some((s, e))
}

fn ends_with_abbreviation(piece: &str) -> bool {
    let lower = piece.trim_end().to_lowercase();
    ABBREVIATIONS.iter().any(|abbr| {
        lower.strip_suffix(abbr).is_some_and(|before| {
            before.is_empty() || before.ends_with(|c: char| c.is_whitespace() || c == '(')
        })
    })
}

fn cjk_ranges(text: &str) -> Vec<(usize, usize)> {
    const TERMINALS: &[char] = &['。', '！', '？', '．', '!', '?'];
    const CLOSERS: &[char] = &['」', '』', '）', ')', '"', '”'];

    let mut ranges = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if !TERMINALS.contains(&c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if CLOSERS.contains(&next) || TERMINALS.contains(&next) {
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        ranges.push((start, end));
        start = end;
    }
    if start < text.len() {
        ranges.push((start, text.len()));
    }
    ranges
}
