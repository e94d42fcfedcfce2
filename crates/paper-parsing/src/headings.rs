//! Heading detection.
//!
//! Two strategies, tried in order:
//!
//! 1. **Outline**: when the PDF carries a table of contents with at least
//!    [`ParsingConfig::min_outline_entries`] entries, each entry is matched to a
//!    line on its target page.
//! 2. **Fonts**: lines noticeably larger than the body font, plus bold
//!    body-sized lines shaped like section headings.
//!
//! Font-derived candidates pass through an ordered table of rejection rules
//! ([`false_positive_verdict`]), and split headings such as `"1"` +
//! `"Introduction"` are stitched back together by [`merge_fragments`].

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use paper_core::OutlineEntry;
use regex::Regex;

use crate::config::ParsingConfig;
use crate::lines::Line;

static ARXIV_HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)arXiv:\d+\.\d+").unwrap());
static SECTION_NUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]?\.?\d*\.?\d*$").unwrap());
static FIGURE_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(Figure|Table|Fig\.)\s+\d+").unwrap());
static NUMBERED_PERIOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s").unwrap());
static NUMERIC_DATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s.,\-+%]+$").unwrap());
static NUMBERED_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]?\d*\.?\d*\s+[A-Z]").unwrap());

const AUTHOR_SYMBOLS: &[char] = &['∗', '†', '♣', '♢', '♠', '♦', '♯', '♮'];

/// A detected heading anchored in the document text.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub text: String,
    pub level: u32,
    pub page: usize,
    pub char_start: usize,
    pub char_end: usize,
    /// `None` for outline-derived headings.
    pub font_size: Option<f64>,
}

/// Where the headings of a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingSource {
    Outline,
    Fonts,
}

/// Why a heading candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    ArxivBanner,
    Caption,
    TooLong,
    MidSentenceColon,
    SentenceFinalPeriod,
    MultiSentence,
    NumericData,
    AuthorSymbols,
    TrailingPunctuation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accept(self) -> bool {
        self == Verdict::Accept
    }
}

type Rule = fn(&str, &ParsingConfig) -> bool;

fn arxiv_banner(text: &str, _: &ParsingConfig) -> bool {
    ARXIV_HEADER_RE.is_match(text)
}

fn caption(text: &str, _: &ParsingConfig) -> bool {
    FIGURE_TABLE_RE.is_match(text)
}

fn too_long(text: &str, config: &ParsingConfig) -> bool {
    text.chars().count() > config.max_heading_chars
}

// "Example: the model predicted ..."
fn mid_sentence_colon(text: &str, _: &ParsingConfig) -> bool {
    text.find(": ").is_some_and(|idx| text.len() - idx > 4)
}

fn sentence_final_period(text: &str, _: &ParsingConfig) -> bool {
    text.ends_with('.') && !NUMBERED_PERIOD_RE.is_match(text)
}

fn multi_sentence(text: &str, _: &ParsingConfig) -> bool {
    text.contains(". ") && text.chars().count() > 60
}

// "88.0 81.1" is table data, "4.1" is a section number
fn numeric_data(text: &str, _: &ParsingConfig) -> bool {
    if !NUMERIC_DATA_RE.is_match(text) {
        return false;
    }
    let stripped = text.trim();
    !(is_section_number(stripped) && stripped.chars().count() <= 3)
}

fn author_symbols(text: &str, _: &ParsingConfig) -> bool {
    text.contains(AUTHOR_SYMBOLS)
}

fn trailing_punctuation(text: &str, _: &ParsingConfig) -> bool {
    text.ends_with([',', '?', '-'])
}

static FALSE_POSITIVE_RULES: &[(RejectReason, Rule)] = &[
    (RejectReason::ArxivBanner, arxiv_banner),
    (RejectReason::Caption, caption),
    (RejectReason::TooLong, too_long),
    (RejectReason::MidSentenceColon, mid_sentence_colon),
    (RejectReason::SentenceFinalPeriod, sentence_final_period),
    (RejectReason::MultiSentence, multi_sentence),
    (RejectReason::NumericData, numeric_data),
    (RejectReason::AuthorSymbols, author_symbols),
    (RejectReason::TrailingPunctuation, trailing_punctuation),
];

/// Run the rejection rules in order; the first match decides.
pub fn false_positive_verdict(text: &str, config: &ParsingConfig) -> Verdict {
    FALSE_POSITIVE_RULES
        .iter()
        .find(|(_, rule)| rule(text, config))
        .map_or(Verdict::Accept, |(reason, _)| Verdict::Reject(*reason))
}

/// Bare section-number token: `"3"`, `"4.1"`, `"A"`, `"B.1"`.
pub fn is_section_number(text: &str) -> bool {
    SECTION_NUM_RE.is_match(text)
}

/// Which heading pattern a line matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingShape {
    /// `"1 Introduction"`, `"2.1 Data"`, `"A Appendix"`
    Numbered,
    /// Short capitalised text containing a known section keyword
    Keyword,
    /// `"3"`, `"B.1"`
    BareNumber,
    /// Short Title Case phrase without sentence punctuation
    TitleCase,
}

/// Classify `text` as a plausible section heading, or `None`.
pub fn heading_shape(text: &str, config: &ParsingConfig) -> Option<HeadingShape> {
    let text = text.trim();
    if NUMBERED_HEADING_RE.is_match(text) {
        return Some(HeadingShape::Numbered);
    }

    let first_upper = text.chars().next().is_some_and(char::is_uppercase);
    let len = text.chars().count();

    // Body text like "Our experiments are conducted..." also contains keywords
    if first_upper && len < 40 {
        let lower = text.to_lowercase();
        if config
            .section_keywords
            .iter()
            .any(|kw| lower.contains(kw.as_str()))
        {
            return Some(HeadingShape::Keyword);
        }
    }

    if is_section_number(text) {
        return Some(HeadingShape::BareNumber);
    }

    if len < 50 && first_upper && !text.ends_with('.') && !text.contains(". ") {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= 3 {
            return Some(HeadingShape::TitleCase);
        }
        // "Communicating Desires as Demands pressures" is a body fragment
        let last_substantive = words
            .iter()
            .rev()
            .find(|w| w.chars().count() > 3 && w.chars().all(char::is_alphabetic));
        if last_substantive.is_some_and(|w| w.chars().next().is_some_and(char::is_uppercase)) {
            return Some(HeadingShape::TitleCase);
        }
    }
    None
}

fn size_key(size: f64) -> i64 {
    (size * 10.0).round() as i64
}

/// Detect headings with the outline when it is rich enough, fonts otherwise.
pub fn detect_headings(
    lines: &[Line],
    body_size: f64,
    outline: &[OutlineEntry],
    config: &ParsingConfig,
) -> (Vec<Heading>, HeadingSource) {
    if outline.len() >= config.min_outline_entries {
        let headings = resolve_outline(outline, lines);
        tracing::debug!(
            entries = outline.len(),
            resolved = headings.len(),
            "headings from outline"
        );
        return (headings, HeadingSource::Outline);
    }

    let raw = headings_from_fonts(lines, body_size, config);
    let merged = merge_fragments(raw, config);
    tracing::debug!(headings = merged.len(), body_size, "headings from font heuristics");
    (merged, HeadingSource::Fonts)
}

/// Anchor outline entries to lines on their target pages.
///
/// Matching prefers an exact (case-insensitive) line, then the line with the
/// best substring overlap, then the first line on the page. Entries whose page
/// has no text are dropped. The result is ordered by offset.
pub fn resolve_outline(entries: &[OutlineEntry], lines: &[Line]) -> Vec<Heading> {
    let mut resolved = Vec::new();
    for entry in entries {
        let title = entry.title.trim();
        let wanted = title.to_lowercase();

        let on_page: Vec<&Line> = lines.iter().filter(|l| l.page == entry.page).collect();
        let exact = on_page
            .iter()
            .find(|l| l.text.trim().to_lowercase() == wanted);

        let best = exact.or_else(|| {
            let mut best: Option<(&&Line, f64)> = None;
            for line in &on_page {
                let have = line.text.trim().to_lowercase();
                if wanted.is_empty() || !(have.contains(&wanted) || wanted.contains(&have)) {
                    continue;
                }
                let (a, b) = (have.chars().count(), wanted.chars().count());
                let score = a.min(b) as f64 / a.max(b).max(1) as f64;
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((line, score));
                }
            }
            best.map(|(line, _)| line)
        });

        match best.or_else(|| on_page.first()) {
            Some(line) => resolved.push(Heading {
                text: title.to_string(),
                level: entry.level.max(1),
                page: entry.page,
                char_start: line.char_start,
                char_end: line.char_end,
                font_size: None,
            }),
            None => {
                tracing::debug!(title, page = entry.page, "outline entry has no text on its page, dropped");
            }
        }
    }
    resolved.sort_by_key(|h| h.char_start);
    resolved
}

/// Font-size and bold-weight heading candidates, in document order.
pub fn headings_from_fonts(lines: &[Line], body_size: f64, config: &ParsingConfig) -> Vec<Heading> {
    let threshold = body_size * config.heading_size_ratio;

    let sizes: BTreeSet<i64> = lines
        .iter()
        .filter(|l| l.font_size > threshold)
        .filter(|l| false_positive_verdict(&l.text, config).is_accept())
        .map(|l| size_key(l.font_size))
        .collect();
    // Largest size is level 1
    let ranked: Vec<i64> = sizes.into_iter().rev().collect();
    let level_of = |size: f64| {
        ranked
            .iter()
            .position(|s| *s == size_key(size))
            .map_or(1, |i| i as u32 + 1)
    };
    let bold_level = ranked.len() as u32 + 1;

    let title_size = lines
        .iter()
        .filter(|l| l.page == 0 && !ARXIV_HEADER_RE.is_match(&l.text))
        .map(|l| l.font_size)
        .fold(0.0_f64, f64::max);

    let mut headings = Vec::new();
    let mut seen_first_section = false;
    let mut rejected = 0usize;

    for line in lines {
        if let Verdict::Reject(_) = false_positive_verdict(&line.text, config) {
            rejected += 1;
            continue;
        }

        let level = if line.font_size > threshold {
            // Title and subtitle
            if line.page == 0 && line.font_size >= title_size - 1.0 {
                continue;
            }
            // Author blocks on the first page before any real section
            if line.page == 0
                && !seen_first_section
                && heading_shape(&line.text, config).is_none()
            {
                continue;
            }
            level_of(line.font_size)
        } else if line.is_bold
            && line.font_size >= body_size * 0.95
            && heading_shape(&line.text, config).is_some()
        {
            bold_level
        } else {
            continue;
        };

        seen_first_section = true;
        headings.push(Heading {
            text: line.text.clone(),
            level,
            page: line.page,
            char_start: line.char_start,
            char_end: line.char_end,
            font_size: Some(line.font_size),
        });
    }
    tracing::debug!(candidates = headings.len(), rejected, "font heading scan");
    headings
}

/// Stitch heading fragments split across lines.
///
/// A bare section number followed by a same-page heading of similar size is
/// joined with it (`"1"` + `"Introduction"`), and keeps absorbing followers
/// while the text ends in a trailing conjunction or the follower is a single
/// non-number word. A heading ending in a conjunction is joined with its
/// successor. Outline-derived headings carry no font size and never merge.
pub fn merge_fragments(headings: Vec<Heading>, config: &ParsingConfig) -> Vec<Heading> {
    if headings.len() < 2 {
        return headings;
    }

    let similar = |a: &Heading, b: &Heading| match (a.font_size, b.font_size) {
        (Some(x), Some(y)) => (x - y).abs() < config.merge_size_tolerance,
        _ => false,
    };
    let ends_in_conjunction = |text: &str| {
        text.split_whitespace()
            .last()
            .is_some_and(|w| config.is_trailing_conjunction(w))
    };

    let mut merged = Vec::with_capacity(headings.len());
    let mut i = 0;
    while i < headings.len() {
        let current = &headings[i];
        let Some(next) = headings.get(i + 1) else {
            merged.push(current.clone());
            break;
        };

        if is_section_number(current.text.trim()) && next.page == current.page && similar(current, next)
        {
            let mut combined = Heading {
                text: format!("{} {}", current.text, next.text),
                level: current.level.min(next.level),
                page: current.page,
                char_start: current.char_start,
                char_end: next.char_end,
                font_size: current.font_size,
            };
            i += 2;
            while let Some(follower) = headings.get(i) {
                let single_word = follower.text.split_whitespace().count() == 1
                    && !is_section_number(follower.text.trim());
                if follower.page == combined.page
                    && similar(follower, next)
                    && (ends_in_conjunction(&combined.text) || single_word)
                {
                    combined.text.push(' ');
                    combined.text.push_str(&follower.text);
                    combined.char_end = follower.char_end;
                    i += 1;
                } else {
                    break;
                }
            }
            merged.push(combined);
        } else if ends_in_conjunction(&current.text)
            && next.page == current.page
            && similar(current, next)
        {
            merged.push(Heading {
                text: format!("{} {}", current.text, next.text),
                level: current.level.min(next.level),
                page: current.page,
                char_start: current.char_start,
                char_end: next.char_end,
                font_size: current.font_size,
            });
            i += 2;
        } else {
            merged.push(current.clone());
            i += 1;
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_core::Rect;

    fn config() -> ParsingConfig {
        ParsingConfig::default()
    }

    fn heading(text: &str, page: usize, size: f64, start: usize) -> Heading {
        Heading {
            text: text.into(),
            level: 1,
            page,
            char_start: start,
            char_end: start + text.len(),
            font_size: Some(size),
        }
    }

    fn line(text: &str, size: f64, bold: bool, page: usize, start: usize) -> Line {
        Line {
            text: text.into(),
            font_size: size,
            font_name: if bold { "Times-Bold".into() } else { "Times".into() },
            is_bold: bold,
            page,
            bbox: Rect::new(72.0, 72.0, 300.0, 84.0),
            char_start: start,
            char_end: start + text.len(),
        }
    }

    #[test]
    fn test_false_positive_rules() {
        let c = config();
        let reject = |t: &str| false_positive_verdict(t, &c);
        assert_eq!(reject("arXiv:2106.09685v2 [cs.CL] 16 Oct 2021"), Verdict::Reject(RejectReason::ArxivBanner));
        assert_eq!(reject("Figure 3: Results"), Verdict::Reject(RejectReason::Caption));
        assert_eq!(reject("Figure 1: Training loss"), Verdict::Reject(RejectReason::Caption));
        assert_eq!(reject(&"x".repeat(81)), Verdict::Reject(RejectReason::TooLong));
        assert_eq!(
            reject("Example: the model predicted"),
            Verdict::Reject(RejectReason::MidSentenceColon)
        );
        assert_eq!(
            reject("English CommonCrawl [67%]."),
            Verdict::Reject(RejectReason::SentenceFinalPeriod)
        );
        assert_eq!(reject("88.0 81.1"), Verdict::Reject(RejectReason::NumericData));
        assert_eq!(reject("Hugo Touvron ∗"), Verdict::Reject(RejectReason::AuthorSymbols));
        assert_eq!(reject("Models and"), Verdict::Accept);
        assert_eq!(reject("learning-"), Verdict::Reject(RejectReason::TrailingPunctuation));
    }

    #[test]
    fn test_false_positive_accepts_headings() {
        let c = config();
        for text in ["1 Introduction", "2 Approach", "4.1", "3", "Related Work", "1. Introduction", "Background: ab"] {
            assert!(
                false_positive_verdict(text, &c).is_accept(),
                "{text:?} should be accepted"
            );
        }
    }

    #[test]
    fn test_heading_shape() {
        let c = config();
        assert_eq!(heading_shape("2.1 Data Collection", &c), Some(HeadingShape::Numbered));
        assert_eq!(heading_shape("Acknowledgements", &c), Some(HeadingShape::Keyword));
        assert_eq!(heading_shape("B.1", &c), Some(HeadingShape::BareNumber));
        assert_eq!(heading_shape("Low Rank Adaptation", &c), Some(HeadingShape::TitleCase));
        assert_eq!(
            heading_shape("Communicating Desires as Demands pressures", &c),
            None
        );
        assert_eq!(heading_shape("our method works well.", &c), None);
    }

    #[test]
    fn test_merge_number_and_title() {
        let merged = merge_fragments(
            vec![heading("1", 0, 12.0, 0), heading("Introduction", 0, 12.0, 2)],
            &config(),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "1 Introduction");
        assert_eq!(merged[0].char_start, 0);
        assert_eq!(merged[0].char_end, 14);
    }

    #[test]
    fn test_no_merge_across_font_sizes() {
        let merged = merge_fragments(
            vec![heading("1", 0, 14.0, 0), heading("Introduction", 0, 10.0, 2)],
            &config(),
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_no_merge_across_pages() {
        let merged = merge_fragments(
            vec![heading("1", 0, 12.0, 0), heading("Introduction", 1, 12.0, 2)],
            &config(),
        );
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_continues_through_conjunction() {
        let merged = merge_fragments(
            vec![
                heading("3", 2, 12.0, 0),
                heading("Detection and", 2, 12.0, 2),
                heading("Reframing", 2, 12.0, 16),
                heading("4", 3, 12.0, 40),
            ],
            &config(),
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "3 Detection and Reframing");
        assert_eq!(merged[1].text, "4");
    }

    #[test]
    fn test_merge_conjunction_ending() {
        let merged = merge_fragments(
            vec![heading("Detection and", 0, 12.0, 0), heading("Reframing", 0, 12.0, 14)],
            &config(),
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Detection and Reframing");
    }

    #[test]
    fn test_headings_from_fonts_levels_and_title_skip() {
        let lines = vec![
            line("A Great Paper Title", 17.0, false, 0, 0),
            line("1 Introduction", 12.0, true, 0, 20),
            line("Body text goes here and continues for a while.", 10.0, false, 0, 35),
            line("2.1 Setup", 11.0, true, 1, 82),
            line("Body text again and again and again and again.", 10.0, false, 1, 92),
            line("Limitations", 10.0, true, 1, 139),
        ];
        let headings = headings_from_fonts(&lines, 10.0, &config());
        let texts: Vec<&str> = headings.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["1 Introduction", "2.1 Setup", "Limitations"]);
        // The 17pt title size still takes rank 1
        assert_eq!(headings[0].level, 2);
        assert_eq!(headings[1].level, 3, "bold body-sized heading sits below font levels");
        assert_eq!(headings[2].level, 3);
    }

    #[test]
    fn test_author_block_rejected_before_first_section() {
        let lines = vec![
            line("A Great Paper Title", 17.0, false, 0, 0),
            line("alice smith, bob jones", 12.0, false, 0, 20),
            line("1 Introduction", 12.0, false, 0, 43),
        ];
        let headings = headings_from_fonts(&lines, 10.0, &config());
        assert_eq!(headings.len(), 1);
        assert_eq!(headings[0].text, "1 Introduction");
    }

    #[test]
    fn test_resolve_outline() {
        let lines = vec![
            line("Some Title", 17.0, false, 0, 0),
            line("1 Introduction", 12.0, false, 0, 11),
            line("Body", 10.0, false, 0, 26),
            line("2 Method Details", 12.0, false, 1, 31),
            line("Body", 10.0, false, 2, 48),
        ];
        let outline = vec![
            OutlineEntry { level: 1, title: "1 Introduction".into(), page: 0 },
            OutlineEntry { level: 1, title: "2 Method".into(), page: 1 },
            OutlineEntry { level: 2, title: "2.1 Unmatched".into(), page: 2 },
            OutlineEntry { level: 1, title: "Missing page".into(), page: 9 },
        ];
        let headings = resolve_outline(&outline, &lines);
        assert_eq!(headings.len(), 3);
        assert_eq!(headings[0].char_start, 11, "exact match");
        assert_eq!(headings[1].char_start, 31, "substring match");
        assert_eq!(headings[2].char_start, 48, "first line on page");
        assert_eq!(headings[2].level, 2);
    }

    #[test]
    fn test_detect_headings_prefers_rich_outline() {
        let lines = vec![line("1 Introduction", 12.0, false, 0, 0)];
        let short_outline = vec![OutlineEntry { level: 1, title: "Intro".into(), page: 0 }];
        let (_, source) = detect_headings(&lines, 10.0, &short_outline, &config());
        assert_eq!(source, HeadingSource::Fonts);

        let outline: Vec<OutlineEntry> = (0..3)
            .map(|i| OutlineEntry { level: 1, title: format!("S{i}"), page: 0 })
            .collect();
        let (_, source) = detect_headings(&lines, 10.0, &outline, &config());
        assert_eq!(source, HeadingSource::Outline);
    }
}
