//! Visual lines with font statistics, and the document text they form.

use paper_core::{PdfContent, Rect};

use crate::text_processing::{collapse_whitespace, expand_ligatures};

/// Fallback body size for documents without any text.
pub const DEFAULT_BODY_SIZE: f64 = 10.0;

/// One visual line of text with the dominant font of its characters.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    /// Dominant size in points, rounded to 0.1.
    pub font_size: f64,
    pub font_name: String,
    pub is_bold: bool,
    pub page: usize,
    pub bbox: Rect,
    /// Offsets into the document text, assigned by [`build_raw_text`].
    pub char_start: usize,
    pub char_end: usize,
}

/// Whether a font name signals a heavier weight than regular.
pub fn is_bold_font(name: &str) -> bool {
    name.to_lowercase().contains("bold")
        || name.contains("Medium")
        || name.ends_with("-Medi")
        || name.contains("Semibold")
        || name.contains("Black")
        || name.contains("Heavy")
}

fn round_size(size: f64) -> f64 {
    (size * 10.0).round() / 10.0
}

/// Insertion-ordered weighted tally; ties go to the first key seen.
struct Tally<K> {
    entries: Vec<(K, usize)>,
}

impl<K: PartialEq> Tally<K> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add(&mut self, key: K, weight: usize) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, w)) => *w += weight,
            None => self.entries.push((key, weight)),
        }
    }

    fn most_common(self) -> Option<K> {
        let mut best: Option<(K, usize)> = None;
        for (key, weight) in self.entries {
            if best.as_ref().is_none_or(|(_, w)| weight > *w) {
                best = Some((key, weight));
            }
        }
        best.map(|(k, _)| k)
    }
}

/// Merge the glyph runs of every visual line into [`Line`]s, in page order.
///
/// Offsets are left at zero; call [`build_raw_text`] to assign them.
pub fn extract_lines(content: &PdfContent) -> Vec<Line> {
    let mut lines = Vec::new();
    for page in &content.pages {
        for text_line in &page.lines {
            let mut parts: Vec<String> = Vec::new();
            let mut sizes: Tally<i64> = Tally::new();
            let mut fonts: Tally<&str> = Tally::new();
            let mut any_bold = false;

            for run in &text_line.runs {
                let text = run.text();
                if text.trim().is_empty() {
                    continue;
                }
                let weight = text.chars().count();
                sizes.add((round_size(run.font_size) * 10.0).round() as i64, weight);
                fonts.add(run.font_name.as_str(), weight);
                any_bold |= is_bold_font(&run.font_name);
                parts.push(text);
            }

            let merged = collapse_whitespace(&expand_ligatures(&parts.join(" ")));
            if merged.is_empty() {
                continue;
            }

            lines.push(Line {
                text: merged,
                font_size: sizes
                    .most_common()
                    .map(|tenths| tenths as f64 / 10.0)
                    .unwrap_or(DEFAULT_BODY_SIZE),
                font_name: fonts.most_common().unwrap_or_default().to_string(),
                is_bold: any_bold,
                page: page.number,
                bbox: text_line.bbox,
                char_start: 0,
                char_end: 0,
            });
        }
    }
    lines
}

/// Join lines with `\n` into the document text, recording each line's offsets.
pub fn build_raw_text(lines: &mut [Line]) -> String {
    let mut raw = String::new();
    for (i, line) in lines.iter_mut().enumerate() {
        if i > 0 {
            raw.push('\n');
        }
        line.char_start = raw.len();
        raw.push_str(&line.text);
        line.char_end = raw.len();
    }
    raw
}

/// The most character-weighted font size across the document.
pub fn body_font_size(lines: &[Line]) -> f64 {
    let mut sizes: Tally<i64> = Tally::new();
    for line in lines {
        sizes.add((line.font_size * 10.0).round() as i64, line.text.chars().count());
    }
    sizes
        .most_common()
        .map(|tenths| tenths as f64 / 10.0)
        .unwrap_or(DEFAULT_BODY_SIZE)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use paper_core::{GlyphRun, PageContent, TextLine};

    /// A page of single-run lines: `(text, size, font)` stacked 14pt apart.
    pub(crate) fn page_of(number: usize, lines: &[(&str, f64, &str)]) -> PageContent {
        PageContent {
            number,
            width: 612.0,
            height: 792.0,
            lines: lines
                .iter()
                .enumerate()
                .map(|(i, (text, size, font))| {
                    TextLine::from_runs(vec![GlyphRun::from_text(
                        text,
                        *size,
                        font,
                        72.0,
                        72.0 + 14.0 * i as f64,
                    )])
                })
                .collect(),
        }
    }

    #[test]
    fn test_merges_runs_with_dominant_size() {
        let line = TextLine::from_runs(vec![
            GlyphRun::from_text("Attention", 12.04, "Times-Bold", 72.0, 100.0),
            GlyphRun::from_text("  ", 12.0, "Times", 120.0, 100.0),
            GlyphRun::from_text("1", 7.0, "Times", 130.0, 100.0),
        ]);
        let content = PdfContent {
            pages: vec![PageContent {
                number: 0,
                width: 612.0,
                height: 792.0,
                lines: vec![line],
            }],
            ..Default::default()
        };
        let lines = extract_lines(&content);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Attention 1");
        assert!((lines[0].font_size - 12.0).abs() < 1e-9);
        assert_eq!(lines[0].font_name, "Times-Bold");
        assert!(lines[0].is_bold);
    }

    #[test]
    fn test_raw_text_offsets() {
        let content = PdfContent {
            pages: vec![page_of(0, &[("First line", 10.0, "Times"), ("Second", 10.0, "Times")])],
            ..Default::default()
        };
        let mut lines = extract_lines(&content);
        let raw = build_raw_text(&mut lines);
        assert_eq!(raw, "First line\nSecond");
        for line in &lines {
            assert_eq!(&raw[line.char_start..line.char_end], line.text);
        }
    }

    #[test]
    fn test_ligatures_and_blank_lines() {
        let content = PdfContent {
            pages: vec![page_of(0, &[("ﬁne  tuning", 10.0, "Times"), ("   ", 10.0, "Times")])],
            ..Default::default()
        };
        let lines = extract_lines(&content);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "fine tuning");
    }

    #[test]
    fn test_body_font_size() {
        let content = PdfContent {
            pages: vec![page_of(
                0,
                &[
                    ("Title", 17.2, "Times"),
                    ("a long body line of ordinary text", 10.0, "Times"),
                    ("another body line", 10.0, "Times"),
                ],
            )],
            ..Default::default()
        };
        let lines = extract_lines(&content);
        assert!((body_font_size(&lines) - 10.0).abs() < 1e-9);
        assert!((body_font_size(&[]) - DEFAULT_BODY_SIZE).abs() < 1e-9);
    }

    #[test]
    fn test_bold_detection() {
        assert!(is_bold_font("NimbusRomNo9L-Medi"));
        assert!(is_bold_font("Arial-BoldMT"));
        assert!(is_bold_font("SFBX1200+CMBX12-Bold"));
        assert!(!is_bold_font("Times-Roman"));
    }
}
