//! Glyph geometry from MuPDF's structured text.
//!
//! MuPDF's per-character API carries position and size but no font name, so
//! font names come from the structured-text JSON dump, which reports one font
//! per line. The two views list text lines in the same order.

use mupdf::{Document, TextPageFlags};
use paper_core::{BackendError, Glyph, GlyphRun, PageContent, Rect, TextLine};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct JsonPage {
    #[serde(default)]
    blocks: Vec<JsonBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonBlock {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    lines: Vec<JsonLine>,
}

#[derive(Debug, Default, Deserialize)]
struct JsonLine {
    #[serde(default)]
    font: JsonFont,
}

#[derive(Debug, Default, Deserialize)]
struct JsonFont {
    #[serde(default)]
    name: String,
    #[serde(default)]
    weight: String,
}

/// Font name of every text line in the page's JSON dump, in order.
///
/// Bold weight is folded into the name when the name does not say so. An
/// unparsable dump yields no names.
fn line_fonts(json: &str) -> Vec<String> {
    let page: JsonPage = match serde_json::from_str(json) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable structured-text JSON, font names unavailable");
            return Vec::new();
        }
    };
    page.blocks
        .into_iter()
        .filter(|b| b.kind.is_empty() || b.kind == "text")
        .flat_map(|b| b.lines)
        .map(|l| {
            let name = l.font.name;
            if l.font.weight == "bold" && !name.to_lowercase().contains("bold") {
                format!("{name}-Bold")
            } else {
                name
            }
        })
        .collect()
}

fn err(e: mupdf::Error) -> BackendError {
    BackendError::ExtractionError(e.to_string())
}

/// Split a line's glyphs into runs of equal font size.
fn runs_by_size(glyphs: Vec<(Glyph, f64)>, font_name: &str) -> Vec<GlyphRun> {
    let mut runs: Vec<GlyphRun> = Vec::new();
    for (glyph, size) in glyphs {
        match runs.last_mut() {
            Some(run) if (run.font_size - size).abs() < 0.01 => run.glyphs.push(glyph),
            _ => runs.push(GlyphRun {
                font_size: size,
                font_name: font_name.to_string(),
                glyphs: vec![glyph],
            }),
        }
    }
    runs
}

pub(crate) fn extract_pages(document: &Document) -> Result<Vec<PageContent>, BackendError> {
    let mut pages = Vec::new();
    for (number, page) in document.pages().map_err(err)?.enumerate() {
        let page = page.map_err(err)?;
        let bounds = page.bounds().map_err(err)?;
        let text_page = page.to_text_page(TextPageFlags::empty()).map_err(err)?;
        let fonts = text_page.to_json(1.0).map(|j| line_fonts(&j)).unwrap_or_default();

        let mut lines = Vec::new();
        let mut line_index = 0;
        for block in text_page.blocks() {
            for line in block.lines() {
                let font = fonts.get(line_index).map_or("", String::as_str);
                line_index += 1;

                let glyphs: Vec<(Glyph, f64)> = line
                    .chars()
                    .map(|c| {
                        let q = c.quad();
                        let bbox = Rect::new(
                            f64::from(q.ul.x.min(q.ll.x) - bounds.x0),
                            f64::from(q.ul.y.min(q.ur.y) - bounds.y0),
                            f64::from(q.ur.x.max(q.lr.x) - bounds.x0),
                            f64::from(q.ll.y.max(q.lr.y) - bounds.y0),
                        );
                        let glyph = Glyph {
                            ch: c.char().unwrap_or('\u{FFFD}'),
                            bbox,
                        };
                        (glyph, f64::from(c.size()))
                    })
                    .collect();
                if glyphs.is_empty() {
                    continue;
                }

                let b = line.bounds();
                lines.push(TextLine {
                    bbox: Rect::new(
                        f64::from(b.x0 - bounds.x0),
                        f64::from(b.y0 - bounds.y0),
                        f64::from(b.x1 - bounds.x0),
                        f64::from(b.y1 - bounds.y0),
                    ),
                    runs: runs_by_size(glyphs, font),
                });
            }
        }
        if !fonts.is_empty() && fonts.len() != line_index {
            tracing::debug!(page = number, json_lines = fonts.len(), lines = line_index, "font list and text lines disagree");
        }

        pages.push(PageContent {
            number,
            width: f64::from(bounds.x1 - bounds.x0),
            height: f64::from(bounds.y1 - bounds.y0),
            lines,
        });
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_fonts_from_json() {
        let json = r#"{"blocks": [
            {"type": "text", "lines": [
                {"font": {"name": "Times-Roman", "weight": "normal", "size": 10}, "text": "body"},
                {"font": {"name": "CMR12", "weight": "bold", "size": 12}, "text": "1 Introduction"}
            ]},
            {"type": "image"},
            {"type": "text", "lines": [{"font": {"name": "Arial-BoldMT", "weight": "bold"}}]}
        ]}"#;
        assert_eq!(line_fonts(json), vec!["Times-Roman", "CMR12-Bold", "Arial-BoldMT"]);
        assert!(line_fonts("not json").is_empty());
    }

    #[test]
    fn test_runs_split_on_size_change() {
        let glyph = |ch, x| Glyph {
            ch,
            bbox: Rect::new(x, 0.0, x + 5.0, 10.0),
        };
        let runs = runs_by_size(
            vec![(glyph('a', 0.0), 10.0), (glyph('b', 5.0), 10.0), (glyph('1', 10.0), 7.0)],
            "Times",
        );
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text(), "ab");
        assert_eq!(runs[1].font_size, 7.0);
    }
}
