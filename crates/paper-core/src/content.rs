//! Library-neutral snapshot of a PDF as produced by a [`PdfBackend`](crate::PdfBackend).
//!
//! Everything downstream of the backend (line extraction, link anchoring,
//! caption clipping, text search, citation resolution) works on these types,
//! so the heuristics can be exercised with hand-built pages.

use crate::geometry::Rect;
use crate::model::PageInfo;

/// One glyph with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub bbox: Rect,
}

/// Consecutive glyphs on a line sharing a font and size.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub font_size: f64,
    pub font_name: String,
    pub glyphs: Vec<Glyph>,
}

impl GlyphRun {
    /// Lay `text` out left-to-right from `x0` with a fixed advance of half
    /// the font size. For backends that report run text without per-glyph
    /// geometry.
    pub fn from_text(text: &str, font_size: f64, font_name: &str, x0: f64, y0: f64) -> Self {
        let advance = font_size * 0.5;
        let glyphs = text
            .chars()
            .enumerate()
            .map(|(i, ch)| {
                let left = x0 + advance * i as f64;
                Glyph {
                    ch,
                    bbox: Rect::new(left, y0, left + advance, y0 + font_size),
                }
            })
            .collect();
        Self {
            font_size,
            font_name: font_name.to_string(),
            glyphs,
        }
    }

    pub fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch).collect()
    }

    pub fn bbox(&self) -> Option<Rect> {
        Rect::union_all(self.glyphs.iter().map(|g| &g.bbox))
    }
}

/// A visual line as reported by the PDF library.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub bbox: Rect,
    pub runs: Vec<GlyphRun>,
}

impl TextLine {
    /// Build a line from runs, deriving its bbox from the glyphs.
    pub fn from_runs(runs: Vec<GlyphRun>) -> Self {
        let boxes: Vec<Rect> = runs.iter().filter_map(GlyphRun::bbox).collect();
        let bbox = Rect::union_all(&boxes).unwrap_or(Rect::ZERO);
        Self { bbox, runs }
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &Glyph> {
        self.runs.iter().flat_map(|r| r.glyphs.iter())
    }

    pub fn text(&self) -> String {
        self.glyphs().map(|g| g.ch).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// 0-indexed page number.
    pub number: usize,
    pub width: f64,
    pub height: f64,
    pub lines: Vec<TextLine>,
}

impl PageContent {
    /// Text of glyphs whose centre lies inside `clip`, one output line per
    /// visual line.
    pub fn text_in(&self, clip: &Rect) -> String {
        let mut out: Vec<String> = Vec::new();
        for line in &self.lines {
            if !line.bbox.intersects(clip) && !line.bbox.is_empty() {
                continue;
            }
            let picked: String = line
                .glyphs()
                .filter(|g| {
                    let (cx, cy) = g.bbox.center();
                    clip.contains_point(cx, cy)
                })
                .map(|g| g.ch)
                .collect();
            if !picked.is_empty() {
                out.push(picked);
            }
        }
        out.join("\n")
    }

    /// Case-insensitive literal search over the page text.
    ///
    /// Lines are joined with a single space, so a phrase broken across a line
    /// end is still found. Each hit yields one rectangle per visual line it
    /// touches.
    pub fn search(&self, query: &str) -> Vec<Vec<Rect>> {
        let needle: Vec<char> = query.chars().map(fold_char).collect();
        if needle.is_empty() {
            return Vec::new();
        }

        // (folded char, line index, glyph box); separators carry no box
        let mut stream: Vec<(char, usize, Option<Rect>)> = Vec::new();
        for (li, line) in self.lines.iter().enumerate() {
            if li > 0 {
                stream.push((' ', li, None));
            }
            for g in line.glyphs() {
                stream.push((fold_char(g.ch), li, Some(g.bbox)));
            }
        }

        let mut hits = Vec::new();
        let mut i = 0;
        while i + needle.len() <= stream.len() {
            let matched = stream[i..i + needle.len()]
                .iter()
                .zip(&needle)
                .all(|((c, _, _), n)| c == n);
            if !matched {
                i += 1;
                continue;
            }

            let mut rects: Vec<(usize, Rect)> = Vec::new();
            for (_, li, bbox) in &stream[i..i + needle.len()] {
                let Some(bbox) = bbox else { continue };
                match rects.last_mut() {
                    Some((last_li, r)) if last_li == li => *r = r.union(bbox),
                    _ => rects.push((*li, *bbox)),
                }
            }
            if !rects.is_empty() {
                hits.push(rects.into_iter().map(|(_, r)| r).collect());
            }
            i += needle.len();
        }
        hits
    }
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// One entry of the document outline.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    /// 1-based nesting depth.
    pub level: u32,
    pub title: String,
    /// 0-indexed target page.
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    Uri(String),
    Page {
        page: usize,
        xy: Option<[f64; 2]>,
    },
    /// Named destination; `page`/`xy` are filled when the name resolved.
    Named {
        name: String,
        page: Option<usize>,
        xy: Option<[f64; 2]>,
    },
}

/// A link annotation as found on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLink {
    pub page: usize,
    pub rect: Rect,
    pub target: LinkTarget,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PdfContent {
    pub pages: Vec<PageContent>,
    pub outline: Vec<OutlineEntry>,
    pub links: Vec<RawLink>,
    pub info: PdfInfo,
}

impl PdfContent {
    pub fn page(&self, number: usize) -> Option<&PageContent> {
        self.pages.iter().find(|p| p.number == number)
    }

    pub fn page_info(&self) -> Vec<PageInfo> {
        self.pages
            .iter()
            .map(|p| PageInfo {
                page_number: p.number,
                width: p.width,
                height: p.height,
            })
            .collect()
    }
}

/// RGB8 rendering of a page.
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB, `width * height * 3` bytes.
    pub pixels: Vec<u8>,
    /// Page size in points, for mapping pixel boxes back.
    pub page_width: f64,
    pub page_height: f64,
}

impl PageRaster {
    /// RGB at `(x, y)`, `None` outside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 3;
        match self.pixels.get(idx..idx + 3)? {
            &[r, g, b] => Some([r, g, b]),
            _ => None,
        }
    }
}

/// A highlight annotation to be written into a PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightMark {
    pub page: usize,
    pub rects: Vec<Rect>,
    pub color: [f32; 3],
    pub note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(lines: &[(&str, f64)]) -> PageContent {
        PageContent {
            number: 0,
            width: 612.0,
            height: 792.0,
            lines: lines
                .iter()
                .map(|(text, y)| {
                    TextLine::from_runs(vec![GlyphRun::from_text(text, 10.0, "Times", 72.0, *y)])
                })
                .collect(),
        }
    }

    #[test]
    fn test_pixel_bounds() {
        let raster = PageRaster {
            width: 2,
            height: 1,
            pixels: vec![10, 20, 30, 40, 50, 60],
            page_width: 2.0,
            page_height: 1.0,
        };
        assert_eq!(raster.pixel(1, 0), Some([40, 50, 60]));
        assert_eq!(raster.pixel(2, 0), None);
        assert_eq!(raster.pixel(0, 1), None);

        let truncated = PageRaster {
            pixels: vec![10, 20, 30],
            ..raster
        };
        assert_eq!(truncated.pixel(1, 0), None);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let p = page(&[("Attention is all you need", 100.0)]);
        let hits = p.search("ATTENTION");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].len(), 1);
        assert!((hits[0][0].x0 - 72.0).abs() < 1e-9);
    }

    #[test]
    fn test_search_across_line_break() {
        let p = page(&[("the transformer", 100.0), ("architecture", 112.0)]);
        let hits = p.search("transformer architecture");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].len(), 2, "one rect per touched line");
    }

    #[test]
    fn test_search_multiple_hits() {
        let p = page(&[("a cat and a cat", 100.0)]);
        assert_eq!(p.search("cat").len(), 2);
        assert!(p.search("").is_empty());
    }

    #[test]
    fn test_text_in_clip() {
        let p = page(&[("first line", 100.0), ("second line", 200.0)]);
        let text = p.text_in(&Rect::new(0.0, 190.0, 612.0, 220.0));
        assert_eq!(text, "second line");
    }
}
