//! The structured document model produced by the parsing pipeline.
//!
//! Every offset in this module indexes into [`Document::raw_text`], the single
//! offset space shared by sections, sentences and links. Offsets are UTF-8 byte
//! offsets and always fall on char boundaries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{PageBox, Rect};

/// Half-open range `[start, end)` into the document text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub boxes: Vec<PageBox>,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            boxes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// True when this span shares at least one offset with `[start, end)`.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub span: Span,
    #[serde(default)]
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub level: u32,
    pub content: String,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub page_start: usize,
    #[serde(default)]
    pub page_end: usize,
}

impl Section {
    /// The span covering this section's slice of the document text.
    pub fn primary_span(&self) -> Option<&Span> {
        self.spans.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    External,
    Internal,
    Citation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub kind: LinkKind,
    pub text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub target_page: Option<usize>,
    pub page: usize,
    pub span: Span,
    #[serde(default)]
    pub target_xy: Option<[f64; 2]>,
    #[serde(default)]
    pub dest_name: String,
}

impl Link {
    pub fn is_citation(&self) -> bool {
        self.kind == LinkKind::Citation
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub arxiv_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page_number: usize,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Figure,
    Table,
    Equation,
}

impl LayoutKind {
    /// Prefix of the human-readable label, e.g. `Figure 3`.
    pub fn label_prefix(self) -> &'static str {
        match self {
            LayoutKind::Figure => "Figure",
            LayoutKind::Table => "Table",
            LayoutKind::Equation => "Eq.",
        }
    }

    /// Prefix of registry ids, e.g. `f3`.
    pub fn ref_prefix(self) -> &'static str {
        match self {
            LayoutKind::Figure => "f",
            LayoutKind::Table => "t",
            LayoutKind::Equation => "eq",
        }
    }

    /// Normalize the class names emitted by layout models.
    pub fn from_class_name(name: &str) -> Option<Self> {
        match name {
            "figure" | "Figure" | "Picture" | "picture" => Some(LayoutKind::Figure),
            "table" | "Table" => Some(LayoutKind::Table),
            "isolate_formula" | "formula" | "Formula" | "Equation" | "equation" => {
                Some(LayoutKind::Equation)
            }
            _ => None,
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayoutKind::Figure => "figure",
            LayoutKind::Table => "table",
            LayoutKind::Equation => "equation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutElement {
    pub kind: LayoutKind,
    #[serde(rename = "box")]
    pub bbox: PageBox,
    pub confidence: f32,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub image_path: String,
}

/// Root aggregate. Read-only once cached.
///
/// All fields default on load so caches written by older versions (without
/// `links` or `layout_elements`) stay readable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub pages: Vec<PageInfo>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub layout_elements: Vec<LayoutElement>,
}

impl Document {
    /// Size of a 0-indexed page, if known.
    pub fn page_size(&self, page: usize) -> Option<(f64, f64)> {
        self.pages
            .iter()
            .find(|p| p.page_number == page)
            .map(|p| (p.width, p.height))
    }

    /// Index of the section whose primary span contains `offset`.
    pub fn section_at(&self, offset: usize) -> Option<usize> {
        self.sections.iter().position(|s| {
            s.primary_span()
                .is_some_and(|span| offset >= span.start && offset < span.end)
        })
    }

    pub fn citations(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| l.is_citation())
    }
}

/// Fixed highlight palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
}

impl HighlightColor {
    /// RGB components in `[0, 1]`.
    pub fn rgb(self) -> [f32; 3] {
        match self {
            HighlightColor::Yellow => [1.0, 0.92, 0.23],
            HighlightColor::Green => [0.56, 0.93, 0.56],
            HighlightColor::Blue => [0.68, 0.85, 0.9],
            HighlightColor::Pink => [1.0, 0.71, 0.76],
        }
    }
}

impl FromStr for HighlightColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yellow" => Ok(HighlightColor::Yellow),
            "green" => Ok(HighlightColor::Green),
            "blue" => Ok(HighlightColor::Blue),
            "pink" => Ok(HighlightColor::Pink),
            other => Err(format!(
                "unknown highlight color '{other}' (expected yellow, green, blue or pink)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub id: u64,
    pub text: String,
    pub page: usize,
    pub rects: Vec<Rect>,
    #[serde(default)]
    pub color: HighlightColor,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_loads_without_optional_fields() {
        let json = r#"{
            "metadata": {"title": "T", "authors": [], "arxiv_id": "1", "url": "", "abstract": ""},
            "sections": [],
            "raw_text": "hello",
            "pages": [{"page_number": 0, "width": 612.0, "height": 792.0}]
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert!(doc.links.is_empty());
        assert!(doc.layout_elements.is_empty());
        assert_eq!(doc.page_size(0), Some((612.0, 792.0)));
    }

    #[test]
    fn test_layout_element_box_field_name() {
        let el = LayoutElement {
            kind: LayoutKind::Figure,
            bbox: PageBox {
                x0: 1.0,
                y0: 2.0,
                x1: 3.0,
                y1: 4.0,
                page: 0,
            },
            confidence: 0.9,
            caption: String::new(),
            label: "Figure 1".into(),
            image_path: String::new(),
        };
        let value = serde_json::to_value(&el).unwrap();
        assert_eq!(value["box"]["x1"], 3.0);
        assert_eq!(value["kind"], "figure");
    }

    #[test]
    fn test_layout_kind_aliases() {
        assert_eq!(LayoutKind::from_class_name("Picture"), Some(LayoutKind::Figure));
        assert_eq!(
            LayoutKind::from_class_name("isolate_formula"),
            Some(LayoutKind::Equation)
        );
        assert_eq!(LayoutKind::from_class_name("Table"), Some(LayoutKind::Table));
        assert_eq!(LayoutKind::from_class_name("plain text"), None);
    }

    #[test]
    fn test_span_overlap() {
        let span = Span::new(10, 20);
        assert!(span.overlaps(15, 30));
        assert!(span.overlaps(0, 11));
        assert!(!span.overlaps(20, 30));
        assert!(!span.overlaps(0, 10));
    }

    #[test]
    fn test_highlight_color_parse() {
        assert_eq!("Green".parse::<HighlightColor>(), Ok(HighlightColor::Green));
        assert!("purple".parse::<HighlightColor>().is_err());
        assert_eq!(HighlightColor::Yellow.rgb(), [1.0, 0.92, 0.23]);
    }
}
