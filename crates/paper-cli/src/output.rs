use std::io::Write;

use paper_core::{Document, PaperId, Section};
use serde::Serialize;

/// Write `value` as pretty JSON followed by a newline.
pub fn print_json<T: Serialize + ?Sized>(w: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

/// What `parse` reports about a freshly imported paper.
#[derive(Debug, Serialize)]
pub struct ParseSummary<'a> {
    pub paper_id: String,
    pub title: &'a str,
    pub authors: &'a [String],
    pub arxiv_id: &'a str,
    pub pages: usize,
    pub sections: usize,
    pub sentences: usize,
    pub links: usize,
    pub citations: usize,
}

impl<'a> ParseSummary<'a> {
    pub fn new(id: &PaperId, doc: &'a Document) -> Self {
        Self {
            paper_id: id.to_string(),
            title: &doc.metadata.title,
            authors: &doc.metadata.authors,
            arxiv_id: &doc.metadata.arxiv_id,
            pages: doc.pages.len(),
            sections: doc.sections.len(),
            sentences: doc.sections.iter().map(|s| s.sentences.len()).sum(),
            links: doc.links.len(),
            citations: doc.citations().count(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutlineRow<'a> {
    pub index: usize,
    pub heading: &'a str,
    pub level: u32,
    /// 1-based, as printed on the page.
    pub page_start: usize,
    pub page_end: usize,
}

pub fn outline(doc: &Document) -> Vec<OutlineRow<'_>> {
    doc.sections
        .iter()
        .enumerate()
        .map(|(index, s)| OutlineRow {
            index,
            heading: &s.heading,
            level: s.level,
            page_start: s.page_start + 1,
            page_end: s.page_end + 1,
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct AnnotatedSection<'a> {
    pub index: usize,
    pub heading: &'a str,
    pub text: String,
}

/// Sections with their annotated sentences joined back into running text.
///
/// A section without sentences falls back to its plain content.
pub fn annotated_sections<'a>(
    doc: &'a Document,
    annotated: Vec<Vec<String>>,
    only: Option<usize>,
) -> Vec<AnnotatedSection<'a>> {
    doc.sections
        .iter()
        .zip(annotated)
        .enumerate()
        .filter(|(index, _)| only.is_none_or(|i| i == *index))
        .map(|(index, (section, sentences))| AnnotatedSection {
            index,
            heading: &section.heading,
            text: if sentences.is_empty() {
                section.content.clone()
            } else {
                sentences.join(" ")
            },
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SectionView<'a> {
    pub heading: &'a str,
    pub level: u32,
    pub page_start: usize,
    pub page_end: usize,
    pub content: &'a str,
}

impl<'a> From<&'a Section> for SectionView<'a> {
    fn from(s: &'a Section) -> Self {
        Self {
            heading: &s.heading,
            level: s.level,
            page_start: s.page_start + 1,
            page_end: s.page_end + 1,
            content: &s.content,
        }
    }
}
