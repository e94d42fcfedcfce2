use std::path::Path;

use paper_core::{
    ArtifactKind, ArtifactStore, BackendError, Document, LayoutElement, Link, Metadata, PageInfo,
    PaperId, PdfBackend, PdfContent, Section, StoreError,
};
use thiserror::Error;

use crate::config::ParsingConfig;
use crate::headings::detect_headings;
use crate::lines::{body_font_size, build_raw_text, extract_lines};
use crate::links::{detect_numeric_citations, extract_links};
use crate::metadata::extract_metadata;
use crate::segment::segment_sections;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Collects the parts of a [`Document`] as the pipeline produces them.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    metadata: Metadata,
    sections: Vec<Section>,
    raw_text: String,
    pages: Vec<PageInfo>,
    links: Vec<Link>,
    layout_elements: Vec<LayoutElement>,
}

impl DocumentBuilder {
    pub fn new(raw_text: String) -> Self {
        Self {
            raw_text,
            ..Default::default()
        }
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    pub fn pages(mut self, pages: Vec<PageInfo>) -> Self {
        self.pages = pages;
        self
    }

    pub fn links(mut self, links: impl IntoIterator<Item = Link>) -> Self {
        self.links.extend(links);
        self
    }

    pub fn layout_elements(mut self, elements: Vec<LayoutElement>) -> Self {
        self.layout_elements = elements;
        self
    }

    pub fn build(self) -> Document {
        Document {
            metadata: self.metadata,
            sections: self.sections,
            raw_text: self.raw_text,
            pages: self.pages,
            links: self.links,
            layout_elements: self.layout_elements,
        }
    }
}

/// Turns PDF content into a [`Document`].
///
/// Parsing itself is pure and deterministic; [`parse_paper`](Self::parse_paper)
/// adds the backend read and the on-disk cache.
#[derive(Debug, Clone, Default)]
pub struct DocumentParser {
    config: ParsingConfig,
}

impl DocumentParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParsingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    /// Run the full pipeline over already-loaded content.
    pub fn parse_content(&self, content: &PdfContent, paper_id: &str) -> Document {
        let mut lines = extract_lines(content);
        let body_size = body_font_size(&lines);
        let raw_text = build_raw_text(&mut lines);

        let (headings, source) = detect_headings(&lines, body_size, &content.outline, &self.config);
        let sections = segment_sections(&raw_text, &lines, &headings, self.config.language);

        let metadata = extract_metadata(&lines, &content.info, &sections, paper_id);
        let links = extract_links(content, &lines);
        let numeric = detect_numeric_citations(&raw_text);

        tracing::info!(
            paper_id,
            pages = content.pages.len(),
            lines = lines.len(),
            sections = sections.len(),
            links = links.len() + numeric.len(),
            heading_source = ?source,
            "parsed document"
        );

        DocumentBuilder::new(raw_text)
            .metadata(metadata)
            .sections(sections)
            .pages(content.page_info())
            .links(links)
            .links(numeric)
            .build()
    }

    /// Load a PDF through `backend` and parse it.
    pub fn parse_file(
        &self,
        backend: &dyn PdfBackend,
        pdf_path: &Path,
        paper_id: &str,
    ) -> Result<Document, ParseError> {
        let content = backend.load(pdf_path)?;
        Ok(self.parse_content(&content, paper_id))
    }

    /// Parse a paper, reusing `parsed.json` when present.
    ///
    /// A fresh parse also writes `metadata.json` and records the title in the
    /// store index. Nothing is cached when the backend fails.
    pub fn parse_paper(
        &self,
        store: &ArtifactStore,
        backend: &dyn PdfBackend,
        paper_id: &PaperId,
        pdf_path: &Path,
        force: bool,
    ) -> Result<Document, ParseError> {
        store.get_or_compute(paper_id, ArtifactKind::Parsed, force, || {
            let document = self.parse_file(backend, pdf_path, paper_id.as_str())?;
            store.save(paper_id, ArtifactKind::Metadata, &document.metadata)?;
            if !document.metadata.title.is_empty() {
                store.update_index(paper_id, &document.metadata.title)?;
            }
            Ok(document)
        })
    }
}
