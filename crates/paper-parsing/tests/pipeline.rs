//! End-to-end tests for the parsing pipeline.
//!
//! A fake backend hands out a small two-page paper built from glyph runs, so
//! no PDF library is needed.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use paper_core::{
    ArtifactKind, ArtifactStore, BackendError, GlyphRun, HighlightMark, LinkKind, LinkTarget,
    PageContent, PageRaster, PaperId, PdfBackend, PdfContent, RawLink, Rect, TextLine,
};
use paper_parsing::{DocumentParser, FULL_DOCUMENT_HEADING, ParseError};

/// Lines stacked 14pt apart from the top margin, 5pt per character at 10pt.
fn page(number: usize, lines: &[(&str, f64, &str)]) -> PageContent {
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

fn sample_paper() -> PdfContent {
    let first = page(
        0,
        &[
            ("Attention Is All You Need", 17.0, "Times"),
            ("Ashish Vaswani Noam Shazeer", 11.0, "Times"),
            ("Abstract", 10.0, "Times-Bold"),
            ("We propose a new network architecture. It relies on attention [1].", 10.0, "Times"),
            ("1 Introduction", 12.0, "Times-Bold"),
            ("Recurrent models dominate. Attention helps.", 10.0, "Times"),
        ],
    );
    let second = page(
        1,
        &[
            ("2 Method", 12.0, "Times-Bold"),
            ("We stack layers (Vaswani et al., 2017) and more.", 10.0, "Times"),
            ("References", 12.0, "Times-Bold"),
            ("[1] D. Bahdanau. Neural machine translation. 2014.", 10.0, "Times"),
        ],
    );

    // "(Vaswani et al., 2017)" is characters 16..38 of the second line on page 1
    let y = 72.0 + 14.0;
    let citation = RawLink {
        page: 1,
        rect: Rect::new(72.0 + 5.0 * 16.0, y, 72.0 + 5.0 * 38.0, y + 10.0),
        target: LinkTarget::Named {
            name: "cite.vaswani2017".into(),
            page: Some(1),
            xy: Some([72.0, 100.0]),
        },
    };
    let homepage = RawLink {
        page: 0,
        rect: Rect::new(72.0, 72.0 + 14.0 * 5.0, 200.0, 72.0 + 14.0 * 5.0 + 10.0),
        target: LinkTarget::Uri("https://example.org/transformer".into()),
    };

    PdfContent {
        pages: vec![first, second],
        links: vec![homepage, citation],
        ..Default::default()
    }
}

struct FakeBackend {
    content: Option<PdfContent>,
    loads: AtomicUsize,
}

impl FakeBackend {
    fn new(content: PdfContent) -> Self {
        Self {
            content: Some(content),
            loads: AtomicUsize::new(0),
        }
    }

    fn broken() -> Self {
        Self {
            content: None,
            loads: AtomicUsize::new(0),
        }
    }
}

impl PdfBackend for FakeBackend {
    fn load(&self, _path: &Path) -> Result<PdfContent, BackendError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.content
            .clone()
            .ok_or_else(|| BackendError::OpenError("not a PDF".into()))
    }

    fn render_page(&self, _path: &Path, page: usize, _dpi: f32) -> Result<PageRaster, BackendError> {
        Err(BackendError::RenderError {
            page,
            message: "no raster".into(),
        })
    }

    fn write_highlights(
        &self,
        _source: &Path,
        _output: &Path,
        _marks: &[HighlightMark],
    ) -> Result<(), BackendError> {
        Ok(())
    }
}

#[test]
fn parse_content_builds_sections_and_links() {
    let doc = DocumentParser::new().parse_content(&sample_paper(), "1706.03762");

    let headings: Vec<&str> = doc.sections.iter().map(|s| s.heading.as_str()).collect();
    assert_eq!(headings, vec!["Abstract", "1 Introduction", "2 Method", "References"]);

    assert_eq!(doc.metadata.title, "Attention Is All You Need");
    assert_eq!(doc.metadata.url, "https://arxiv.org/abs/1706.03762");
    assert!(doc.metadata.abstract_text.starts_with("We propose a new network architecture."));

    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.page_size(1), Some((612.0, 792.0)));

    let method = &doc.sections[2];
    assert_eq!(method.page_start, 1);
    assert_eq!(method.sentences.len(), 1);
    assert_eq!(method.sentences[0].text, "We stack layers (Vaswani et al., 2017) and more.");

    let external: Vec<_> = doc.links.iter().filter(|l| l.kind == LinkKind::External).collect();
    assert_eq!(external.len(), 1);
    assert_eq!(external[0].url, "https://example.org/transformer");

    let citations: Vec<_> = doc.citations().collect();
    assert_eq!(citations.len(), 2);
    assert_eq!(citations[0].text, "(Vaswani et al., 2017)");
    assert_eq!(citations[0].dest_name, "cite.vaswani2017");
    // "[1]" occurs twice but is reported once, with an unresolved page
    assert_eq!(citations[1].text, "[1]");
    assert_eq!(citations[1].page, 0);
    assert_eq!(&doc.raw_text[citations[1].span.start..citations[1].span.end], "[1]");
}

#[test]
fn section_spans_tile_the_text() {
    let doc = DocumentParser::new().parse_content(&sample_paper(), "1706.03762");

    assert_eq!(doc.sections[0].spans[0].start, 0);
    for pair in doc.sections.windows(2) {
        assert_eq!(pair[0].spans[0].end, pair[1].spans[0].start);
    }
    assert_eq!(doc.sections.last().unwrap().spans[0].end, doc.raw_text.len());

    for section in &doc.sections {
        for sentence in &section.sentences {
            let slice = &doc.raw_text[sentence.span.start..sentence.span.end];
            assert_eq!(slice.replace('\n', " "), sentence.text);
        }
    }
}

#[test]
fn text_without_headings_is_one_section() {
    let content = PdfContent {
        pages: vec![page(
            0,
            &[
                ("plain notes without any structure", 10.0, "Times"),
                ("just two lines of text.", 10.0, "Times"),
            ],
        )],
        ..Default::default()
    };
    let doc = DocumentParser::new().parse_content(&content, "notes");
    assert_eq!(doc.sections.len(), 1);
    assert_eq!(doc.sections[0].heading, FULL_DOCUMENT_HEADING);
    assert_eq!(doc.sections[0].spans[0].end, doc.raw_text.len());
}

#[test]
fn parse_paper_caches_and_indexes() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let backend = FakeBackend::new(sample_paper());
    let id = PaperId::new("1706.03762").unwrap();
    let parser = DocumentParser::new();
    let pdf = store.pdf_path(&id);

    let first = parser.parse_paper(&store, &backend, &id, &pdf, false).unwrap();
    assert!(store.exists(&id, ArtifactKind::Parsed));
    assert!(store.exists(&id, ArtifactKind::Metadata));
    assert_eq!(
        store.load_index().get("1706.03762").map(String::as_str),
        Some("Attention Is All You Need")
    );

    let second = parser.parse_paper(&store, &backend, &id, &pdf, false).unwrap();
    assert_eq!(backend.loads.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);

    parser.parse_paper(&store, &backend, &id, &pdf, true).unwrap();
    assert_eq!(backend.loads.load(Ordering::SeqCst), 2);

    let on_disk: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.artifact_path(&id, ArtifactKind::Parsed)).unwrap())
            .unwrap();
    assert!(on_disk["sections"].is_array());
    assert!(on_disk["raw_text"].is_string());
}

#[test]
fn backend_failure_caches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let id = PaperId::new("broken").unwrap();

    let err = DocumentParser::new()
        .parse_paper(&store, &FakeBackend::broken(), &id, Path::new("missing.pdf"), false)
        .unwrap_err();
    assert!(matches!(err, ParseError::Backend(_)));
    assert!(!store.exists(&id, ArtifactKind::Parsed));
}
