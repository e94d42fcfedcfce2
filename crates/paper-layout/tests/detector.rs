//! Detector tests with a scripted model and a fake backend.
//!
//! Pages render at twice their point size, so every detection is halved on
//! its way to PDF coordinates.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use paper_core::{
    ArtifactKind, ArtifactStore, BackendError, GlyphRun, HighlightMark, LayoutElement, LayoutKind,
    PageContent, PageRaster, PaperId, PdfBackend, PdfContent, TextLine,
};
use paper_layout::{
    Detection, LayoutConfig, LayoutDetector, LayoutError, LayoutModel, detect_layout, shared,
};

struct ScriptedModel {
    calls: Arc<AtomicUsize>,
}

fn detection(class_name: &str, confidence: f32, x0: f32, y0: f32, x1: f32, y1: f32) -> Detection {
    Detection {
        class_name: class_name.into(),
        confidence,
        x0,
        y0,
        x1,
        y1,
    }
}

impl LayoutModel for ScriptedModel {
    fn detect(&mut self, _raster: &PageRaster) -> Result<Vec<Detection>, LayoutError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        // Pages are visited in order, so even calls are page 0
        Ok(if call % 2 == 0 {
            vec![
                detection("table", 0.8, 120.0, 900.0, 1000.0, 1100.0),
                detection("plain text", 0.95, 144.0, 1300.0, 1000.0, 1500.0),
                detection("figure", 0.9, 144.0, 200.0, 1000.0, 600.0),
                detection("figure", 0.1, 144.0, 1200.0, 400.0, 1250.0),
            ]
        } else {
            vec![detection("isolate_formula", 0.7, 200.0, 400.0, 900.0, 460.0)]
        })
    }
}

struct FakeBackend {
    content: PdfContent,
    renders: AtomicUsize,
}

impl PdfBackend for FakeBackend {
    fn load(&self, _path: &Path) -> Result<PdfContent, BackendError> {
        Ok(self.content.clone())
    }

    fn render_page(&self, _path: &Path, page: usize, _dpi: f32) -> Result<PageRaster, BackendError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let page = self.content.page(page).ok_or(BackendError::RenderError {
            page,
            message: "no such page".into(),
        })?;
        let (width, height) = ((page.width * 2.0) as u32, (page.height * 2.0) as u32);
        Ok(PageRaster {
            width,
            height,
            pixels: vec![255; (width * height * 3) as usize],
            page_width: page.width,
            page_height: page.height,
        })
    }

    fn write_highlights(&self, _: &Path, _: &Path, _: &[HighlightMark]) -> Result<(), BackendError> {
        unimplemented!("not used by layout detection")
    }
}

fn page(number: usize, lines: &[(&str, f64)]) -> PageContent {
    PageContent {
        number,
        width: 612.0,
        height: 792.0,
        lines: lines
            .iter()
            .map(|(text, y)| TextLine::from_runs(vec![GlyphRun::from_text(text, 8.0, "Times", 72.0, *y)]))
            .collect(),
    }
}

fn backend() -> FakeBackend {
    FakeBackend {
        content: PdfContent {
            pages: vec![
                page(0, &[("Figure 1: Overview of the model.", 310.0), ("Table 1: Results.", 430.0)]),
                page(1, &[("Some prose on the second page.", 100.0)]),
            ],
            ..Default::default()
        },
        renders: AtomicUsize::new(0),
    }
}

fn detector(calls: &Arc<AtomicUsize>, config: LayoutConfig) -> LayoutDetector {
    LayoutDetector::new(shared(ScriptedModel { calls: Arc::clone(calls) }), config)
}

fn summary(elements: &[LayoutElement]) -> Vec<(LayoutKind, usize, &str)> {
    elements
        .iter()
        .map(|e| (e.kind, e.bbox.page, e.label.as_str()))
        .collect()
}

#[test]
fn test_detect_all_pages() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = backend();
    let detector = detector(&calls, LayoutConfig::default());
    let elements = detector
        .detect_all_pages(&backend, Path::new("paper.pdf"), &backend.content, None)
        .unwrap();

    assert_eq!(
        summary(&elements),
        vec![
            (LayoutKind::Figure, 0, "Figure 1"),
            (LayoutKind::Table, 0, "Table 1"),
            (LayoutKind::Equation, 1, "Eq. 1"),
        ]
    );

    let figure = &elements[0].bbox;
    assert_eq!((figure.x0, figure.y0, figure.x1, figure.y1), (72.0, 100.0, 500.0, 300.0));
    let table = &elements[1].bbox;
    assert_eq!((table.x0, table.y0, table.x1, table.y1), (60.0, 450.0, 500.0, 550.0));

    assert_eq!(elements[0].caption, "Figure 1: Overview of the model.");
    assert_eq!(elements[1].caption, "Table 1: Results.");
    assert_eq!(elements[2].caption, "");
    assert!(elements.iter().all(|e| e.image_path.is_empty()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_confidence_threshold_is_configurable() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = backend();
    let config = LayoutConfig {
        confidence: 0.05,
        ..Default::default()
    };
    let elements = detector(&calls, config)
        .detect_all_pages(&backend, Path::new("paper.pdf"), &backend.content, None)
        .unwrap();
    let figures = elements.iter().filter(|e| e.kind == LayoutKind::Figure).count();
    assert_eq!(figures, 2);
}

#[test]
fn test_detect_layout_is_cached() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let id = PaperId::new("1706.03762").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = backend();
    let detector = detector(&calls, LayoutConfig::default());
    let pdf = store.pdf_path(&id);

    let first = detect_layout(&store, &backend, &detector, &id, &pdf, false).unwrap();
    assert!(store.exists(&id, ArtifactKind::Layout));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let second = detect_layout(&store, &backend, &detector, &id, &pdf, false).unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 2, "cache hit must not run the model");

    detect_layout(&store, &backend, &detector, &id, &pdf, true).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(backend.renders.load(Ordering::SeqCst), 4);
}

#[test]
fn test_crops_written_for_figures_and_tables() {
    let dir = tempfile::tempdir().unwrap();
    let store = ArtifactStore::new(dir.path());
    let id = PaperId::new("crops").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = backend();
    let config = LayoutConfig {
        save_crops: true,
        ..Default::default()
    };
    let detector = detector(&calls, config);

    let elements = detect_layout(&store, &backend, &detector, &id, &store.pdf_path(&id), false).unwrap();
    let figures_dir = store.paper_dir(&id).join("figures");
    for element in &elements {
        match element.kind {
            LayoutKind::Equation => assert!(element.image_path.is_empty()),
            _ => {
                let path = Path::new(&element.image_path);
                assert!(path.starts_with(&figures_dir), "{}", element.image_path);
                assert!(path.is_file());
            }
        }
    }
}

#[test]
fn test_render_failure_propagates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = backend();
    let detector = detector(&calls, LayoutConfig::default());
    let missing = page(7, &[]);
    let err = detector
        .detect_page(&backend, Path::new("paper.pdf"), &missing, None)
        .unwrap_err();
    assert!(matches!(err, LayoutError::Backend(BackendError::RenderError { page: 7, .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
