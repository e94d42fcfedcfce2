use std::path::Path;

use mupdf::{Colorspace, Document, Matrix};

use paper_core::{BackendError, HighlightMark, PageRaster, PdfBackend, PdfContent};

mod annotate;
mod crypt;
mod objects;
mod structure;
mod text;

/// MuPDF and lopdf implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (AGPL-3.0) so the parsing heuristics do not transitively depend on it.
///
/// MuPDF provides glyph geometry and page rasters. Outline, link
/// annotations, document info and the incremental highlight writer go
/// through lopdf, which exposes the raw destination objects needed to keep
/// named destinations such as `cite.vaswani2017`.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

fn path_str(path: &Path) -> Result<&str, BackendError> {
    path.to_str()
        .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))
}

impl PdfBackend for MupdfBackend {
    fn load(&self, path: &Path) -> Result<PdfContent, BackendError> {
        let document = Document::open(path_str(path)?).map_err(|e| BackendError::OpenError(e.to_string()))?;
        let pages = text::extract_pages(&document)?;

        let structure = match lopdf::Document::load(path) {
            Ok(mut doc) => {
                if let Err(e) = crypt::decrypt_strings(&mut doc) {
                    tracing::warn!(path = %path.display(), error = %e, "could not decrypt, outline and link names may be unreadable");
                }
                Some(structure::read_structure(&doc))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "lopdf could not read the file, no outline or links");
                None
            }
        };
        let (outline, links, info) = structure
            .map(|s| (s.outline, s.links, s.info))
            .unwrap_or_default();

        tracing::debug!(
            path = %path.display(),
            pages = pages.len(),
            outline = outline.len(),
            links = links.len(),
            "pdf loaded"
        );
        Ok(PdfContent {
            pages,
            outline,
            links,
            info,
        })
    }

    fn render_page(&self, path: &Path, page: usize, dpi: f32) -> Result<PageRaster, BackendError> {
        let render_err = |message: String| BackendError::RenderError { page, message };

        let document = Document::open(path_str(path)?).map_err(|e| BackendError::OpenError(e.to_string()))?;
        let count = document.page_count().map_err(|e| render_err(e.to_string()))?;
        let index = i32::try_from(page)
            .ok()
            .filter(|&i| i < count)
            .ok_or_else(|| render_err(format!("document has {count} pages")))?;
        let pdf_page = document.load_page(index).map_err(|e| render_err(e.to_string()))?;
        let bounds = pdf_page.bounds().map_err(|e| render_err(e.to_string()))?;

        let scale = dpi / 72.0;
        let pixmap = pdf_page
            .to_pixmap(&Matrix::new_scale(scale, scale), &Colorspace::device_rgb(), 0.0, true)
            .map_err(|e| render_err(e.to_string()))?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let channels = usize::from(pixmap.n()).max(1);
        let samples = pixmap.samples();
        let expected = width as usize * height as usize;
        if samples.len() < expected * channels || channels < 3 {
            return Err(render_err(format!(
                "unexpected pixmap layout: {width}x{height}, {channels} channels, {} bytes",
                samples.len()
            )));
        }
        let pixels: Vec<u8> = samples
            .chunks_exact(channels)
            .take(expected)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();

        Ok(PageRaster {
            width,
            height,
            pixels,
            page_width: f64::from(bounds.x1 - bounds.x0),
            page_height: f64::from(bounds.y1 - bounds.y0),
        })
    }

    fn write_highlights(&self, source: &Path, output: &Path, marks: &[HighlightMark]) -> Result<(), BackendError> {
        annotate::write_highlights(source, output, marks)
    }
}
