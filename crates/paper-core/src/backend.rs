use std::path::Path;

use thiserror::Error;

use crate::content::{HighlightMark, PageRaster, PdfContent};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("failed to extract content: {0}")]
    ExtractionError(String),
    #[error("failed to render page {page}: {message}")]
    RenderError { page: usize, message: String },
    #[error("failed to write annotated PDF: {0}")]
    WriteError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF access backends.
///
/// Implementors provide the low-level steps that need a PDF library: reading
/// glyphs, outline, link annotations and document info; rasterizing a page;
/// and writing highlight annotations. Everything else in the pipeline works on
/// the returned [`PdfContent`].
pub trait PdfBackend: Send + Sync {
    /// Read the text, geometry and navigation structure of a PDF file.
    fn load(&self, path: &Path) -> Result<PdfContent, BackendError>;

    /// Render a 0-indexed page to RGB pixels at `dpi`.
    fn render_page(&self, path: &Path, page: usize, dpi: f32) -> Result<PageRaster, BackendError>;

    /// Write a copy of `source` to `output` carrying `marks` as highlight
    /// annotations. The source file is never modified.
    fn write_highlights(
        &self,
        source: &Path,
        output: &Path,
        marks: &[HighlightMark],
    ) -> Result<(), BackendError>;
}
