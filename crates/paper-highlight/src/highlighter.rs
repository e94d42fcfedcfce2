use std::path::{Path, PathBuf};

use paper_core::{
    ArtifactKind, ArtifactStore, BackendError, Document, Highlight, HighlightMark, PaperId,
    PdfBackend, StoreError,
};
use tempfile::NamedTempFile;

use crate::error::HighlightError;
use crate::store::{NewHighlight, add_highlight, load_highlights, remove_highlight};

/// Write `highlights` as annotations onto a copy of `source` at `output`.
///
/// The copy is produced in a temp file next to `output` and renamed into
/// place, so a failed write leaves any previous output intact.
pub fn annotate_pdf(
    backend: &dyn PdfBackend,
    source: &Path,
    output: &Path,
    highlights: &[Highlight],
) -> Result<(), HighlightError> {
    let marks: Vec<HighlightMark> = highlights
        .iter()
        .map(|h| HighlightMark {
            page: h.page,
            rects: h.rects.clone(),
            color: h.color.rgb(),
            note: h.note.clone(),
        })
        .collect();

    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    let tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    backend.write_highlights(source, tmp.path(), &marks)?;
    tmp.persist(output)
        .map_err(|e| BackendError::WriteError(format!("{}: {}", output.display(), e.error)))?;
    Ok(())
}

/// Highlight CRUD that keeps `paper_annotated.pdf` in sync.
///
/// Every change rewrites the annotated copy from the untouched `paper.pdf`
/// with the full current highlight set.
pub struct Highlighter<'a> {
    store: &'a ArtifactStore,
    backend: &'a dyn PdfBackend,
}

impl<'a> Highlighter<'a> {
    pub fn new(store: &'a ArtifactStore, backend: &'a dyn PdfBackend) -> Self {
        Self { store, backend }
    }

    pub fn list(&self, paper_id: &PaperId) -> Vec<Highlight> {
        load_highlights(self.store, paper_id)
    }

    /// Persist a highlight and regenerate the annotated PDF.
    ///
    /// When the paper has been parsed, the page must exist in it.
    pub fn add(&self, paper_id: &PaperId, new: NewHighlight) -> Result<Highlight, HighlightError> {
        if let Some(doc) = self.store.load::<Document>(paper_id, ArtifactKind::Parsed) {
            let pages = doc.pages.len();
            if pages > 0 && new.page >= pages {
                return Err(HighlightError::PageOutOfRange { page: new.page, pages });
            }
        }
        let highlight = add_highlight(self.store, paper_id, new)?;
        self.regenerate(paper_id)?;
        Ok(highlight)
    }

    /// Remove a highlight. Returns `false` and leaves everything untouched
    /// when the id is unknown.
    pub fn remove(&self, paper_id: &PaperId, highlight_id: u64) -> Result<bool, HighlightError> {
        if !remove_highlight(self.store, paper_id, highlight_id)? {
            return Ok(false);
        }
        self.regenerate(paper_id)?;
        Ok(true)
    }

    /// Rewrite the annotated copy. `None` when the paper has no source PDF in
    /// the store.
    pub fn regenerate(&self, paper_id: &PaperId) -> Result<Option<PathBuf>, HighlightError> {
        let source = self.store.pdf_path(paper_id);
        if !source.is_file() {
            tracing::warn!(paper_id = %paper_id, path = %source.display(), "no source PDF, annotated copy not written");
            return Ok(None);
        }
        let output = self.store.annotated_pdf_path(paper_id);
        let highlights = load_highlights(self.store, paper_id);
        annotate_pdf(self.backend, &source, &output, &highlights)?;
        tracing::info!(paper_id = %paper_id, highlights = highlights.len(), "annotated PDF written");
        Ok(Some(output))
    }
}
