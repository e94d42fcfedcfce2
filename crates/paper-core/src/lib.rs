pub mod backend;
pub mod config_file;
pub mod content;
pub mod geometry;
pub mod model;
pub mod store;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend};
pub use content::{
    Glyph, GlyphRun, HighlightMark, LinkTarget, OutlineEntry, PageContent, PageRaster, PdfContent,
    PdfInfo, RawLink, TextLine,
};
pub use geometry::{PageBox, Rect};
pub use model::{
    Document, Highlight, HighlightColor, LayoutElement, LayoutKind, Link, LinkKind, Metadata,
    PageInfo, Section, Sentence, Span,
};
pub use store::{ArtifactKind, ArtifactStore, PaperId, StoreError};
