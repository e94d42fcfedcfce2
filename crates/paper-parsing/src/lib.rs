use std::path::Path;

pub mod config;
pub mod headings;
pub mod lines;
pub mod links;
pub mod metadata;
pub mod parser;
pub mod segment;
pub mod text_processing;

pub use config::{Language, ListOverride, ParsingConfig, ParsingConfigBuilder, ParsingConfigError};
pub use headings::{Heading, HeadingShape, HeadingSource, RejectReason, Verdict};
pub use lines::Line;
pub use links::{LinkCollector, detect_numeric_citations};
pub use parser::{DocumentBuilder, DocumentParser, ParseError};
pub use segment::FULL_DOCUMENT_HEADING;
// Re-export domain types from core (canonical definitions live there)
pub use paper_core::{ArtifactStore, BackendError, Document, PaperId, PdfBackend};

/// Parse a paper with the default configuration, reusing the cached
/// `parsed.json` when present.
///
/// Pipeline:
/// 1. Read glyphs, outline and link annotations via `backend`
/// 2. Merge glyph runs into lines and build the document text
/// 3. Detect headings (outline first, font heuristics otherwise)
/// 4. Segment sections and split sentences
/// 5. Extract metadata, links and numeric citation markers
pub fn parse_paper(
    store: &ArtifactStore,
    backend: &dyn PdfBackend,
    paper_id: &PaperId,
    pdf_path: &Path,
) -> Result<Document, ParseError> {
    DocumentParser::new().parse_paper(store, backend, paper_id, pdf_path, false)
}
