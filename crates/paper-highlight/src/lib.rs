//! Highlighting for parsed papers.
//!
//! Finds text on PDF pages, converts hits to page-relative positions for
//! viewers, persists highlight records per paper, and writes an annotated copy
//! of the PDF whenever the set changes.

pub mod coords;
pub mod error;
pub mod highlighter;
pub mod search;
pub mod store;

pub use coords::{HighlightPayload, ScaledPosition, ScaledRect, match_to_json, to_scaled_position};
pub use error::HighlightError;
pub use highlighter::{Highlighter, annotate_pdf};
pub use search::{SearchMatch, SectionMatch, search_in_document, search_pdf};
pub use store::{NewHighlight, add_highlight, load_highlights, remove_highlight};
