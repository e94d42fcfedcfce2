//! Navigable reference IDs over a parsed [`Document`](paper_core::Document).
//!
//! - [`registry`]: deterministic `s1`/`f1`/`e1`/`c1` IDs for sections, layout
//!   elements, external links and citations
//! - [`annotate`]: inline `[ref=cN]` tags placed right after each citation
//! - [`resolve`]: bibliography entry text behind a citation

pub mod annotate;
pub mod citation;
pub mod registry;
pub mod resolve;

pub use annotate::{annotate_document, annotate_text, find_cite_end};
pub use citation::{citation_number, citation_surname, citation_year};
pub use registry::{RefEntry, RefKind, RefRegistry, RefSource, build_ref_registry};
pub use resolve::resolve_citation_text;
