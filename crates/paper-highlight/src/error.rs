use paper_core::{BackendError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("page {page} is out of range (document has {pages} pages)")]
    PageOutOfRange { page: usize, pages: usize },
}
