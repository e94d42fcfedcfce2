use std::path::PathBuf;

use paper_core::{BackendError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    /// No model can be constructed; the message says what to install or where
    /// to put the weights.
    #[error("layout model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("failed to load layout model from {path}: {message}")]
    ModelLoad { path: PathBuf, message: String },
    #[error("layout inference failed: {0}")]
    Inference(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
