//! Figure, table and equation detection on rendered PDF pages.
//!
//! A [`LayoutModel`] sees one page raster at a time and returns detections in
//! pixels; [`LayoutDetector`] converts them to PDF points, filters and orders
//! them, assigns labels like "Figure 2" and attaches nearby captions. Results
//! are cached per paper as `layout.json`.
//!
//! The bundled model is DocLayout-YOLO (DocStructBench) through ONNX Runtime,
//! behind the `onnx` feature. Without it, [`load_default_model`] fails with
//! [`LayoutError::ModelUnavailable`] and callers can still plug in their own
//! [`LayoutModel`].

pub mod captions;
pub mod config;
pub mod detector;
pub mod error;
pub mod model;
#[cfg(feature = "onnx")]
pub mod yolo;

use std::path::Path;

pub use captions::{assign_labels, extract_caption};
pub use config::LayoutConfig;
pub use detector::{LayoutDetector, detect_layout};
pub use error::LayoutError;
pub use model::{Detection, LayoutModel, SharedModel, shared};

/// Construct the bundled layout model, downloading weights into
/// `<store_root>/.models/` on first use when allowed.
#[cfg(feature = "onnx")]
pub fn load_default_model(config: &LayoutConfig, store_root: &Path) -> Result<SharedModel, LayoutError> {
    let path = yolo::ModelLocator::new(store_root, config).locate()?;
    let model = yolo::DocLayoutYolo::load(&path)?;
    Ok(shared(model))
}

#[cfg(not(feature = "onnx"))]
pub fn load_default_model(_config: &LayoutConfig, _store_root: &Path) -> Result<SharedModel, LayoutError> {
    Err(LayoutError::ModelUnavailable(
        "layout detection needs the `onnx` feature: rebuild with `--features layout`".into(),
    ))
}
