use std::sync::{Arc, Mutex};

use paper_core::PageRaster;

use crate::error::LayoutError;

/// One detected region in raster pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Class name as emitted by the model, e.g. `figure` or `isolate_formula`.
    pub class_name: String,
    pub confidence: f32,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// An object-detection model over rendered pages.
///
/// Inference needs exclusive access, so a model is shared as a
/// [`SharedModel`] and locked per page.
pub trait LayoutModel: Send {
    fn detect(&mut self, raster: &PageRaster) -> Result<Vec<Detection>, LayoutError>;
}

/// Caller-owned model handle, constructed once and reused across papers.
pub type SharedModel = Arc<Mutex<dyn LayoutModel>>;

pub fn shared<M: LayoutModel + 'static>(model: M) -> SharedModel {
    Arc::new(Mutex::new(model))
}
