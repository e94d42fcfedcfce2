use std::path::Path;

use paper_core::{
    ArtifactKind, ArtifactStore, LayoutElement, LayoutKind, PageBox, PageContent, PageRaster,
    PaperId, PdfBackend, PdfContent,
};

use crate::captions::{assign_labels, extract_caption};
use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::model::SharedModel;

/// Runs a layout model over every page of a PDF.
pub struct LayoutDetector {
    model: SharedModel,
    config: LayoutConfig,
}

impl LayoutDetector {
    pub fn new(model: SharedModel, config: LayoutConfig) -> Self {
        Self { model, config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Detect figures, tables and equations on one page, in PDF points.
    ///
    /// Classes other than those three are dropped, as are detections below the
    /// configured confidence. When `crop_dir` is given, a PNG crop of every
    /// figure and table is written there.
    pub fn detect_page(
        &self,
        backend: &dyn PdfBackend,
        pdf_path: &Path,
        page: &PageContent,
        crop_dir: Option<&Path>,
    ) -> Result<Vec<LayoutElement>, LayoutError> {
        let raster = backend.render_page(pdf_path, page.number, self.config.dpi)?;
        let detections = {
            let mut model = self
                .model
                .lock()
                .map_err(|_| LayoutError::Inference("layout model lock poisoned".into()))?;
            model.detect(&raster)?
        };

        let scale_x = raster.page_width / f64::from(raster.width.max(1));
        let scale_y = raster.page_height / f64::from(raster.height.max(1));

        let mut elements = Vec::new();
        for detection in detections {
            if detection.confidence < self.config.confidence {
                continue;
            }
            let Some(kind) = LayoutKind::from_class_name(&detection.class_name) else {
                continue;
            };
            let bbox = PageBox {
                x0: f64::from(detection.x0) * scale_x,
                y0: f64::from(detection.y0) * scale_y,
                x1: f64::from(detection.x1) * scale_x,
                y1: f64::from(detection.y1) * scale_y,
                page: page.number,
            };
            let mut element = LayoutElement {
                kind,
                bbox,
                confidence: detection.confidence,
                caption: String::new(),
                label: String::new(),
                image_path: String::new(),
            };
            if let Some(dir) = crop_dir.filter(|_| kind != LayoutKind::Equation) {
                let name = format!("p{}_{}_{}.png", page.number + 1, kind, elements.len() + 1);
                let path = dir.join(name);
                match save_crop(&raster, &element.bbox, &path) {
                    Ok(()) => element.image_path = path.display().to_string(),
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save crop"),
                }
            }
            elements.push(element);
        }

        tracing::debug!(page = page.number, elements = elements.len(), "layout page done");
        Ok(elements)
    }

    /// Detect over all pages, then order by (page, y0), assign per-kind labels
    /// and attach captions.
    pub fn detect_all_pages(
        &self,
        backend: &dyn PdfBackend,
        pdf_path: &Path,
        content: &PdfContent,
        crop_dir: Option<&Path>,
    ) -> Result<Vec<LayoutElement>, LayoutError> {
        let mut elements = Vec::new();
        for page in &content.pages {
            elements.extend(self.detect_page(backend, pdf_path, page, crop_dir)?);
        }

        elements.sort_by(|a, b| {
            a.bbox
                .page
                .cmp(&b.bbox.page)
                .then(a.bbox.y0.total_cmp(&b.bbox.y0))
        });
        assign_labels(&mut elements);

        for element in &mut elements {
            if let Some(page) = content.page(element.bbox.page) {
                if let Some(caption) = extract_caption(page, element, self.config.caption_band) {
                    element.caption = caption;
                }
            }
        }

        tracing::info!(
            pages = content.pages.len(),
            figures = elements.iter().filter(|e| e.kind == LayoutKind::Figure).count(),
            tables = elements.iter().filter(|e| e.kind == LayoutKind::Table).count(),
            equations = elements.iter().filter(|e| e.kind == LayoutKind::Equation).count(),
            "layout detection complete"
        );
        Ok(elements)
    }
}

fn save_crop(raster: &PageRaster, bbox: &PageBox, path: &Path) -> Result<(), String> {
    let image = image::RgbImage::from_raw(raster.width, raster.height, raster.pixels.clone())
        .ok_or_else(|| "raster size does not match its pixel buffer".to_string())?;

    let to_px_x = f64::from(raster.width) / raster.page_width;
    let to_px_y = f64::from(raster.height) / raster.page_height;
    let x0 = ((bbox.x0 * to_px_x).floor().max(0.0) as u32).min(raster.width);
    let y0 = ((bbox.y0 * to_px_y).floor().max(0.0) as u32).min(raster.height);
    let x1 = ((bbox.x1 * to_px_x).ceil().max(0.0) as u32).min(raster.width);
    let y1 = ((bbox.y1 * to_px_y).ceil().max(0.0) as u32).min(raster.height);
    if x1 <= x0 || y1 <= y0 {
        return Err("empty crop".into());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    image::imageops::crop_imm(&image, x0, y0, x1 - x0, y1 - y0)
        .to_image()
        .save(path)
        .map_err(|e| e.to_string())
}

/// Layout elements for a paper, from `layout.json` unless `force` is set.
///
/// On a miss the PDF is loaded through `backend`, every page is detected and
/// the result is cached. Crops, when enabled, go to `<paper>/figures/`.
pub fn detect_layout(
    store: &ArtifactStore,
    backend: &dyn PdfBackend,
    detector: &LayoutDetector,
    paper_id: &PaperId,
    pdf_path: &Path,
    force: bool,
) -> Result<Vec<LayoutElement>, LayoutError> {
    store.get_or_compute(paper_id, ArtifactKind::Layout, force, || {
        let content = backend.load(pdf_path)?;
        let crop_dir = detector
            .config()
            .save_crops
            .then(|| store.paper_dir(paper_id).join("figures"));
        detector.detect_all_pages(backend, pdf_path, &content, crop_dir.as_deref())
    })
}
