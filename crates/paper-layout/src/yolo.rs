//! DocLayout-YOLO (DocStructBench) through ONNX Runtime.
//!
//! The model takes a letterboxed 1024×1024 RGB tensor and emits
//! `[1, N, 6]` rows of `x1, y1, x2, y2, confidence, class` in input space.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use std::path::{Path, PathBuf};

use hf_hub::api::sync::ApiBuilder;
use ndarray::Array4;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
};
use ort::session::Session;
use paper_core::PageRaster;

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::model::{Detection, LayoutModel};

/// DocStructBench class table, indexed by the model's class id.
pub const DOCSTRUCTBENCH_CLASSES: &[&str] = &[
    "title",
    "plain text",
    "abandon",
    "figure",
    "figure_caption",
    "table",
    "table_caption",
    "table_footnote",
    "isolate_formula",
    "formula_caption",
];

pub const INPUT_SIZE: usize = 1024;

/// Scale and padding of a letterboxed image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, target: usize) -> Self {
        let target_f = target as f32;
        let scale = (target_f / height as f32).min(target_f / width as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((target_f - new_w) / 2.0).floor(),
            pad_y: ((target_f - new_h) / 2.0).floor(),
        }
    }

    /// Map a model-space coordinate back to the source image.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

pub struct DocLayoutYolo {
    session: Session,
    input_size: usize,
}

impl std::fmt::Debug for DocLayoutYolo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocLayoutYolo")
            .field("session", &"<Session>")
            .field("input_size", &self.input_size)
            .finish()
    }
}

impl DocLayoutYolo {
    /// Load the model, preferring CUDA, then CoreML, then CPU.
    pub fn load(model_path: &Path) -> Result<Self, LayoutError> {
        let load_err = |e: ort::Error| LayoutError::ModelLoad {
            path: model_path.to_path_buf(),
            message: e.to_string(),
        };
        tracing::info!(path = %model_path.display(), "loading DocLayout-YOLO");
        let session = Session::builder()
            .map_err(load_err)?
            .with_execution_providers([
                CUDAExecutionProvider::default().build(),
                CoreMLExecutionProvider::default().build(),
                CPUExecutionProvider::default().build(),
            ])
            .map_err(load_err)?
            .commit_from_file(model_path)
            .map_err(load_err)?;
        Ok(Self {
            session,
            input_size: INPUT_SIZE,
        })
    }

    /// Nearest-neighbour letterbox into an NCHW tensor on a grey (0.5) canvas.
    fn preprocess(&self, raster: &PageRaster) -> Result<(Array4<f32>, Letterbox), LayoutError> {
        let target = self.input_size;
        let (w, h) = (raster.width as usize, raster.height as usize);
        if w == 0 || h == 0 || raster.pixels.len() < w * h * 3 {
            return Err(LayoutError::Inference("empty or truncated page raster".into()));
        }
        let letterbox = Letterbox::fit(raster.width, raster.height, target);
        let new_w = ((w as f32 * letterbox.scale).round() as usize).min(target);
        let new_h = ((h as f32 * letterbox.scale).round() as usize).min(target);
        let (pad_x, pad_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);

        let mut input = Array4::<f32>::from_elem((1, 3, target, target), 0.5);
        let out = input
            .as_slice_mut()
            .ok_or_else(|| LayoutError::Inference("input tensor not contiguous".into()))?;
        let channel = target * target;
        let step_x = w as f32 / new_w as f32;
        let step_y = h as f32 / new_h as f32;

        for dy in 0..new_h {
            let sy = (((dy as f32 + 0.5) * step_y) as usize).min(h - 1);
            let row = (pad_y + dy) * target;
            for dx in 0..new_w {
                let sx = (((dx as f32 + 0.5) * step_x) as usize).min(w - 1);
                let Some([r, g, b]) = raster.pixel(sx as u32, sy as u32) else {
                    continue;
                };
                let dst = row + pad_x + dx;
                out[dst] = f32::from(r) / 255.0;
                out[channel + dst] = f32::from(g) / 255.0;
                out[2 * channel + dst] = f32::from(b) / 255.0;
            }
        }
        Ok((input, letterbox))
    }
}

/// Decode `[1, N, 6]` output rows into detections in source pixels.
///
/// Boxes are clamped to the image; unknown class ids are skipped.
pub fn decode_output(
    shape: &[usize],
    data: &[f32],
    letterbox: Letterbox,
    width: u32,
    height: u32,
) -> Vec<Detection> {
    let rows = shape.get(1).copied().unwrap_or(0);
    let (w, h) = (width as f32, height as f32);
    let mut detections = Vec::new();
    for row in data.chunks_exact(6).take(rows) {
        let class_id = row[5] as usize;
        let Some(class_name) = DOCSTRUCTBENCH_CLASSES.get(class_id) else {
            continue;
        };
        let (x0, y0) = letterbox.unmap(row[0], row[1]);
        let (x1, y1) = letterbox.unmap(row[2], row[3]);
        detections.push(Detection {
            class_name: (*class_name).to_string(),
            confidence: row[4],
            x0: x0.clamp(0.0, w),
            y0: y0.clamp(0.0, h),
            x1: x1.clamp(0.0, w),
            y1: y1.clamp(0.0, h),
        });
    }
    detections
}

impl LayoutModel for DocLayoutYolo {
    fn detect(&mut self, raster: &PageRaster) -> Result<Vec<Detection>, LayoutError> {
        let (input, letterbox) = self.preprocess(raster)?;
        let infer_err = |e: ort::Error| LayoutError::Inference(e.to_string());

        let shape = input.shape().to_vec();
        let (data, _offset) = input.into_raw_vec_and_offset();
        let value = ort::value::Value::from_array((shape.as_slice(), data)).map_err(infer_err)?;

        let outputs = self
            .session
            .run(ort::inputs!["images" => value])
            .map_err(infer_err)?;
        let name = outputs
            .keys()
            .next()
            .ok_or_else(|| LayoutError::Inference("model produced no output".into()))?;
        let (out_shape, out_data) = outputs[name].try_extract_tensor::<f32>().map_err(infer_err)?;
        let out_shape: Vec<usize> = out_shape.iter().map(|&d| d as usize).collect();
        let out_data = out_data.to_vec();
        drop(outputs);

        Ok(decode_output(&out_shape, &out_data, letterbox, raster.width, raster.height))
    }
}

/// Finds the model file: explicit path, then `<store>/.models/<file>`, then a
/// download from the Hugging Face hub when allowed.
#[derive(Debug, Clone)]
pub struct ModelLocator {
    models_dir: PathBuf,
    repo: String,
    file: String,
    explicit: Option<PathBuf>,
    allow_download: bool,
}

impl ModelLocator {
    pub fn new(store_root: &Path, config: &LayoutConfig) -> Self {
        Self {
            models_dir: store_root.join(".models"),
            repo: config.model_repo.clone(),
            file: config.model_file.clone(),
            explicit: config.model_path.clone(),
            allow_download: config.allow_download,
        }
    }

    pub fn cached_path(&self) -> PathBuf {
        self.models_dir.join(&self.file)
    }

    pub fn locate(&self) -> Result<PathBuf, LayoutError> {
        if let Some(path) = &self.explicit {
            return if path.is_file() {
                Ok(path.clone())
            } else {
                Err(LayoutError::ModelUnavailable(format!(
                    "configured model_path {} does not exist",
                    path.display()
                )))
            };
        }

        let cached = self.cached_path();
        if cached.is_file() {
            return Ok(cached);
        }
        if !self.allow_download {
            return Err(LayoutError::ModelUnavailable(format!(
                "place {} at {} or enable allow_download",
                self.file,
                cached.display()
            )));
        }
        self.download(&cached)?;
        Ok(cached)
    }

    fn download(&self, dest: &Path) -> Result<(), LayoutError> {
        let unavailable = |what: &str, e: &dyn std::fmt::Display| {
            LayoutError::ModelUnavailable(format!("{what} {}/{}: {e}", self.repo, self.file))
        };
        tracing::info!(repo = %self.repo, file = %self.file, "downloading layout model (first time only)");

        let api = ApiBuilder::new()
            .with_progress(true)
            .with_cache_dir(self.models_dir.join("hub"))
            .build()
            .map_err(|e| unavailable("cannot reach the Hugging Face hub for", &e))?;
        let fetched = api
            .model(self.repo.clone())
            .get(&self.file)
            .map_err(|e| unavailable("failed to download", &e))?;

        std::fs::create_dir_all(&self.models_dir)
            .and_then(|()| std::fs::copy(&fetched, dest))
            .map_err(|e| unavailable("failed to store", &e))?;
        Ok(())
    }
}
