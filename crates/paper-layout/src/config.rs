use std::path::PathBuf;

use paper_core::config_file::LayoutSection;

/// Hugging Face repository holding the DocStructBench ONNX export.
pub const DEFAULT_MODEL_REPO: &str = "wybxc/DocLayout-YOLO-DocStructBench-onnx";
pub const DEFAULT_MODEL_FILE: &str = "doclayout_yolo_docstructbench_imgsz1024.onnx";

/// Settings for rendering, detection and caption search.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Render resolution for detection.
    pub dpi: f32,
    /// Detections below this confidence are dropped.
    pub confidence: f32,
    pub model_repo: String,
    pub model_file: String,
    /// Explicit model file; skips the cache lookup and download.
    pub model_path: Option<PathBuf>,
    pub allow_download: bool,
    /// Height in points of the caption search band below figures and above
    /// tables.
    pub caption_band: f64,
    /// Write a PNG crop of every figure and table next to the layout cache.
    pub save_crops: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            dpi: 150.0,
            confidence: 0.25,
            model_repo: DEFAULT_MODEL_REPO.to_string(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            model_path: None,
            allow_download: true,
            caption_band: 50.0,
            save_crops: false,
        }
    }
}

impl LayoutConfig {
    /// Defaults overlaid with the `[layout]` section of the config file.
    pub fn from_section(section: &LayoutSection) -> Self {
        let defaults = Self::default();
        Self {
            dpi: section.dpi.filter(|d| *d > 0.0).unwrap_or(defaults.dpi),
            confidence: section
                .confidence
                .filter(|c| (0.0..=1.0).contains(c))
                .unwrap_or(defaults.confidence),
            model_repo: section.model_repo.clone().unwrap_or(defaults.model_repo),
            model_file: section.model_file.clone().unwrap_or(defaults.model_file),
            model_path: section.model_path.as_ref().map(PathBuf::from),
            allow_download: section.allow_download.unwrap_or(defaults.allow_download),
            caption_band: section
                .caption_band
                .filter(|b| *b > 0.0)
                .unwrap_or(defaults.caption_band),
            save_crops: defaults.save_crops,
        }
    }
}
