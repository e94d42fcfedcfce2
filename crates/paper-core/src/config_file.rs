use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub storage: Option<StorageConfig>,
    pub parsing: Option<ParsingSection>,
    pub layout: Option<LayoutSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the paper store; defaults to `~/.papers`.
    pub root: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsingSection {
    pub heading_size_ratio: Option<f64>,
    pub min_outline_entries: Option<usize>,
    pub max_heading_chars: Option<usize>,
    pub merge_size_tolerance: Option<f64>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSection {
    pub dpi: Option<f32>,
    pub confidence: Option<f32>,
    pub model_path: Option<String>,
    pub model_repo: Option<String>,
    pub model_file: Option<String>,
    pub allow_download: Option<bool>,
    pub caption_band: Option<f64>,
}

/// Platform config directory path: `<config_dir>/paper/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("paper").join("config.toml"))
}

/// Load config by cascading CWD `.paper.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".paper.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

fn pick<S, T: Clone>(
    overlay: &Option<S>,
    base: &Option<S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        storage: Some(StorageConfig {
            root: pick(&overlay.storage, &base.storage, |s| s.root.clone()),
        }),
        parsing: Some(ParsingSection {
            heading_size_ratio: pick(&overlay.parsing, &base.parsing, |p| p.heading_size_ratio),
            min_outline_entries: pick(&overlay.parsing, &base.parsing, |p| p.min_outline_entries),
            max_heading_chars: pick(&overlay.parsing, &base.parsing, |p| p.max_heading_chars),
            merge_size_tolerance: pick(&overlay.parsing, &base.parsing, |p| {
                p.merge_size_tolerance
            }),
            language: pick(&overlay.parsing, &base.parsing, |p| p.language.clone()),
        }),
        layout: Some(LayoutSection {
            dpi: pick(&overlay.layout, &base.layout, |l| l.dpi),
            confidence: pick(&overlay.layout, &base.layout, |l| l.confidence),
            model_path: pick(&overlay.layout, &base.layout, |l| l.model_path.clone()),
            model_repo: pick(&overlay.layout, &base.layout, |l| l.model_repo.clone()),
            model_file: pick(&overlay.layout, &base.layout, |l| l.model_file.clone()),
            allow_download: pick(&overlay.layout, &base.layout, |l| l.allow_download),
            caption_band: pick(&overlay.layout, &base.layout, |l| l.caption_band),
        }),
    }
}

/// Save the config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
