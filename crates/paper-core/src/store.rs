//! Per-paper artifact store.
//!
//! Layout under the store root (default `~/.papers`):
//!
//! ```text
//! index.json                 {paper_id: title}
//! <paper_id>/paper.pdf
//! <paper_id>/parsed.json     Document
//! <paper_id>/layout.json     [LayoutElement]
//! <paper_id>/highlights.json [Highlight]
//! <paper_id>/metadata.json   Metadata
//! <paper_id>/paper_annotated.pdf
//! ```
//!
//! Every write goes through a temp file in the destination directory followed
//! by a rename, so readers never observe a half-written artifact. A file that
//! fails to deserialize is logged and treated as missing.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("invalid paper id {0:?}: nothing left after sanitizing")]
    InvalidPaperId(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("could not determine home directory for the paper store")]
    NoHomeDir,
}

impl StoreError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A paper identifier that is safe to use as a single path component.
///
/// Path separators become `_` and leading dots are stripped, so
/// `cs/0601001` maps to `cs_0601001` and `../etc/passwd` to `_etc_passwd`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaperId(String);

impl PaperId {
    pub fn new(raw: &str) -> Result<Self, StoreError> {
        let replaced = raw.replace(['/', '\\'], "_");
        let sanitized = replaced.trim_start_matches('.');
        if sanitized.is_empty() {
            return Err(StoreError::InvalidPaperId(raw.to_string()));
        }
        Ok(PaperId(sanitized.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PaperId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The JSON artifacts cached per paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Parsed,
    Layout,
    Highlights,
    Metadata,
}

impl ArtifactKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Parsed => "parsed.json",
            ArtifactKind::Layout => "layout.json",
            ArtifactKind::Highlights => "highlights.json",
            ArtifactKind::Metadata => "metadata.json",
        }
    }
}

const INDEX_FILE: &str = "index.json";
const PDF_FILE: &str = "paper.pdf";
const ANNOTATED_PDF_FILE: &str = "paper_annotated.pdf";

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `~/.papers`.
    pub fn open_default() -> Result<Self, StoreError> {
        dirs::home_dir()
            .map(|home| Self::new(home.join(".papers")))
            .ok_or(StoreError::NoHomeDir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paper_dir(&self, id: &PaperId) -> PathBuf {
        self.root.join(id.as_str())
    }

    pub fn ensure_paper_dir(&self, id: &PaperId) -> Result<PathBuf, StoreError> {
        let dir = self.paper_dir(id);
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        Ok(dir)
    }

    pub fn artifact_path(&self, id: &PaperId, kind: ArtifactKind) -> PathBuf {
        self.paper_dir(id).join(kind.file_name())
    }

    pub fn pdf_path(&self, id: &PaperId) -> PathBuf {
        self.paper_dir(id).join(PDF_FILE)
    }

    pub fn annotated_pdf_path(&self, id: &PaperId) -> PathBuf {
        self.paper_dir(id).join(ANNOTATED_PDF_FILE)
    }

    pub fn exists(&self, id: &PaperId, kind: ArtifactKind) -> bool {
        self.artifact_path(id, kind).is_file()
    }

    /// Read an artifact. Missing and unreadable files both yield `None`.
    pub fn load<T: DeserializeOwned>(&self, id: &PaperId, kind: ArtifactKind) -> Option<T> {
        read_json(&self.artifact_path(id, kind))
    }

    pub fn save<T: Serialize + ?Sized>(
        &self,
        id: &PaperId,
        kind: ArtifactKind,
        value: &T,
    ) -> Result<(), StoreError> {
        self.ensure_paper_dir(id)?;
        let bytes = serde_json::to_vec_pretty(value)?;
        write_atomic(&self.artifact_path(id, kind), &bytes)
    }

    /// Return the cached artifact, or run `compute`, cache its output and
    /// return it. `force` skips the cache lookup. Nothing is written when
    /// `compute` fails.
    pub fn get_or_compute<T, E, F>(
        &self,
        id: &PaperId,
        kind: ArtifactKind,
        force: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        F: FnOnce() -> Result<T, E>,
    {
        if !force && let Some(cached) = self.load(id, kind) {
            tracing::info!(paper_id = %id, artifact = kind.file_name(), "cache hit");
            return Ok(cached);
        }
        tracing::info!(paper_id = %id, artifact = kind.file_name(), force, "cache miss, computing");
        let value = compute()?;
        self.save(id, kind, &value)?;
        Ok(value)
    }

    /// The `{paper_id: title}` index. Corrupt or missing index reads as empty.
    pub fn load_index(&self) -> BTreeMap<String, String> {
        read_json(&self.root.join(INDEX_FILE)).unwrap_or_default()
    }

    pub fn update_index(&self, id: &PaperId, title: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut index = self.load_index();
        index.insert(id.to_string(), title.to_string());
        let bytes = serde_json::to_vec_pretty(&index)?;
        write_atomic(&self.root.join(INDEX_FILE), &bytes)
    }

    /// Paper ids with a directory in the store, sorted.
    pub fn list_papers(&self) -> Vec<PaperId> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut ids: Vec<PaperId> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| {
                let name = e.file_name();
                let name = name.to_str()?;
                if name.starts_with('.') {
                    return None;
                }
                PaperId::new(name).ok()
            })
            .collect();
        ids.sort();
        ids
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match std::fs::read(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read artifact");
            return None;
        }
    };
    match serde_json::from_slice(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt artifact, treating as missing");
            None
        }
    }
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StoreError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| StoreError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metadata;

    #[test]
    fn test_sanitize_paper_id() {
        assert_eq!(PaperId::new("2301.12345").unwrap().as_str(), "2301.12345");
        assert_eq!(PaperId::new("cs/0601001").unwrap().as_str(), "cs_0601001");
        assert_eq!(PaperId::new("...test").unwrap().as_str(), "test");
        assert_eq!(PaperId::new(r"a\b").unwrap().as_str(), "a_b");

        let traversal = PaperId::new("../etc/passwd").unwrap();
        assert!(!traversal.as_str().contains('/'));
        assert!(!traversal.as_str().starts_with('.'));
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert!(matches!(PaperId::new(""), Err(StoreError::InvalidPaperId(_))));
        assert!(matches!(PaperId::new("..."), Err(StoreError::InvalidPaperId(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let id = PaperId::new("2301.00001").unwrap();
        let meta = Metadata {
            title: "A Paper".into(),
            ..Default::default()
        };
        store.save(&id, ArtifactKind::Metadata, &meta).unwrap();
        assert!(store.exists(&id, ArtifactKind::Metadata));
        let loaded: Metadata = store.load(&id, ArtifactKind::Metadata).unwrap();
        assert_eq!(loaded.title, "A Paper");
    }

    #[test]
    fn test_corrupt_artifact_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let id = PaperId::new("x").unwrap();
        store.ensure_paper_dir(&id).unwrap();
        std::fs::write(store.artifact_path(&id, ArtifactKind::Layout), b"{not json").unwrap();
        let loaded: Option<Vec<u32>> = store.load(&id, ArtifactKind::Layout);
        assert!(loaded.is_none());
    }

    #[test]
    fn test_get_or_compute_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let id = PaperId::new("p").unwrap();

        let first: Result<Vec<u32>, StoreError> =
            store.get_or_compute(&id, ArtifactKind::Layout, false, || Ok(vec![1, 2]));
        assert_eq!(first.unwrap(), vec![1, 2]);

        // Cached value wins over a new computation
        let second: Result<Vec<u32>, StoreError> =
            store.get_or_compute(&id, ArtifactKind::Layout, false, || Ok(vec![9]));
        assert_eq!(second.unwrap(), vec![1, 2]);

        // Forced refresh recomputes and overwrites
        let forced: Result<Vec<u32>, StoreError> =
            store.get_or_compute(&id, ArtifactKind::Layout, true, || Ok(vec![9]));
        assert_eq!(forced.unwrap(), vec![9]);
        let reloaded: Vec<u32> = store.load(&id, ArtifactKind::Layout).unwrap();
        assert_eq!(reloaded, vec![9]);
    }

    #[test]
    fn test_failed_compute_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let id = PaperId::new("p").unwrap();
        let result: Result<Vec<u32>, StoreError> =
            store.get_or_compute(&id, ArtifactKind::Parsed, false, || {
                Err(StoreError::InvalidPaperId("boom".into()))
            });
        assert!(result.is_err());
        assert!(!store.exists(&id, ArtifactKind::Parsed));
    }

    #[test]
    fn test_index_update_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let a = PaperId::new("b-paper").unwrap();
        let b = PaperId::new("a-paper").unwrap();
        store.update_index(&a, "Second").unwrap();
        store.update_index(&b, "First").unwrap();
        store.ensure_paper_dir(&a).unwrap();
        store.ensure_paper_dir(&b).unwrap();

        let index = store.load_index();
        assert_eq!(index.get("b-paper").map(String::as_str), Some("Second"));
        assert_eq!(store.list_papers(), vec![b, a]);
    }
}
