//! Highlight records in `<paper>/highlights.json`.

use chrono::{SecondsFormat, Utc};
use paper_core::{ArtifactKind, ArtifactStore, Highlight, HighlightColor, PaperId, Rect, StoreError};

/// Fields of a highlight before it is assigned an id and timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewHighlight {
    pub text: String,
    pub page: usize,
    pub rects: Vec<Rect>,
    pub color: HighlightColor,
    pub note: String,
}

/// Highlights of a paper in insertion order. Missing or corrupt data reads as
/// empty.
pub fn load_highlights(store: &ArtifactStore, paper_id: &PaperId) -> Vec<Highlight> {
    store
        .load(paper_id, ArtifactKind::Highlights)
        .unwrap_or_default()
}

/// Append a highlight with id `max(existing) + 1`.
pub fn add_highlight(
    store: &ArtifactStore,
    paper_id: &PaperId,
    new: NewHighlight,
) -> Result<Highlight, StoreError> {
    let mut highlights = load_highlights(store, paper_id);
    let id = highlights.iter().map(|h| h.id).max().unwrap_or(0) + 1;
    let highlight = Highlight {
        id,
        text: new.text,
        page: new.page,
        rects: new.rects,
        color: new.color,
        note: new.note,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    };
    highlights.push(highlight.clone());
    store.save(paper_id, ArtifactKind::Highlights, &highlights)?;
    tracing::info!(paper_id = %paper_id, highlight_id = id, "highlight added");
    Ok(highlight)
}

/// Remove a highlight by id. Returns `false`, writing nothing, when no
/// highlight has that id.
pub fn remove_highlight(store: &ArtifactStore, paper_id: &PaperId, highlight_id: u64) -> Result<bool, StoreError> {
    let mut highlights = load_highlights(store, paper_id);
    let before = highlights.len();
    highlights.retain(|h| h.id != highlight_id);
    if highlights.len() == before {
        return Ok(false);
    }
    store.save(paper_id, ArtifactKind::Highlights, &highlights)?;
    tracing::info!(paper_id = %paper_id, highlight_id, "highlight removed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, ArtifactStore, PaperId) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        (dir, store, PaperId::new("0000.00000").unwrap())
    }

    fn new(text: &str, page: usize) -> NewHighlight {
        NewHighlight {
            text: text.into(),
            page,
            ..Default::default()
        }
    }

    #[test]
    fn test_add_and_load() {
        let (_dir, store, id) = setup();
        let added = add_highlight(
            &store,
            &id,
            NewHighlight {
                text: "test text".into(),
                page: 0,
                rects: vec![Rect::new(72.0, 100.0, 540.0, 112.0)],
                color: HighlightColor::Green,
                note: "a note".into(),
            },
        )
        .unwrap();
        assert_eq!(added.id, 1);
        assert_eq!(added.color, HighlightColor::Green);
        assert!(chrono::DateTime::parse_from_rfc3339(&added.created_at).is_ok());

        let loaded = load_highlights(&store, &id);
        assert_eq!(loaded, vec![added]);
    }

    #[test]
    fn test_ids_are_max_plus_one() {
        let (_dir, store, id) = setup();
        add_highlight(&store, &id, new("first", 0)).unwrap();
        add_highlight(&store, &id, new("second", 1)).unwrap();
        remove_highlight(&store, &id, 1).unwrap();
        let third = add_highlight(&store, &id, new("third", 2)).unwrap();
        assert_eq!(third.id, 3);
    }

    #[test]
    fn test_remove_preserves_others_in_order() {
        let (_dir, store, id) = setup();
        for (i, text) in ["keep", "remove", "also keep"].iter().enumerate() {
            add_highlight(&store, &id, new(text, i)).unwrap();
        }
        assert!(remove_highlight(&store, &id, 2).unwrap());
        let texts: Vec<String> = load_highlights(&store, &id).into_iter().map(|h| h.text).collect();
        assert_eq!(texts, vec!["keep", "also keep"]);
    }

    #[test]
    fn test_remove_nonexistent_leaves_storage_unchanged() {
        let (_dir, store, id) = setup();
        assert!(!remove_highlight(&store, &id, 999).unwrap());
        assert!(!store.exists(&id, ArtifactKind::Highlights), "nothing written");

        add_highlight(&store, &id, new("only", 0)).unwrap();
        let path = store.artifact_path(&id, ArtifactKind::Highlights);
        let before = std::fs::read(&path).unwrap();
        assert!(!remove_highlight(&store, &id, 999).unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let (_dir, store, id) = setup();
        let dir = store.ensure_paper_dir(&id).unwrap();
        std::fs::write(dir.join("highlights.json"), "{bad json").unwrap();
        assert!(load_highlights(&store, &id).is_empty());
        assert_eq!(add_highlight(&store, &id, new("fresh", 0)).unwrap().id, 1);
    }

    #[test]
    fn test_loads_minimal_records() {
        let (_dir, store, id) = setup();
        let dir = store.ensure_paper_dir(&id).unwrap();
        std::fs::write(
            dir.join("highlights.json"),
            r#"[{"id": 4, "text": "hello", "page": 0, "rects": [], "color": "yellow"}]"#,
        )
        .unwrap();
        let loaded = load_highlights(&store, &id);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, 4);
        assert_eq!(loaded[0].note, "");
    }
}
