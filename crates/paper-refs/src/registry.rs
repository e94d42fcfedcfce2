use std::collections::HashMap;

use paper_core::{Document, LayoutKind, Link, LinkKind};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Section,
    Figure,
    Table,
    Equation,
    External,
    Citation,
}

impl RefKind {
    /// ID prefix: `s`, `f`, `t`, `eq`, `e`, `c`.
    pub fn prefix(self) -> &'static str {
        match self {
            RefKind::Section => "s",
            RefKind::Figure => LayoutKind::Figure.ref_prefix(),
            RefKind::Table => LayoutKind::Table.ref_prefix(),
            RefKind::Equation => LayoutKind::Equation.ref_prefix(),
            RefKind::External => "e",
            RefKind::Citation => "c",
        }
    }
}

impl From<LayoutKind> for RefKind {
    fn from(kind: LayoutKind) -> Self {
        match kind {
            LayoutKind::Figure => RefKind::Figure,
            LayoutKind::Table => RefKind::Table,
            LayoutKind::Equation => RefKind::Equation,
        }
    }
}

/// Where in the [`Document`] a ref points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "index", rename_all = "lowercase")]
pub enum RefSource {
    Section(usize),
    Layout(usize),
    /// First link carrying this ref.
    Link(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefEntry {
    pub ref_id: String,
    pub kind: RefKind,
    /// Display text: heading, layout label or link text.
    pub label: String,
    /// Heading, caption, URL or citation destination.
    pub target: String,
    pub source: RefSource,
}

/// Ordered ref entries of one document with lookups by ID and by link.
///
/// Rebuilt from the document on every use and never persisted.
#[derive(Debug, Clone, Default)]
pub struct RefRegistry {
    entries: Vec<RefEntry>,
    by_id: HashMap<String, usize>,
    external_ids: HashMap<String, String>,
    citation_ids: HashMap<String, String>,
}

impl RefRegistry {
    pub fn iter(&self) -> std::slice::Iter<'_, RefEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, ref_id: &str) -> Option<&RefEntry> {
        self.by_id.get(ref_id).map(|&i| &self.entries[i])
    }

    pub fn of_kind(&self, kind: RefKind) -> impl Iterator<Item = &RefEntry> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// ID shared by every occurrence of a citation's marker text.
    pub fn citation_id(&self, link: &Link) -> Option<&str> {
        if link.kind != LinkKind::Citation {
            return None;
        }
        self.citation_ids.get(citation_key(link)?).map(String::as_str)
    }

    pub fn external_id(&self, link: &Link) -> Option<&str> {
        if link.kind != LinkKind::External {
            return None;
        }
        self.external_ids.get(&link.url).map(String::as_str)
    }

    fn push(&mut self, kind: RefKind, number: usize, label: String, target: String, source: RefSource) -> String {
        let ref_id = format!("{}{number}", kind.prefix());
        self.by_id.insert(ref_id.clone(), self.entries.len());
        self.entries.push(RefEntry {
            ref_id: ref_id.clone(),
            kind,
            label,
            target,
            source,
        });
        ref_id
    }
}

impl<'a> IntoIterator for &'a RefRegistry {
    type Item = &'a RefEntry;
    type IntoIter = std::slice::Iter<'a, RefEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Assign ref IDs in a fixed order: sections, figures, tables, equations,
/// external links, citations.
///
/// The result is a pure function of `doc`. Layout elements are numbered per
/// kind in (page, y0) order; external links get one ID per distinct URL and
/// citations one per distinct marker text (or destination name when the
/// anchor is blank), both in first-seen order. Citations with neither are
/// left out.
pub fn build_ref_registry(doc: &Document) -> RefRegistry {
    let mut registry = RefRegistry::default();

    for (i, section) in doc.sections.iter().enumerate() {
        registry.push(
            RefKind::Section,
            i + 1,
            section.heading.clone(),
            section.heading.clone(),
            RefSource::Section(i),
        );
    }

    let mut layout: Vec<usize> = (0..doc.layout_elements.len()).collect();
    layout.sort_by(|&a, &b| {
        let (ea, eb) = (&doc.layout_elements[a], &doc.layout_elements[b]);
        ea.bbox
            .page
            .cmp(&eb.bbox.page)
            .then(ea.bbox.y0.total_cmp(&eb.bbox.y0))
    });
    for kind in [LayoutKind::Figure, LayoutKind::Table, LayoutKind::Equation] {
        let of_kind = layout.iter().filter(|&&i| doc.layout_elements[i].kind == kind);
        for (n, &i) in of_kind.enumerate() {
            let element = &doc.layout_elements[i];
            let label = if element.label.is_empty() {
                format!("{} {}", kind.label_prefix(), n + 1)
            } else {
                element.label.clone()
            };
            registry.push(kind.into(), n + 1, label, element.caption.clone(), RefSource::Layout(i));
        }
    }

    let mut number = 0;
    for (i, link) in doc.links.iter().enumerate() {
        if link.kind != LinkKind::External || registry.external_ids.contains_key(&link.url) {
            continue;
        }
        number += 1;
        let id = registry.push(
            RefKind::External,
            number,
            link.text.clone(),
            link.url.clone(),
            RefSource::Link(i),
        );
        registry.external_ids.insert(link.url.clone(), id);
    }

    let mut number = 0;
    for (i, link) in doc.links.iter().enumerate() {
        if link.kind != LinkKind::Citation {
            continue;
        }
        let Some(key) = citation_key(link) else {
            continue;
        };
        if registry.citation_ids.contains_key(key) {
            continue;
        }
        number += 1;
        let target = if link.dest_name.is_empty() {
            link.text.clone()
        } else {
            link.dest_name.clone()
        };
        let label = if link.text.trim().is_empty() {
            key.to_string()
        } else {
            link.text.clone()
        };
        let id = registry.push(RefKind::Citation, number, label, target, RefSource::Link(i));
        registry.citation_ids.insert(key.to_string(), id);
    }

    registry
}

/// Marker text, or the destination name when the anchor has no text.
fn citation_key(link: &Link) -> Option<&str> {
    [link.text.trim(), link.dest_name.trim()]
        .into_iter()
        .find(|k| !k.is_empty())
}
