use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use paper_core::config_file::{self, ConfigFile};
use paper_core::{ArtifactKind, ArtifactStore, Document, HighlightColor, LayoutElement, PaperId, PdfBackend};
use paper_highlight::{Highlighter, NewHighlight};
use paper_layout::{LayoutConfig, LayoutDetector};
use paper_parsing::{DocumentParser, ParsingConfig};
use paper_pdf_mupdf::MupdfBackend;
use paper_refs::RefSource;
use tracing_subscriber::EnvFilter;

mod output;

use output::print_json;

/// Paper reader - Parse academic PDFs into navigable, highlightable documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Root of the paper store (default: PAPERS_DIR, then the config file, then ~/.papers)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a PDF into the store and parse it
    Parse {
        /// Path to the PDF file
        file_path: PathBuf,

        /// Paper ID (defaults to the file name without extension)
        #[arg(long)]
        id: Option<String>,

        /// Parse again even when a cached result exists
        #[arg(long)]
        force: bool,
    },

    /// List papers in the store
    List,

    /// Print the section outline of a paper
    Outline { paper: String },

    /// Print section text with inline [ref=...] citation tags
    Read {
        paper: String,

        /// Only print the section with this index (see `outline`)
        #[arg(long)]
        section: Option<usize>,
    },

    /// List the ref IDs of sections, figures, tables, equations, links and citations
    Refs { paper: String },

    /// Show what a ref ID points to
    Goto { paper: String, ref_id: String },

    /// Detect figures, tables and equations with the layout model
    Detect {
        paper: String,

        /// Run detection again even when a cached result exists
        #[arg(long)]
        force: bool,

        /// Save PNG crops of detected figures and tables
        #[arg(long)]
        crops: bool,
    },

    /// Find text in a paper
    Search {
        paper: String,
        query: String,

        /// Search the parsed section text instead of the PDF pages
        #[arg(long)]
        sections: bool,

        /// Lines of context per section match
        #[arg(long, default_value_t = 2)]
        context: usize,
    },

    /// Add, list or remove highlights
    Highlight {
        #[command(subcommand)]
        action: HighlightAction,
    },
}

#[derive(Subcommand, Debug)]
enum HighlightAction {
    /// Highlight an occurrence of some text
    Add {
        paper: String,
        text: String,

        /// yellow, green, blue or pink
        #[arg(long, default_value = "yellow")]
        color: HighlightColor,

        #[arg(long, default_value = "")]
        note: String,

        /// Restrict the search to this page (1-based)
        #[arg(long)]
        page: Option<usize>,

        /// Which occurrence to highlight when the text appears more than once (0-based)
        #[arg(long, default_value_t = 0)]
        occurrence: usize,
    },

    /// List highlights
    List { paper: String },

    /// Remove a highlight by ID
    Remove { paper: String, id: u64 },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config_file::load_config();
    let root = store_root(cli.store, std::env::var("PAPERS_DIR").ok(), &config);
    let store = match root {
        Some(root) => ArtifactStore::new(root),
        None => ArtifactStore::open_default()?,
    };
    let app = App::new(store, &config)?;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Command::Parse { file_path, id, force } => app.parse(&mut out, &file_path, id.as_deref(), force),
        Command::List => app.list(&mut out),
        Command::Outline { paper } => {
            let doc = app.document(&app.paper_id(&paper)?)?;
            print_json(&mut out, &output::outline(&doc))
        }
        Command::Read { paper, section } => app.read(&mut out, &paper, section),
        Command::Refs { paper } => {
            let doc = app.document(&app.paper_id(&paper)?)?;
            let registry = paper_refs::build_ref_registry(&doc);
            print_json(&mut out, &registry.iter().collect::<Vec<_>>())
        }
        Command::Goto { paper, ref_id } => app.goto(&mut out, &paper, &ref_id),
        Command::Detect { paper, force, crops } => app.detect(&mut out, &paper, force, crops),
        Command::Search {
            paper,
            query,
            sections,
            context,
        } => app.search(&mut out, &paper, &query, sections, context),
        Command::Highlight { action } => app.highlight(&mut out, action),
    }
}

/// Resolve the store root: CLI flag > PAPERS_DIR > config file > default.
fn store_root(flag: Option<PathBuf>, env: Option<String>, config: &ConfigFile) -> Option<PathBuf> {
    flag.or_else(|| env.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
        .or_else(|| {
            config
                .storage
                .as_ref()
                .and_then(|s| s.root.as_ref())
                .map(PathBuf::from)
        })
}

/// Paper ID for an imported file: the explicit ID, else the file stem.
fn import_id(file_path: &Path, explicit: Option<&str>) -> anyhow::Result<PaperId> {
    let raw = match explicit {
        Some(id) => id.to_string(),
        None => file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .with_context(|| format!("cannot derive a paper ID from {}", file_path.display()))?,
    };
    Ok(PaperId::new(&raw)?)
}

struct App {
    store: ArtifactStore,
    backend: MupdfBackend,
    parser: DocumentParser,
    layout: LayoutConfig,
}

impl App {
    fn new(store: ArtifactStore, config: &ConfigFile) -> anyhow::Result<Self> {
        let parsing = match &config.parsing {
            Some(section) => ParsingConfig::from_section(section).context("invalid [parsing] config")?,
            None => ParsingConfig::default(),
        };
        let layout = config
            .layout
            .as_ref()
            .map(LayoutConfig::from_section)
            .unwrap_or_default();
        Ok(Self {
            store,
            backend: MupdfBackend::new(),
            parser: DocumentParser::with_config(parsing),
            layout,
        })
    }

    fn paper_id(&self, raw: &str) -> anyhow::Result<PaperId> {
        Ok(PaperId::new(raw)?)
    }

    fn pdf_path(&self, id: &PaperId) -> anyhow::Result<PathBuf> {
        let path = self.store.pdf_path(id);
        if !path.exists() {
            anyhow::bail!(
                "No PDF for paper '{}' in {}. Import it with: paper parse <file> --id {}",
                id,
                self.store.root().display(),
                id
            );
        }
        Ok(path)
    }

    /// The parsed document, with cached layout elements attached when the
    /// parse itself carries none.
    fn document(&self, id: &PaperId) -> anyhow::Result<Document> {
        let pdf = if self.store.exists(id, ArtifactKind::Parsed) {
            self.store.pdf_path(id)
        } else {
            self.pdf_path(id)?
        };
        let mut doc = self.parser.parse_paper(&self.store, &self.backend, id, &pdf, false)?;
        if doc.layout_elements.is_empty()
            && let Some(layout) = self.store.load::<Vec<LayoutElement>>(id, ArtifactKind::Layout)
        {
            doc.layout_elements = layout;
        }
        Ok(doc)
    }

    fn parse(&self, out: &mut dyn std::io::Write, file_path: &Path, id: Option<&str>, force: bool) -> anyhow::Result<()> {
        if !file_path.exists() {
            anyhow::bail!("File not found: {}", file_path.display());
        }
        let id = import_id(file_path, id)?;
        self.store.ensure_paper_dir(&id)?;

        let dest = self.store.pdf_path(&id);
        let same_file = match (file_path.canonicalize(), dest.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            std::fs::copy(file_path, &dest)
                .with_context(|| format!("failed to copy {} into the store", file_path.display()))?;
            tracing::info!(paper = %id, source = %file_path.display(), "imported pdf");
        }

        let doc = self.parser.parse_paper(&self.store, &self.backend, &id, &dest, force)?;
        tracing::info!(paper = %id, sections = doc.sections.len(), links = doc.links.len(), "parsed");
        print_json(out, &output::ParseSummary::new(&id, &doc))
    }

    fn list(&self, out: &mut dyn std::io::Write) -> anyhow::Result<()> {
        let index = self.store.load_index();
        let papers: Vec<serde_json::Value> = self
            .store
            .list_papers()
            .into_iter()
            .map(|id| {
                serde_json::json!({
                    "paper_id": id.as_str(),
                    "title": index.get(id.as_str()).map_or("", String::as_str),
                    "parsed": self.store.exists(&id, ArtifactKind::Parsed),
                    "layout": self.store.exists(&id, ArtifactKind::Layout),
                })
            })
            .collect();
        print_json(out, &papers)
    }

    fn read(&self, out: &mut dyn std::io::Write, paper: &str, section: Option<usize>) -> anyhow::Result<()> {
        let doc = self.document(&self.paper_id(paper)?)?;
        if let Some(i) = section
            && i >= doc.sections.len()
        {
            anyhow::bail!("Section {} out of range (paper has {} sections)", i, doc.sections.len());
        }
        let registry = paper_refs::build_ref_registry(&doc);
        let annotated = paper_refs::annotate_document(&doc, &registry);
        print_json(out, &output::annotated_sections(&doc, annotated, section))
    }

    fn goto(&self, out: &mut dyn std::io::Write, paper: &str, ref_id: &str) -> anyhow::Result<()> {
        let id = self.paper_id(paper)?;
        let doc = self.document(&id)?;
        let registry = paper_refs::build_ref_registry(&doc);
        let entry = registry
            .get(ref_id)
            .with_context(|| format!("Unknown ref '{ref_id}'. List them with: paper refs {id}"))?;

        let value = match entry.source {
            RefSource::Section(i) => serde_json::json!({
                "ref": entry,
                "section": output::SectionView::from(&doc.sections[i]),
            }),
            RefSource::Layout(i) => serde_json::json!({
                "ref": entry,
                "element": &doc.layout_elements[i],
            }),
            RefSource::Link(i) => {
                let link = &doc.links[i];
                let citation_text = if link.is_citation() {
                    let content = match self.pdf_path(&id) {
                        Ok(pdf) => Some(self.backend.load(&pdf)?),
                        Err(_) => None,
                    };
                    paper_refs::resolve_citation_text(&doc, link, content.as_ref())
                } else {
                    None
                };
                serde_json::json!({
                    "ref": entry,
                    "link": link,
                    "citation_text": citation_text,
                })
            }
        };
        print_json(out, &value)
    }

    fn detect(&self, out: &mut dyn std::io::Write, paper: &str, force: bool, crops: bool) -> anyhow::Result<()> {
        let id = self.paper_id(paper)?;
        let pdf = self.pdf_path(&id)?;
        let mut config = self.layout.clone();
        config.save_crops = crops;

        let model = paper_layout::load_default_model(&config, self.store.root())?;
        let detector = LayoutDetector::new(model, config);
        let elements = paper_layout::detect_layout(&self.store, &self.backend, &detector, &id, &pdf, force)?;
        tracing::info!(paper = %id, elements = elements.len(), "layout detected");
        print_json(out, &elements)
    }

    fn search(
        &self,
        out: &mut dyn std::io::Write,
        paper: &str,
        query: &str,
        sections: bool,
        context: usize,
    ) -> anyhow::Result<()> {
        let id = self.paper_id(paper)?;
        let doc = self.document(&id)?;
        if sections {
            return print_json(out, &paper_highlight::search_in_document(&doc, query, context));
        }
        let content = self.backend.load(&self.pdf_path(&id)?)?;
        let payloads: Vec<_> = paper_highlight::search_pdf(&content, query)
            .iter()
            .map(|m| paper_highlight::match_to_json(m, &doc))
            .collect();
        print_json(out, &payloads)
    }

    fn highlight(&self, out: &mut dyn std::io::Write, action: HighlightAction) -> anyhow::Result<()> {
        let highlighter = Highlighter::new(&self.store, &self.backend);
        match action {
            HighlightAction::Add {
                paper,
                text,
                color,
                note,
                page,
                occurrence,
            } => {
                let id = self.paper_id(&paper)?;
                let content = self.backend.load(&self.pdf_path(&id)?)?;
                let hit = paper_highlight::search_pdf(&content, &text)
                    .into_iter()
                    .filter(|m| page.is_none_or(|p| m.page + 1 == p))
                    .nth(occurrence)
                    .with_context(|| format!("Text not found: \"{text}\""))?;
                let highlight = highlighter.add(
                    &id,
                    NewHighlight {
                        text,
                        page: hit.page,
                        rects: hit.rects,
                        color,
                        note,
                    },
                )?;
                print_json(out, &highlight)
            }
            HighlightAction::List { paper } => print_json(out, &highlighter.list(&self.paper_id(&paper)?)),
            HighlightAction::Remove { paper, id } => {
                let removed = highlighter.remove(&self.paper_id(&paper)?, id)?;
                print_json(out, &serde_json::json!({ "id": id, "removed": removed }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_core::config_file::StorageConfig;

    #[test]
    fn test_store_root_precedence() {
        let config = ConfigFile {
            storage: Some(StorageConfig {
                root: Some("/from/config".into()),
            }),
            ..Default::default()
        };
        assert_eq!(
            store_root(Some("/flag".into()), Some("/env".into()), &config),
            Some(PathBuf::from("/flag"))
        );
        assert_eq!(
            store_root(None, Some("/env".into()), &config),
            Some(PathBuf::from("/env"))
        );
        assert_eq!(
            store_root(None, Some("  ".into()), &config),
            Some(PathBuf::from("/from/config")),
            "blank PAPERS_DIR is ignored"
        );
        assert_eq!(store_root(None, None, &ConfigFile::default()), None);
    }

    #[test]
    fn test_import_id() {
        let id = import_id(Path::new("/tmp/downloads/1706.03762.pdf"), None).unwrap();
        assert_eq!(id.as_str(), "1706.03762");
        let id = import_id(Path::new("paper.pdf"), Some("attention/v2")).unwrap();
        assert_eq!(id.as_str(), "attention_v2");
    }

    #[test]
    fn test_cli_parses_highlight_add() {
        let cli = Cli::try_parse_from([
            "paper", "highlight", "add", "attention", "scaled dot-product", "--color", "green", "--page", "4",
        ])
        .unwrap();
        match cli.command {
            Command::Highlight {
                action: HighlightAction::Add { color, page, occurrence, .. },
            } => {
                assert_eq!(color, HighlightColor::Green);
                assert_eq!(page, Some(4));
                assert_eq!(occurrence, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLog(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_parse_logs_import() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("incoming.pdf");
        std::fs::write(&source, b"not a pdf").unwrap();
        let app = App::new(ArtifactStore::new(dir.path().join("store")), &ConfigFile::default()).unwrap();

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("info"))
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        // Whether the bytes parse is up to MuPDF; the import happens first either way
        let _ = tracing::subscriber::with_default(subscriber, || {
            app.parse(&mut Vec::new(), &source, Some("broken"), false)
        });

        assert!(app.store.pdf_path(&PaperId::new("broken").unwrap()).exists());
        let log = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("imported pdf"), "{log}");
        assert!(log.contains("paper=broken"), "{log}");
    }

    #[test]
    fn test_unknown_color_rejected() {
        assert!(Cli::try_parse_from(["paper", "highlight", "add", "p", "x", "--color", "red"]).is_err());
    }
}
