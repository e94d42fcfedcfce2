use paper_core::config_file::ParsingSection;
use thiserror::Error;

/// Keywords that mark a short capitalised line as a section heading.
pub(crate) const DEFAULT_SECTION_KEYWORDS: &[&str] = &[
    "abstract",
    "introduction",
    "related work",
    "background",
    "method",
    "approach",
    "model",
    "experiment",
    "result",
    "discussion",
    "conclusion",
    "acknowledgement",
    "reference",
    "appendix",
    "supplementary",
    "evaluation",
    "analysis",
    "limitation",
    "future work",
    "overview",
    "preliminar",
    "setup",
    "dataset",
    "training",
    "implementation",
];

/// Words that leave a heading fragment visibly unfinished.
pub(crate) const DEFAULT_TRAILING_CONJUNCTIONS: &[&str] = &[
    "and", "or", "of", "for", "in", "the", "with", "to", "a", "an", "on", "by",
];

/// Controls how a list of values is overridden from its defaults.
#[derive(Debug, Clone, Default)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ParsingConfigError {
    #[error("heading size ratio must be greater than 1.0, got {0}")]
    InvalidSizeRatio(f64),
    #[error("merge size tolerance must be positive, got {0}")]
    InvalidTolerance(f64),
    #[error("unsupported sentence language {0:?}")]
    UnsupportedLanguage(String),
}

/// Configuration for the document parsing pipeline.
#[derive(Debug, Clone)]
pub struct ParsingConfig {
    /// Lines larger than `ratio * body size` are heading candidates (default 1.15).
    pub(crate) heading_size_ratio: f64,
    /// Minimum outline entries before the outline is trusted over fonts (default 3).
    pub(crate) min_outline_entries: usize,
    /// Longer lines are never headings (default 80).
    pub(crate) max_heading_chars: usize,
    /// Font size difference under which heading fragments merge (default 1.0pt).
    pub(crate) merge_size_tolerance: f64,
    pub(crate) section_keywords: Vec<String>,
    pub(crate) trailing_conjunctions: Vec<String>,
    pub(crate) language: Language,
}

/// Sentence segmentation flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Universal,
    Japanese,
    Chinese,
}

impl Language {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "" | "en" | "de" | "fr" | "es" | "it" | "pt" | "nl" | "universal" => {
                Some(Language::Universal)
            }
            "ja" | "jp" => Some(Language::Japanese),
            "zh" | "cn" => Some(Language::Chinese),
            _ => None,
        }
    }
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            heading_size_ratio: 1.15,
            min_outline_entries: 3,
            max_heading_chars: 80,
            merge_size_tolerance: 1.0,
            section_keywords: to_strings(DEFAULT_SECTION_KEYWORDS),
            trailing_conjunctions: to_strings(DEFAULT_TRAILING_CONJUNCTIONS),
            language: Language::Universal,
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl ParsingConfig {
    pub fn heading_size_ratio(&self) -> f64 {
        self.heading_size_ratio
    }

    pub fn min_outline_entries(&self) -> usize {
        self.min_outline_entries
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub(crate) fn is_trailing_conjunction(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        self.trailing_conjunctions.iter().any(|c| *c == lower)
    }

    /// Build from the `[parsing]` section of a config file.
    pub fn from_section(section: &ParsingSection) -> Result<Self, ParsingConfigError> {
        let mut builder = ParsingConfigBuilder::new();
        if let Some(ratio) = section.heading_size_ratio {
            builder = builder.heading_size_ratio(ratio);
        }
        if let Some(n) = section.min_outline_entries {
            builder = builder.min_outline_entries(n);
        }
        if let Some(n) = section.max_heading_chars {
            builder = builder.max_heading_chars(n);
        }
        if let Some(tol) = section.merge_size_tolerance {
            builder = builder.merge_size_tolerance(tol);
        }
        if let Some(lang) = &section.language {
            builder = builder.language(lang);
        }
        builder.build()
    }
}

/// Builder for [`ParsingConfig`]. Values are validated in [`build()`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ParsingConfigBuilder {
    heading_size_ratio: Option<f64>,
    min_outline_entries: Option<usize>,
    max_heading_chars: Option<usize>,
    merge_size_tolerance: Option<f64>,
    section_keywords: ListOverride<String>,
    trailing_conjunctions: ListOverride<String>,
    language: Option<String>,
}

impl ParsingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading_size_ratio(mut self, ratio: f64) -> Self {
        self.heading_size_ratio = Some(ratio);
        self
    }

    pub fn min_outline_entries(mut self, n: usize) -> Self {
        self.min_outline_entries = Some(n);
        self
    }

    pub fn max_heading_chars(mut self, n: usize) -> Self {
        self.max_heading_chars = Some(n);
        self
    }

    pub fn merge_size_tolerance(mut self, points: f64) -> Self {
        self.merge_size_tolerance = Some(points);
        self
    }

    pub fn language(mut self, code: &str) -> Self {
        self.language = Some(code.to_string());
        self
    }

    // ── Section keywords ──

    pub fn set_section_keywords(mut self, keywords: Vec<String>) -> Self {
        self.section_keywords = ListOverride::Replace(keywords);
        self
    }

    pub fn add_section_keyword(mut self, keyword: String) -> Self {
        match &mut self.section_keywords {
            ListOverride::Extend(v) => v.push(keyword),
            _ => self.section_keywords = ListOverride::Extend(vec![keyword]),
        }
        self
    }

    // ── Trailing conjunctions ──

    pub fn set_trailing_conjunctions(mut self, words: Vec<String>) -> Self {
        self.trailing_conjunctions = ListOverride::Replace(words);
        self
    }

    pub fn add_trailing_conjunction(mut self, word: String) -> Self {
        match &mut self.trailing_conjunctions {
            ListOverride::Extend(v) => v.push(word),
            _ => self.trailing_conjunctions = ListOverride::Extend(vec![word]),
        }
        self
    }

    pub fn build(self) -> Result<ParsingConfig, ParsingConfigError> {
        let defaults = ParsingConfig::default();

        let heading_size_ratio = self.heading_size_ratio.unwrap_or(defaults.heading_size_ratio);
        if !(heading_size_ratio > 1.0) {
            return Err(ParsingConfigError::InvalidSizeRatio(heading_size_ratio));
        }
        let merge_size_tolerance = self
            .merge_size_tolerance
            .unwrap_or(defaults.merge_size_tolerance);
        if !(merge_size_tolerance > 0.0) {
            return Err(ParsingConfigError::InvalidTolerance(merge_size_tolerance));
        }
        let language = match self.language {
            Some(code) => Language::from_code(&code)
                .ok_or(ParsingConfigError::UnsupportedLanguage(code))?,
            None => defaults.language,
        };

        let lower = |v: Vec<String>| -> Vec<String> {
            v.into_iter().map(|s| s.to_lowercase()).collect()
        };

        Ok(ParsingConfig {
            heading_size_ratio,
            min_outline_entries: self
                .min_outline_entries
                .unwrap_or(defaults.min_outline_entries),
            max_heading_chars: self.max_heading_chars.unwrap_or(defaults.max_heading_chars),
            merge_size_tolerance,
            section_keywords: lower(self.section_keywords.resolve(&defaults.section_keywords)),
            trailing_conjunctions: lower(
                self.trailing_conjunctions
                    .resolve(&defaults.trailing_conjunctions),
            ),
            language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParsingConfig::default();
        assert!((config.heading_size_ratio - 1.15).abs() < f64::EPSILON);
        assert_eq!(config.min_outline_entries, 3);
        assert_eq!(config.max_heading_chars, 80);
        assert!(config.is_trailing_conjunction("And"));
        assert!(!config.is_trailing_conjunction("Networks"));
    }

    #[test]
    fn test_builder_basic() {
        let config = ParsingConfigBuilder::new()
            .heading_size_ratio(1.3)
            .min_outline_entries(5)
            .language("ja")
            .build()
            .unwrap();
        assert!((config.heading_size_ratio - 1.3).abs() < f64::EPSILON);
        assert_eq!(config.min_outline_entries, 5);
        assert_eq!(config.language, Language::Japanese);
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert_eq!(
            ParsingConfigBuilder::new().heading_size_ratio(0.9).build().unwrap_err(),
            ParsingConfigError::InvalidSizeRatio(0.9)
        );
        assert!(ParsingConfigBuilder::new().merge_size_tolerance(0.0).build().is_err());
        assert!(ParsingConfigBuilder::new().language("klingon").build().is_err());
    }

    #[test]
    fn test_keyword_overrides() {
        let config = ParsingConfigBuilder::new()
            .add_section_keyword("Proofs".into())
            .build()
            .unwrap();
        assert!(config.section_keywords.contains(&"proofs".to_string()));
        assert!(config.section_keywords.contains(&"introduction".to_string()));

        let replaced = ParsingConfigBuilder::new()
            .set_trailing_conjunctions(vec!["und".into()])
            .build()
            .unwrap();
        assert!(replaced.is_trailing_conjunction("und"));
        assert!(!replaced.is_trailing_conjunction("and"));
    }

    #[test]
    fn test_list_override_resolve() {
        let defaults = vec!["a".to_string(), "b".to_string()];

        let d: ListOverride<String> = ListOverride::Default;
        assert_eq!(d.resolve(&defaults), defaults);

        let e: ListOverride<String> = ListOverride::Extend(vec!["c".to_string()]);
        assert_eq!(e.resolve(&defaults).len(), 3);
    }
}
