//! Pieces of a citation's rendered text: first author surname, year, and
//! bracket number.

use once_cell::sync::Lazy;
use regex::Regex;

static SURNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z][A-Za-z\u{00C0}-\u{024F}'\-]+").unwrap());

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:1[89]|20)\d{2}[a-z]?\b").unwrap());

static BRACKET_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\s*(\d+)").unwrap());

/// First capitalised word of the citation, e.g. `Kingma` in
/// `(Kingma & Ba, 2015)`.
pub fn citation_surname(text: &str) -> Option<&str> {
    SURNAME_RE.find(text).map(|m| m.as_str())
}

/// First year-like token, including a disambiguating letter (`2019a`).
pub fn citation_year(text: &str) -> Option<&str> {
    YEAR_RE.find(text).map(|m| m.as_str())
}

/// First number inside a bracket marker: `[3]` and `[3, 4]` both give 3.
pub fn citation_number(text: &str) -> Option<u32> {
    BRACKET_NUMBER_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Byte offsets of `word` in `text` that are not part of a longer word.
pub(crate) fn word_matches<'a>(text: &'a str, word: &'a str) -> impl Iterator<Item = usize> + 'a {
    let is_word_char = |c: char| c.is_alphanumeric();
    text.match_indices(word).filter_map(move |(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + word.len()..].chars().next();
        let bounded = !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char);
        bounded.then_some(start)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surname_and_year() {
        assert_eq!(citation_surname("(Kingma & Ba, 2015)"), Some("Kingma"));
        assert_eq!(citation_surname("(Müller et al., 2020)"), Some("Müller"));
        assert_eq!(citation_surname("[12]"), None);
        assert_eq!(citation_year("(Kingma & Ba, 2015)"), Some("2015"));
        assert_eq!(citation_year("Devlin et al. 2019a"), Some("2019a"));
        assert_eq!(citation_year("(Hu et al.,"), None);
    }

    #[test]
    fn test_citation_number() {
        assert_eq!(citation_number("[3]"), Some(3));
        assert_eq!(citation_number("[ 12, 14]"), Some(12));
        assert_eq!(citation_number("(Hu, 2022)"), None);
    }

    #[test]
    fn test_word_matches_rejects_substrings() {
        let text = "Huh et al. and Hu et al. and Hua";
        let hits: Vec<usize> = word_matches(text, "Hu").collect();
        assert_eq!(hits, vec![15]);
    }
}
