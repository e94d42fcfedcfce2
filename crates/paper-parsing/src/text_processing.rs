use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static COMMA_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s+").unwrap());
static SPACE_PAREN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\)").unwrap());

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Collapse runs of whitespace to a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Tidy link anchor text stitched from several rectangles:
/// `"Kingma ,   2015 )"` becomes `"Kingma , 2015)"`.
pub fn normalize_anchor_text(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let commas = COMMA_SPACE_RE.replace_all(&collapsed, ", ");
    SPACE_PAREN_RE.replace_all(&commas, ")").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_ligatures() {
        assert_eq!(expand_ligatures("ﬁnding ﬂow"), "finding flow");
        assert_eq!(expand_ligatures("eﬃcient"), "efficient");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \t b\n\nc "), "a b c");
    }

    #[test]
    fn test_normalize_anchor_text() {
        assert_eq!(
            normalize_anchor_text("(Kingma & Ba,\n 2015 )"),
            "(Kingma & Ba, 2015)"
        );
    }
}
