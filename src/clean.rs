//! Canonicalization of raw newsletter bodies.
//!
//! Plain-text parts of newsletters often come out of an html to text
//! conversion and carry literal escape tokens, invisible anti-scraping
//! characters and irregular spacing. [`normalize`] folds all of that into a
//! predictable shape the segmenters can scan line by line.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE_SPACE_RUN: Regex = Regex::new(r" {2,}").unwrap();

    static ref RE_BLANK_LINE_RUN: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Characters that are deleted outright: zero-width non-joiner, zero-width
/// space, zero-width joiner and the byte order mark.
pub const INVISIBLE_CHARS: [char; 4] = ['\u{200c}', '\u{200b}', '\u{200d}', '\u{feff}'];

/// Literal escape sequences and real carriage returns, in replacement order.
///
/// `\r\n` has to go first, otherwise it would end up as two line breaks.
const LINE_BREAKS: [&str; 5] = ["\\r\\n", "\\n", "\\r", "\r\n", "\r"];

/// Normalizes a raw email body.
///
/// The result contains only `\n` line breaks, no zero-width characters, is
/// NFKC normalized, has no line with surrounding whitespace, no run of two or
/// more spaces, at most one blank line in a row and no blank lines at its
/// start or end.
///
/// Normalizing is idempotent: `normalize(&normalize(x)) == normalize(x)`.
///
/// # Example
///
/// ```rust
///  use blattcast::clean::normalize;
///  assert_eq!(normalize("line1\\r\\nline2"), "line1\nline2");
///  assert_eq!(normalize("a    b\n\n\n\nc"), "a b\n\nc");
/// ```
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let visible: String = raw
        .chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c))
        .collect();

    // escapes are folded after NFKC, fullwidth backslashes would otherwise
    // turn into fresh escape tokens
    let composed: String = visible.nfkc().collect();

    let mut text = LINE_BREAKS
        .iter()
        .fold(composed, |text, esc| text.replace(esc, "\n"));
    text = text.replace('\u{a0}', " ");

    let text = RE_SPACE_RUN.replace_all(&text, " ");
    let text = text.split('\n').map(str::trim).collect::<Vec<_>>().join("\n");

    // whitespace-only lines only become blank after trimming
    RE_BLANK_LINE_RUN
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}
