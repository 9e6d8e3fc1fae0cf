//! Small line-level helpers shared by the segmenters.

/// Whether the line is written in upper case: it has at least one cased
/// character and none of its cased characters are lower case.
///
/// Digits, punctuation and whitespace are ignored, so `"Q&A 2024"` is upper
/// case while `"1234 - 5678"` is not.
pub fn is_upper(line: &str) -> bool {
    let mut cased = false;
    for c in line.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

/// Length of the line in chars, not bytes.
#[inline]
pub fn char_len(line: &str) -> usize {
    line.chars().count()
}

/// Whether the text holds nothing but whitespace.
#[inline]
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Appends `line` and a newline to the accumulated content.
#[inline]
pub(crate) fn push_line(content: &mut String, line: &str) {
    content.push_str(line);
    content.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_case_lines() {
        assert!(is_upper("DEEP DIVES & ANALYSIS"));
        assert!(is_upper("QUICK LINKS 2024"));
        assert!(is_upper("ÜBER TOOLS"));
        assert!(!is_upper("Deep Dives"));
        assert!(!is_upper("1234 - 5678"));
        assert!(!is_upper(""));
    }

    #[test]
    fn lengths_count_chars() {
        assert_eq!(char_len("ÄÖÜ"), 3);
        assert!(is_blank(" \n\t"));
        assert!(!is_blank(" a "));
    }
}
