use std::borrow::Cow;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::text::{char_len, is_blank, is_upper, push_line};

/// Keywords of the headings [`HeadingDetector::default`] recognizes.
pub const DEFAULT_HEADING_KEYWORDS: [&str; 8] = [
    "DEEP DIVES",
    "OPINIONS",
    "ADVICE",
    "LAUNCHES",
    "TOOLS",
    "QUICK LINKS",
    "MISCELLANEOUS",
    "SPONSORS",
];

lazy_static! {
    static ref DEFAULT_SEGMENTER: SectionSegmenter = SectionSegmenter::default();
}

/// A titled block of newsletter content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// The heading line that opened the section.
    pub title: String,
    /// All non empty lines up to the next heading, each terminated by `\n`.
    pub content: String,
}

/// Decides which lines open a new section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingDetector {
    keywords: Vec<Cow<'static, str>>,
    /// Headings are strictly shorter than this, in chars.
    max_len: usize,
}

impl HeadingDetector {
    pub const DEFAULT_MAX_LEN: usize = 100;

    /// A detector that doesn't know any keyword yet.
    pub fn new(max_len: usize) -> Self {
        Self {
            keywords: Vec::new(),
            max_len,
        }
    }

    /// Adds another heading keyword.
    pub fn keyword<T: Into<Cow<'static, str>>>(mut self, keyword: T) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    #[inline]
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(|kw| kw.as_ref())
    }

    /// A heading is an upper case line below the length limit that contains
    /// one of the keywords.
    pub fn is_heading(&self, line: &str) -> bool {
        is_upper(line)
            && char_len(line) < self.max_len
            && self.keywords().any(|kw| line.contains(kw))
    }
}

impl Default for HeadingDetector {
    fn default() -> Self {
        DEFAULT_HEADING_KEYWORDS
            .iter()
            .fold(HeadingDetector::new(Self::DEFAULT_MAX_LEN), |d, kw| {
                d.keyword(*kw)
            })
    }
}

/// Splits text into [`Section`]s.
#[derive(Debug, Clone, Default)]
pub struct SectionSegmenter {
    detector: HeadingDetector,
}

impl SectionSegmenter {
    pub fn new(detector: HeadingDetector) -> Self {
        Self { detector }
    }

    #[inline]
    pub fn detector(&self) -> &HeadingDetector {
        &self.detector
    }

    /// Walks the lines in order, every heading starts a new section.
    ///
    /// Empty lines are skipped. Sections without content are dropped, and so
    /// is everything before the first heading, since it has no title.
    pub fn segment(&self, text: &str) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut current = Section {
            title: String::new(),
            content: String::new(),
        };

        for line in text.split('\n').filter(|l| !l.is_empty()) {
            if self.detector.is_heading(line) {
                let next = Section {
                    title: line.trim().to_string(),
                    content: String::new(),
                };
                push_section(&mut sections, std::mem::replace(&mut current, next));
            } else {
                push_line(&mut current.content, line);
            }
        }
        push_section(&mut sections, current);

        sections
    }
}

fn push_section(sections: &mut Vec<Section>, section: Section) {
    if !section.title.is_empty() && !is_blank(&section.content) {
        sections.push(section);
    }
}

/// Segments `text` with the default heading keywords.
pub fn segment_sections(text: &str) -> Vec<Section> {
    DEFAULT_SEGMENTER.segment(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_headings() {
        let detector = HeadingDetector::default();
        assert!(detector.is_heading("DEEP DIVES"));
        assert!(detector.is_heading("🚀 HEADLINES & LAUNCHES"));
        assert!(detector.is_heading("PROGRAMMING, DESIGN & DATA SCIENCE TOOLS"));
        assert!(!detector.is_heading("Deep Dives"));
        assert!(!detector.is_heading("BIG TECH & STARTUPS"));
        let long = format!("TOOLS {}", "X".repeat(94));
        assert_eq!(char_len(&long), 100);
        assert!(!detector.is_heading(&long));
    }

    #[test]
    fn heading_starts_section() {
        let text = "intro text\nDEEP DIVES\nfirst story\n\nsecond story\nOPINIONS & ADVICE\nmy take";
        let sections = segment_sections(text);
        assert_eq!(
            sections,
            vec![
                Section {
                    title: "DEEP DIVES".to_string(),
                    content: "first story\nsecond story\n".to_string(),
                },
                Section {
                    title: "OPINIONS & ADVICE".to_string(),
                    content: "my take\n".to_string(),
                },
            ]
        );
    }

    #[test]
    fn drops_text_before_first_heading() {
        let sections = segment_sections("lead story\nmore lead\nTOOLS\na tool");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "TOOLS");
        assert!(!sections[0].content.contains("lead"));

        assert!(segment_sections("no headings\nat all").is_empty());
        assert!(segment_sections("").is_empty());
    }

    #[test]
    fn drops_empty_sections_and_keeps_duplicates() {
        let text = "TOOLS\nQUICK LINKS\nlink one\nQUICK LINKS\nlink two\nMISCELLANEOUS\n";
        let titles: Vec<_> = segment_sections(text)
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["QUICK LINKS", "QUICK LINKS"]);
    }

    #[test]
    fn custom_keywords() {
        let segmenter = SectionSegmenter::new(HeadingDetector::new(40).keyword("SCIENCE"));
        let sections = segmenter.segment("SCIENCE\nfusion\nTOOLS\nstill science");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].content, "fusion\nTOOLS\nstill science\n");
    }
}
