use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer, Serialize};

use crate::text::{char_len, is_blank, push_line};

lazy_static! {

    /// An all caps title, optionally followed by a read time in parens and a
    /// numeric link reference in brackets:
    /// `OPENAI RELEASES NEW MODEL (5 minute read) [1234]`
    pub static ref RE_ARTICLE_TITLE: Regex = Regex::new(r"^([A-Z][A-Z\s&:,'\-]+?)(\s*\([\d\w\s]+\))?\s*(\[\d+\])?$").unwrap();

    static ref DEFAULT_SEGMENTER: ArticleSegmenter = ArticleSegmenter::default();
}

/// A single story of a newsletter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// The headline, without annotations.
    pub title: String,
    /// All non empty lines up to the next headline, each terminated by `\n`.
    pub content: String,
    /// The read time annotation, e.g. `5 minute read`.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub read_time: Option<String>,
    /// The number of the link reference, e.g. `1234` for `[1234]`.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub link_id: Option<String>,
}

/// Older stores write a missing annotation as `""`.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

impl Article {
    /// Starts an article from the captures of a title line.
    fn from_title(caps: &Captures) -> Self {
        let annotation = |idx: usize, strip: &[char]| {
            caps.get(idx)
                .map(|m| m.as_str().trim_matches(strip))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Article {
            title: caps
                .get(1)
                .map(|m| m.as_str().trim())
                .unwrap_or_default()
                .to_string(),
            content: String::new(),
            read_time: annotation(2, &['(', ')', ' ']),
            link_id: annotation(3, &['[', ']', ' ']),
        }
    }

    fn is_complete(&self) -> bool {
        !self.title.is_empty() && !is_blank(&self.content)
    }
}

/// Splits text into [`Article`]s by looking for headline shaped lines.
#[derive(Debug, Clone)]
pub struct ArticleSegmenter {
    title: Regex,
    /// Titles are strictly longer than this, in chars.
    min_len: usize,
}

impl ArticleSegmenter {
    /// Shorter lines are section headings or noise, not headlines.
    pub const DEFAULT_MIN_LEN: usize = 20;

    /// Uses a custom title pattern.
    ///
    /// Group 1 is the title, the optional groups 2 and 3 are the read time
    /// and the link id.
    pub fn new(title: Regex, min_len: usize) -> Self {
        Self { title, min_len }
    }

    pub fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    fn title_captures<'t>(&self, line: &'t str) -> Option<Captures<'t>> {
        if char_len(line) <= self.min_len {
            return None;
        }
        self.title.captures(line)
    }

    /// Walks the lines in order, every title line starts a new article.
    ///
    /// Lines are trimmed and empty ones skipped. Articles without content are
    /// dropped, and so is everything before the first title.
    pub fn segment(&self, text: &str) -> Vec<Article> {
        let mut articles = Vec::new();
        let mut current = Article {
            title: String::new(),
            content: String::new(),
            read_time: None,
            link_id: None,
        };

        for line in text.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(caps) = self.title_captures(line) {
                let done = std::mem::replace(&mut current, Article::from_title(&caps));
                if done.is_complete() {
                    articles.push(done);
                }
            } else {
                push_line(&mut current.content, line);
            }
        }
        if current.is_complete() {
            articles.push(current);
        }

        articles
    }
}

impl Default for ArticleSegmenter {
    fn default() -> Self {
        ArticleSegmenter::new(RE_ARTICLE_TITLE.clone(), Self::DEFAULT_MIN_LEN)
    }
}

/// Segments `text` with the default headline pattern.
pub fn segment_articles(text: &str) -> Vec<Article> {
    DEFAULT_SEGMENTER.segment(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_annotated_title() {
        let articles =
            segment_articles("OPENAI RELEASES NEW MODEL (5 minute read) [1234]\nIt is big.");
        assert_eq!(
            articles,
            vec![Article {
                title: "OPENAI RELEASES NEW MODEL".to_string(),
                content: "It is big.\n".to_string(),
                read_time: Some("5 minute read".to_string()),
                link_id: Some("1234".to_string()),
            }]
        );
    }

    #[test]
    fn annotations_are_optional() {
        let text = "APPLE'S NEW CHIP, EXPLAINED: WHY\nfast\nGITHUB SHIPS COPILOT UPDATE [7]\nnew stuff\nSTARTUP RAISES A LOT OF MONEY (GitHub Repo)\nrepo";
        let articles = segment_articles(text);
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].title, "APPLE'S NEW CHIP, EXPLAINED: WHY");
        assert_eq!(articles[0].read_time, None);
        assert_eq!(articles[1].title, "GITHUB SHIPS COPILOT UPDATE");
        assert_eq!(articles[1].link_id.as_deref(), Some("7"));
        assert_eq!(articles[1].read_time, None);
        assert_eq!(articles[2].read_time.as_deref(), Some("GitHub Repo"));
        assert_eq!(articles[2].content, "repo\n");
    }

    #[test]
    fn short_and_mixed_case_lines_are_content() {
        let text = "BIG NEWS (1 min)\nTHE MARKET MOVED A LOT TODAY\nShort line\nTOOLS\nLowercase Titles Are Not Titles At All";
        let articles = segment_articles(text);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "THE MARKET MOVED A LOT TODAY");
        assert_eq!(
            articles[0].content,
            "Short line\nTOOLS\nLowercase Titles Are Not Titles At All\n"
        );
    }

    #[test]
    fn drops_text_before_first_title_and_empty_articles() {
        let text = "preamble\n\n  EMPTY ARTICLE WITHOUT ANY BODY  \nFILLED ARTICLE WITH SOME BODY\n  body line  \n";
        let articles = segment_articles(text);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "FILLED ARTICLE WITH SOME BODY");
        assert_eq!(articles[0].content, "body line\n");

        assert!(segment_articles("just some text\nwithout titles").is_empty());
    }

    #[test]
    fn empty_annotations_read_as_none() {
        let json = r#"[
            {"title": "A", "content": "b\n", "read_time": "", "link_id": ""},
            {"title": "C", "content": "d\n", "read_time": null},
            {"title": "E", "content": "f\n", "read_time": "1 minute read", "link_id": "9"}
        ]"#;
        let articles: Vec<Article> = serde_json::from_str(json).unwrap();
        assert_eq!(articles[0].read_time, None);
        assert_eq!(articles[0].link_id, None);
        assert_eq!(articles[1].read_time, None);
        assert_eq!(articles[1].link_id, None);
        assert_eq!(articles[2].read_time.as_deref(), Some("1 minute read"));
        assert_eq!(articles[2].link_id.as_deref(), Some("9"));
    }

    #[test]
    fn custom_min_len() {
        let segmenter = ArticleSegmenter::default().min_len(5);
        let articles = segmenter.segment("SHORT NEWS\nbody");
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "SHORT NEWS");
    }
}
