use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::article::{Article, ArticleSegmenter};
use crate::boilerplate::Stripper;
use crate::clean::normalize;
use crate::section::{Section, SectionSegmenter};

lazy_static! {
    static ref DEFAULT_PIPELINE: Pipeline = Pipeline::default();
}

/// Everything the pipeline derives from a single newsletter body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedNewsletter {
    /// The normalized body.
    pub cleaned_text: String,
    /// The normalized body without newsletter chrome.
    pub content_only: String,
    /// Sections of `content_only`.
    pub sections: Vec<Section>,
    /// Articles of `content_only`, independent of `sections`.
    pub articles: Vec<Article>,
}

/// Runs normalization, boilerplate removal and both segmentations.
///
/// The rule tables of every stage can be swapped out to support other
/// newsletter formats.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stripper: Stripper,
    sections: SectionSegmenter,
    articles: ArticleSegmenter,
}

impl Pipeline {
    /// Convenience method for creating a new [`PipelineBuilder`]
    #[inline]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    #[inline]
    pub fn stripper(&self) -> &Stripper {
        &self.stripper
    }

    /// Processes a raw newsletter body.
    ///
    /// Sections and articles are two views over the same boilerplate free
    /// text, an article is never scoped to a section.
    pub fn process(&self, raw: &str) -> ProcessedNewsletter {
        let cleaned_text = normalize(raw);
        let content_only = self.stripper.strip(&cleaned_text);
        let sections = self.sections.segment(&content_only);
        let articles = self.articles.segment(&content_only);

        debug!(
            "processed newsletter: {} chars cleaned, {} chars content, {} sections, {} articles",
            cleaned_text.len(),
            content_only.len(),
            sections.len(),
            articles.len()
        );

        ProcessedNewsletter {
            cleaned_text,
            content_only,
            sections,
            articles,
        }
    }
}

#[derive(Debug, Default)]
pub struct PipelineBuilder {
    stripper: Option<Stripper>,
    sections: Option<SectionSegmenter>,
    articles: Option<ArticleSegmenter>,
}

impl PipelineBuilder {
    pub fn stripper(mut self, stripper: Stripper) -> Self {
        self.stripper = Some(stripper);
        self
    }

    pub fn sections(mut self, sections: SectionSegmenter) -> Self {
        self.sections = Some(sections);
        self
    }

    pub fn articles(mut self, articles: ArticleSegmenter) -> Self {
        self.articles = Some(articles);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            stripper: self.stripper.unwrap_or_default(),
            sections: self.sections.unwrap_or_default(),
            articles: self.articles.unwrap_or_default(),
        }
    }
}

/// Processes `raw` with the default rule tables.
pub fn process(raw: &str) -> ProcessedNewsletter {
    DEFAULT_PIPELINE.process(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boilerplate::BoilerplateRule;
    use crate::section::HeadingDetector;

    #[test]
    fn stages_feed_each_other() {
        let processed = process("  Hello\u{200b}  world  \\n\\n\\n\\nTOOLS\\nA useful tool [SPONSOR]");
        assert_eq!(
            processed.cleaned_text,
            "Hello world\n\nTOOLS\nA useful tool [SPONSOR]"
        );
        assert_eq!(processed.content_only, "Hello world\n\nTOOLS\nA useful tool");
        assert_eq!(processed.sections.len(), 1);
        assert_eq!(processed.sections[0].content, "A useful tool\n");
        assert!(processed.articles.is_empty());
    }

    #[test]
    fn empty_input() {
        let processed = process("");
        assert_eq!(processed.cleaned_text, "");
        assert_eq!(processed.content_only, "");
        assert!(processed.sections.is_empty());
        assert!(processed.articles.is_empty());
    }

    #[test]
    fn custom_tables() {
        let pipeline = Pipeline::builder()
            .stripper(Stripper::empty().rule(BoilerplateRule::new("ad", r"(?m)^AD:[^\n]*\n")))
            .sections(SectionSegmenter::new(
                HeadingDetector::new(50).keyword("WORLD"),
            ))
            .build();
        let processed = pipeline.process("AD: buy now\nWORLD NEWS\npeace at last\n[SPONSOR]");
        assert_eq!(processed.content_only, "WORLD NEWS\npeace at last\n[SPONSOR]");
        assert_eq!(processed.sections[0].title, "WORLD NEWS");
        assert_eq!(processed.sections[0].content, "peace at last\n[SPONSOR]\n");
    }
}
