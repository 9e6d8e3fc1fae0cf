use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::error::BlattError;
use crate::html::html_to_text;
use crate::mail::MailMessage;
use crate::pipeline::Pipeline;
use crate::section::Section;

/// A processed newsletter as it is persisted.
///
/// Records are created once per `message_id` and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsletterRecord {
    /// The `Message-ID` header, unique across the store.
    pub message_id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    /// The raw `Date` header.
    #[serde(default)]
    pub date: Option<String>,
    /// The boilerplate free text of the body.
    #[serde(default)]
    pub cleaned_content: String,
    #[serde(default, alias = "newsletter_sections")]
    pub sections: Vec<Section>,
    #[serde(default, alias = "newsletter_articles")]
    pub articles: Vec<Article>,
}

impl NewsletterRecord {
    /// Runs the plain text body of `message` through `pipeline`.
    ///
    /// Messages without a plain text body are stored with empty content,
    /// unless `html_fallback` is set and there is an html body to extract the
    /// text from.
    pub fn from_mail(
        message: &MailMessage,
        pipeline: &Pipeline,
        html_fallback: bool,
    ) -> Result<Self, BlattError> {
        let message_id = message
            .message_id
            .clone()
            .ok_or_else(|| BlattError::MissingMessageId {
                subject: message.subject.clone(),
            })?;

        let body = match (&message.body_text, &message.body_html) {
            (Some(text), _) => Some(Cow::Borrowed(text.as_str())),
            (None, Some(html)) if html_fallback => Some(Cow::Owned(html_to_text(html))),
            _ => None,
        };

        let mut record = NewsletterRecord {
            message_id,
            subject: message.subject.clone(),
            from: message.from.clone(),
            date: message.date.clone(),
            cleaned_content: String::new(),
            sections: Vec::new(),
            articles: Vec::new(),
        };

        if let Some(body) = body {
            let processed = pipeline.process(&body);
            record.cleaned_content = processed.content_only;
            record.sections = processed.sections;
            record.articles = processed.articles;
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body_text: Option<&str>, body_html: Option<&str>) -> MailMessage {
        MailMessage {
            message_id: Some("<1@tldr>".to_string()),
            subject: Some("TLDR".to_string()),
            body_text: body_text.map(str::to_string),
            body_html: body_html.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn processes_plain_text_body() {
        let msg = message(
            Some("TOOLS\\nA tool [SPONSOR]\\n\\nSHIPPING A BRAND NEW THING (2 minute read)\\nDetails."),
            Some("<p>ignored</p>"),
        );
        let record = NewsletterRecord::from_mail(&msg, &Pipeline::default(), true).unwrap();
        assert_eq!(record.message_id, "<1@tldr>");
        assert!(!record.cleaned_content.contains("SPONSOR"));
        assert_eq!(record.sections.len(), 1);
        assert_eq!(record.articles.len(), 1);
        assert_eq!(record.articles[0].read_time.as_deref(), Some("2 minute read"));
    }

    #[test]
    fn missing_body_skips_structuring() {
        let msg = message(None, Some("<p>DEEP DIVES</p><p>story</p>"));
        let record = NewsletterRecord::from_mail(&msg, &Pipeline::default(), false).unwrap();
        assert_eq!(record.cleaned_content, "");
        assert!(record.sections.is_empty());
        assert!(record.articles.is_empty());

        let record = NewsletterRecord::from_mail(&msg, &Pipeline::default(), true).unwrap();
        assert_eq!(record.cleaned_content, "DEEP DIVES\nstory");
        assert_eq!(record.sections.len(), 1);
    }

    #[test]
    fn requires_message_id() {
        let msg = MailMessage {
            subject: Some("no id".to_string()),
            body_text: Some("text".to_string()),
            ..Default::default()
        };
        let err = NewsletterRecord::from_mail(&msg, &Pipeline::default(), false).unwrap_err();
        assert!(matches!(err, BlattError::MissingMessageId { .. }));
    }

    #[test]
    fn reads_legacy_field_names() {
        let json = r#"{
            "message_id": "<old@tldr>",
            "subject": "old",
            "from": "dan@tldrnewsletter.com",
            "date": "Mon, 20 Oct 2025 10:00:00 +0000",
            "cleaned_content": "TOOLS\nthing",
            "newsletter_sections": [{"title": "TOOLS", "content": "thing\n"}],
            "newsletter_articles": [{"title": "A", "content": "b\n", "read_time": ""}]
        }"#;
        let record: NewsletterRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.sections[0].title, "TOOLS");
        assert_eq!(record.articles[0].read_time, None);
        assert_eq!(record.articles[0].link_id, None);
    }
}
