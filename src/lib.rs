pub use article::{Article, ArticleSegmenter};
pub use boilerplate::{BoilerplateRule, Stripper};
pub use digest::{CollectSummary, Config, ConfigBuilder, Digest, DigestBuilder, RunReport};
pub use error::BlattError;
pub use mail::{FetchedMail, ImapSource, MailMessage, MailSource};
pub use pipeline::{process, Pipeline, PipelineBuilder, ProcessedNewsletter};
pub use record::NewsletterRecord;
pub use section::{HeadingDetector, Section, SectionSegmenter};
pub use storage::NewsletterStore;

pub mod article;
pub mod boilerplate;
pub mod clean;
pub mod date;
pub mod delivery;
pub mod digest;
pub mod error;
pub mod html;
pub mod mail;
pub mod pipeline;
pub mod podcast;
pub mod record;
pub mod secret;
pub mod section;
pub mod storage;
pub mod text;

/// Rexported to implement custom text cleaners.
pub use select;
