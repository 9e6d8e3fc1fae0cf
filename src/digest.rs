use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};

use crate::date::is_recent;
use crate::delivery::{Mailer, SmtpMailer};
use crate::mail::{ImapSource, MailSource};
use crate::pipeline::Pipeline;
use crate::podcast::{CommandGenerator, HttpGenerator, PodcastGenerator, PodcastModels};
use crate::record::NewsletterRecord;
use crate::secret::Secret;
use crate::storage::NewsletterStore;
use crate::text::is_blank;

/// Fetches newsletters, stores them and turns the latest into a podcast.
pub struct Digest {
    config: Config,
    pipeline: Pipeline,
    source: Box<dyn MailSource>,
    generator: Box<dyn PodcastGenerator>,
    mailer: Box<dyn Mailer>,
}

/// What a single [`Digest::collect`] pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectSummary {
    /// Messages the source returned.
    pub fetched: usize,
    /// New records in the store.
    pub added: usize,
    /// Messages that were already stored or too old.
    pub skipped: usize,
    /// Messages that couldn't be decoded or processed.
    pub failed: usize,
}

/// The outcome of [`Digest::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: CollectSummary,
    /// The generated audio file, if there was anything to read out.
    pub podcast: Option<PathBuf>,
}

impl Digest {
    /// Convenience method for creating a new [`DigestBuilder`]
    ///
    /// Same as calling [`DigestBuilder::new`]
    #[inline]
    pub fn builder(config: Config) -> DigestBuilder {
        DigestBuilder::new(config)
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches all matching messages and stores the new ones.
    ///
    /// Failures of single messages are logged and skipped, they never abort
    /// the pass. The store is only written if something was added.
    pub async fn collect(&self, store: &mut NewsletterStore) -> Result<CollectSummary> {
        let fetched = self
            .source
            .fetch()
            .await
            .context("Failed to fetch newsletters.")?;

        let mut summary = CollectSummary {
            fetched: fetched.len(),
            ..Default::default()
        };
        let max_age = self
            .config
            .max_age
            .and_then(|age| chrono::Duration::from_std(age).ok());
        let now = Utc::now();

        for mail in fetched {
            let message = match mail.message {
                Ok(message) => message,
                Err(err) => {
                    warn!("Error processing email {}: {:#}", mail.id, err);
                    summary.failed += 1;
                    continue;
                }
            };

            if let Some(id) = message.message_id.as_deref().filter(|id| store.contains(id)) {
                debug!("Skipping known newsletter {}", id);
                summary.skipped += 1;
                continue;
            }

            if let (Some(max_age), Some(date)) = (max_age, message.date.as_deref()) {
                if !is_recent(date, max_age, now) {
                    debug!("Skipping email {} from {}", mail.id, date);
                    summary.skipped += 1;
                    continue;
                }
            }

            match NewsletterRecord::from_mail(&message, &self.pipeline, self.config.html_fallback)
            {
                Ok(record) => {
                    info!(
                        "Processed: {}",
                        record.subject.as_deref().unwrap_or("Unknown Subject")
                    );
                    if store.insert(record) {
                        summary.added += 1;
                    } else {
                        summary.skipped += 1;
                    }
                }
                Err(err) => {
                    warn!("Error processing email {}: {}", mail.id, err);
                    summary.failed += 1;
                }
            }
        }

        if summary.added > 0 {
            store.save().await?;
            info!(
                "Processed {} new newsletters, {} saved to {:?}",
                summary.added,
                store.len(),
                store.path()
            );
        } else {
            info!("No new newsletters to process");
        }

        if let Some(latest) = store.latest() {
            info!(
                "Latest newsletter: {:?} from {:?} ({:?}), {} sections, {} articles",
                latest.subject.as_deref().unwrap_or_default(),
                latest.from.as_deref().unwrap_or_default(),
                latest.date.as_deref().unwrap_or_default(),
                latest.sections.len(),
                latest.articles.len()
            );
        }

        Ok(summary)
    }

    /// Turns the latest stored newsletter into a podcast and mails it to the
    /// configured recipient.
    ///
    /// The newest record is read out, not the oldest one in the store, so
    /// every run covers the issue that arrived last.
    ///
    /// Returns `None` if there is nothing to read out.
    pub async fn broadcast(&self, store: &NewsletterStore) -> Result<Option<PathBuf>> {
        let latest = match store.latest() {
            Some(latest) if !is_blank(&latest.cleaned_content) => latest,
            _ => {
                info!("No newsletter content to turn into a podcast");
                return Ok(None);
            }
        };

        let audio = self
            .generator
            .generate(&latest.cleaned_content)
            .await
            .with_context(|| format!("Failed to generate podcast for {}.", latest.message_id))?;

        match &self.config.recipient {
            Some(recipient) => self.mailer.send_audio(&audio, recipient).await?,
            None => info!("No recipient configured, podcast stays at {:?}", audio),
        }

        Ok(Some(audio))
    }

    /// Collects into the configured store, then broadcasts.
    pub async fn run(&self) -> Result<RunReport> {
        let mut store = NewsletterStore::open(&self.config.store_path).await;
        let summary = self.collect(&mut store).await?;
        let podcast = self.broadcast(&store).await?;
        Ok(RunReport { summary, podcast })
    }
}

pub struct DigestBuilder {
    config: Config,
    pipeline: Option<Pipeline>,
    source: Option<Box<dyn MailSource>>,
    generator: Option<Box<dyn PodcastGenerator>>,
    mailer: Option<Box<dyn Mailer>>,
}

impl DigestBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pipeline: None,
            source: None,
            generator: None,
            mailer: None,
        }
    }

    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn source<T: MailSource + 'static>(mut self, source: T) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn generator<T: PodcastGenerator + 'static>(mut self, generator: T) -> Self {
        self.generator = Some(Box::new(generator));
        self
    }

    pub fn mailer<T: Mailer + 'static>(mut self, mailer: T) -> Self {
        self.mailer = Some(Box::new(mailer));
        self
    }

    /// Fills every collaborator that wasn't set with the one the config
    /// describes: IMAP, SMTP and a podcast command or endpoint.
    pub fn build(self) -> Result<Digest> {
        let config = self.config;

        let source: Box<dyn MailSource> = match self.source {
            Some(source) => source,
            None => Box::new(
                ImapSource::new(
                    config.imap_host.as_str(),
                    config.imap_port,
                    config.username.as_str(),
                    config.password.expose(),
                )
                .mailbox(&config.mailbox)
                .query(config.search_query()),
            ),
        };

        let generator: Box<dyn PodcastGenerator> = match (self.generator, &config.podcast_endpoint)
        {
            (Some(generator), _) => generator,
            (None, Some(endpoint)) => Box::new(
                HttpGenerator::new(endpoint, &config.output_dir, config.podcast_timeout)?
                    .models(config.podcast_models.clone()),
            ),
            (None, None) => Box::new(
                config
                    .podcast_args
                    .iter()
                    .fold(
                        CommandGenerator::new(&config.podcast_program, &config.output_dir),
                        |cmd, arg| cmd.arg(arg),
                    )
                    .models(config.podcast_models.clone())
                    .timeout(config.podcast_timeout),
            ),
        };

        let mailer: Box<dyn Mailer> = match self.mailer {
            Some(mailer) => mailer,
            None => Box::new(SmtpMailer::new(
                config.smtp_host.as_str(),
                config.smtp_port,
                config.username.as_str(),
                config.password.expose(),
            )),
        };

        Ok(Digest {
            pipeline: self.pipeline.unwrap_or_default(),
            config,
            source,
            generator,
            mailer,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Account used for IMAP and SMTP.
    username: String,
    password: Secret,
    imap_host: String,
    imap_port: u16,
    /// The mailbox to search.
    mailbox: String,
    /// IMAP search criteria of newsletters.
    search: String,
    /// Only consider messages without the `\Seen` flag.
    unseen_only: bool,
    smtp_host: String,
    smtp_port: u16,
    /// Who gets the podcast, nobody if `None`.
    recipient: Option<String>,
    /// The json file of all processed newsletters.
    store_path: PathBuf,
    /// Program that generates podcasts.
    podcast_program: String,
    /// Arguments passed to the program before the generated ones.
    podcast_args: Vec<String>,
    /// Endpoint that generates podcasts, preferred over the program.
    podcast_endpoint: Option<String>,
    podcast_models: PodcastModels,
    /// Limit for generating a single podcast.
    podcast_timeout: Duration,
    /// Where transcripts and audio files go.
    output_dir: PathBuf,
    /// Ignore messages older than this.
    max_age: Option<Duration>,
    /// Use the html body if a message has no plain text.
    html_fallback: bool,
}

impl Config {
    pub const DEFAULT_IMAP_HOST: &'static str = "imap.gmail.com";

    pub const DEFAULT_IMAP_PORT: u16 = 993;

    pub const DEFAULT_SMTP_HOST: &'static str = "smtp.gmail.com";

    pub const DEFAULT_SMTP_PORT: u16 = 587;

    pub const DEFAULT_SEARCH: &'static str = r#"FROM "dan@tldrnewsletter.com""#;

    pub const DEFAULT_STORE_PATH: &'static str = "data/formatted_email_output/newsletters.json";

    /// Convenience method to create a [`ConfigBuilder`]
    #[inline]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The full IMAP search criteria.
    pub fn search_query(&self) -> String {
        if self.unseen_only {
            format!("UNSEEN {}", self.search)
        } else {
            self.search.clone()
        }
    }

    #[inline]
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    #[inline]
    pub fn recipient(&self) -> Option<&str> {
        self.recipient.as_deref()
    }

    #[inline]
    pub fn html_fallback(&self) -> bool {
        self.html_fallback
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    username: Option<String>,
    password: Option<Secret>,
    imap_host: Option<String>,
    imap_port: Option<u16>,
    mailbox: Option<String>,
    search: Option<String>,
    unseen_only: Option<bool>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    recipient: Option<String>,
    store_path: Option<PathBuf>,
    podcast_program: Option<String>,
    podcast_args: Vec<String>,
    podcast_endpoint: Option<String>,
    podcast_models: Option<PodcastModels>,
    podcast_timeout: Option<Duration>,
    output_dir: Option<PathBuf>,
    max_age: Option<Duration>,
    html_fallback: Option<bool>,
}

impl ConfigBuilder {
    pub fn credentials<T: ToString>(mut self, username: T, password: T) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(Secret::new(password.to_string()));
        self
    }

    pub fn imap<T: ToString>(mut self, host: T, port: u16) -> Self {
        self.imap_host = Some(host.to_string());
        self.imap_port = Some(port);
        self
    }

    pub fn mailbox<T: ToString>(mut self, mailbox: T) -> Self {
        self.mailbox = Some(mailbox.to_string());
        self
    }

    pub fn search<T: ToString>(mut self, search: T) -> Self {
        self.search = Some(search.to_string());
        self
    }

    pub fn unseen_only(mut self, unseen_only: bool) -> Self {
        self.unseen_only = Some(unseen_only);
        self
    }

    pub fn smtp<T: ToString>(mut self, host: T, port: u16) -> Self {
        self.smtp_host = Some(host.to_string());
        self.smtp_port = Some(port);
        self
    }

    pub fn recipient<T: ToString>(mut self, recipient: T) -> Self {
        self.recipient = Some(recipient.to_string());
        self
    }

    pub fn store_path<T: AsRef<Path>>(mut self, store_path: T) -> Self {
        self.store_path = Some(store_path.as_ref().to_path_buf());
        self
    }

    pub fn podcast_program<T: ToString>(mut self, program: T) -> Self {
        self.podcast_program = Some(program.to_string());
        self
    }

    pub fn podcast_arg<T: ToString>(mut self, arg: T) -> Self {
        self.podcast_args.push(arg.to_string());
        self
    }

    pub fn podcast_endpoint<T: ToString>(mut self, endpoint: T) -> Self {
        self.podcast_endpoint = Some(endpoint.to_string());
        self
    }

    pub fn podcast_models(mut self, models: PodcastModels) -> Self {
        self.podcast_models = Some(models);
        self
    }

    pub fn podcast_timeout(mut self, timeout: Duration) -> Self {
        self.podcast_timeout = Some(timeout);
        self
    }

    pub fn output_dir<T: AsRef<Path>>(mut self, output_dir: T) -> Self {
        self.output_dir = Some(output_dir.as_ref().to_path_buf());
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn html_fallback(mut self, html_fallback: bool) -> Self {
        self.html_fallback = Some(html_fallback);
        self
    }

    pub fn build(self) -> Config {
        Config {
            username: self.username.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
            imap_host: self
                .imap_host
                .unwrap_or_else(|| Config::DEFAULT_IMAP_HOST.to_string()),
            imap_port: self.imap_port.unwrap_or(Config::DEFAULT_IMAP_PORT),
            mailbox: self.mailbox.unwrap_or_else(|| "INBOX".to_string()),
            search: self
                .search
                .unwrap_or_else(|| Config::DEFAULT_SEARCH.to_string()),
            unseen_only: self.unseen_only.unwrap_or_default(),
            smtp_host: self
                .smtp_host
                .unwrap_or_else(|| Config::DEFAULT_SMTP_HOST.to_string()),
            smtp_port: self.smtp_port.unwrap_or(Config::DEFAULT_SMTP_PORT),
            recipient: self.recipient,
            store_path: self
                .store_path
                .unwrap_or_else(|| PathBuf::from(Config::DEFAULT_STORE_PATH)),
            podcast_program: self
                .podcast_program
                .unwrap_or_else(|| "podcastfy".to_string()),
            podcast_args: self.podcast_args,
            podcast_endpoint: self.podcast_endpoint,
            podcast_models: self.podcast_models.unwrap_or_default(),
            podcast_timeout: self.podcast_timeout.unwrap_or_else(|| {
                Duration::from_secs(CommandGenerator::DEFAULT_TIMEOUT_SEC)
            }),
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from("data/audio")),
            max_age: self.max_age,
            html_fallback: self.html_fallback.unwrap_or_default(),
        }
    }
}
