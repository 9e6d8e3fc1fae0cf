use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use log::info;
use structopt::clap::AppSettings;
use structopt::StructOpt;

use blattcast::podcast::PodcastModels;
use blattcast::secret::Secret;
use blattcast::{Config, Digest, MailMessage, NewsletterRecord, NewsletterStore, Pipeline};

#[allow(missing_docs)]
#[derive(Debug, StructOpt)]
#[structopt(
    name = "blattcast",
    about = "Turns newsletters into podcasts.",
    setting = AppSettings::ColoredHelp
)]
enum App {
    #[structopt(
        name = "run",
        about = "Fetch new newsletters, generate a podcast of the latest and mail it."
    )]
    Run {
        #[structopt(flatten)]
        opts: Opts,
    },
    #[structopt(name = "fetch", about = "Fetch and store new newsletters only.")]
    Fetch {
        #[structopt(flatten)]
        opts: Opts,
    },
    #[structopt(name = "process", about = "Process a single newsletter.")]
    Process {
        #[structopt(
            name = "file",
            help = "The raw email (.eml) to process.",
            parse(from_os_str)
        )]
        file: PathBuf,
        #[structopt(long = "text", help = "The file is a plain text body, not an email.")]
        text: bool,
        #[structopt(
            long = "html-fallback",
            help = "Use the html body if the email has no plain text."
        )]
        html_fallback: bool,
        #[structopt(
            long = "output",
            short = "o",
            help = "The file to store the processed newsletter as json.",
            parse(from_os_str)
        )]
        output: Option<PathBuf>,
    },
}

impl App {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            App::Run { opts } => {
                let report = Digest::builder(opts.as_config()).build()?.run().await?;
                info!(
                    "Added {} newsletters, skipped {}, {} failed",
                    report.summary.added, report.summary.skipped, report.summary.failed
                );
                if let Some(podcast) = report.podcast {
                    println!("{}", podcast.display());
                }
                Ok(())
            }
            App::Fetch { opts } => {
                let digest = Digest::builder(opts.as_config()).build()?;
                let mut store = NewsletterStore::open(digest.config().store_path()).await;
                let summary = digest.collect(&mut store).await?;
                println!(
                    "fetched: {}, added: {}, skipped: {}, failed: {}",
                    summary.fetched, summary.added, summary.skipped, summary.failed
                );
                Ok(())
            }
            App::Process {
                file,
                text,
                html_fallback,
                output,
            } => {
                let raw = tokio::fs::read(&file)
                    .await
                    .with_context(|| format!("Failed to read {:?}.", file))?;
                let pipeline = Pipeline::default();
                let json = if text {
                    let processed = pipeline.process(&String::from_utf8_lossy(&raw));
                    serde_json::to_string_pretty(&processed)?
                } else {
                    let message = MailMessage::parse(&raw)?;
                    let record = NewsletterRecord::from_mail(&message, &pipeline, html_fallback)?;
                    serde_json::to_string_pretty(&record)?
                };
                Self::write(output, json).await
            }
        }
    }

    /// If a output file is configured, then the result will be stored there,
    /// otherwise to std::out.
    async fn write(out: Option<PathBuf>, content: String) -> anyhow::Result<()> {
        if let Some(out) = out {
            tokio::fs::write(out, content).await?;
        } else {
            println!("{}", content);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, StructOpt)]
pub struct Opts {
    #[structopt(long = "user", env = "GMAIL_USER", help = "The mail account.")]
    username: String,
    #[structopt(
        long = "password",
        env = "GMAIL_PASSWORD",
        hide_env_values = true,
        help = "The mail account's (app) password."
    )]
    password: Secret,
    #[structopt(
        long = "recipient",
        env = "RECIPIENT_EMAIL",
        help = "Who gets the podcast."
    )]
    recipient: Option<String>,
    #[structopt(long = "imap-host", help = "The IMAP server.")]
    imap_host: Option<String>,
    #[structopt(long = "smtp-host", help = "The SMTP server.")]
    smtp_host: Option<String>,
    #[structopt(long = "search", help = "IMAP search criteria of newsletters.")]
    search: Option<String>,
    #[structopt(long = "unseen", help = "Only fetch unread newsletters.")]
    unseen_only: bool,
    #[structopt(
        long = "max-age",
        help = "Ignore newsletters older than this many days."
    )]
    max_age_days: Option<u64>,
    #[structopt(
        long = "html-fallback",
        help = "Use the html body of newsletters without plain text."
    )]
    html_fallback: bool,
    #[structopt(
        long = "store",
        help = "The json file of processed newsletters.",
        parse(from_os_str)
    )]
    store: Option<PathBuf>,
    #[structopt(
        long = "podcast-program",
        help = "The program that generates podcasts."
    )]
    podcast_program: Option<String>,
    #[structopt(
        long = "podcast-endpoint",
        help = "Http endpoint that generates podcasts, used instead of the program."
    )]
    podcast_endpoint: Option<String>,
    #[structopt(long = "tts-model", help = "The text to speech model.")]
    tts_model: Option<String>,
    #[structopt(long = "llm-model", help = "The model that writes the script.")]
    llm_model: Option<String>,
    #[structopt(
        long = "podcast-timeout",
        help = "Seconds to wait for a single podcast."
    )]
    podcast_timeout: Option<u64>,
    #[structopt(
        long = "audio-dir",
        help = "Where transcripts and podcasts are stored.",
        parse(from_os_str)
    )]
    audio_dir: Option<PathBuf>,
}

impl Opts {
    fn as_config(&self) -> Config {
        let mut config = Config::builder()
            .credentials(self.username.as_str(), self.password.expose())
            .unseen_only(self.unseen_only)
            .html_fallback(self.html_fallback);
        if let Some(recipient) = self.recipient.as_ref() {
            config = config.recipient(recipient);
        }
        if let Some(host) = self.imap_host.as_ref() {
            config = config.imap(host, Config::DEFAULT_IMAP_PORT);
        }
        if let Some(host) = self.smtp_host.as_ref() {
            config = config.smtp(host, Config::DEFAULT_SMTP_PORT);
        }
        if let Some(search) = self.search.as_ref() {
            config = config.search(search);
        }
        if let Some(days) = self.max_age_days {
            config = config.max_age(Duration::from_secs(days * 24 * 60 * 60));
        }
        if let Some(store) = self.store.as_ref() {
            config = config.store_path(store);
        }
        if let Some(program) = self.podcast_program.as_ref() {
            config = config.podcast_program(program);
        }
        if let Some(endpoint) = self.podcast_endpoint.as_ref() {
            config = config.podcast_endpoint(endpoint);
        }
        if self.tts_model.is_some() || self.llm_model.is_some() {
            let mut models = PodcastModels::default();
            if let Some(tts_model) = self.tts_model.clone() {
                models.tts_model = tts_model;
            }
            if let Some(llm_model) = self.llm_model.clone() {
                models.llm_model = llm_model;
            }
            config = config.podcast_models(models);
        }
        if let Some(secs) = self.podcast_timeout {
            config = config.podcast_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = self.audio_dir.as_ref() {
            config = config.output_dir(dir);
        }

        config.build()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    Ok(App::from_args().run().await?)
}
