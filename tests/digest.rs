use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use blattcast::delivery::Mailer;
use blattcast::podcast::PodcastGenerator;
use blattcast::{Config, Digest, FetchedMail, MailMessage, MailSource, NewsletterStore};

/// Hands out the same messages on every fetch, `None` fails to decode.
struct FakeSource(Vec<Option<MailMessage>>);

#[async_trait]
impl MailSource for FakeSource {
    async fn fetch(&self) -> Result<Vec<FetchedMail>> {
        Ok(self
            .0
            .iter()
            .enumerate()
            .map(|(idx, msg)| FetchedMail {
                id: (idx + 1).to_string(),
                message: msg.clone().ok_or_else(|| anyhow!("undecodable message")),
            })
            .collect())
    }
}

#[derive(Clone, Default)]
struct FakeGenerator(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl PodcastGenerator for FakeGenerator {
    async fn generate(&self, text: &str) -> Result<PathBuf> {
        self.0.lock().unwrap().push(text.to_string());
        Ok(PathBuf::from("episode.mp3"))
    }
}

#[derive(Clone, Default)]
struct FakeMailer(Arc<Mutex<Vec<(PathBuf, String)>>>);

#[async_trait]
impl Mailer for FakeMailer {
    async fn send_audio(&self, audio: &Path, recipient: &str) -> Result<()> {
        self.0
            .lock()
            .unwrap()
            .push((audio.to_path_buf(), recipient.to_string()));
        Ok(())
    }
}

fn newsletter(id: Option<&str>, subject: &str, date: &str) -> MailMessage {
    MailMessage {
        message_id: id.map(str::to_string),
        subject: Some(subject.to_string()),
        from: Some("TLDR <dan@tldrnewsletter.com>".to_string()),
        date: Some(date.to_string()),
        body_text: Some(format!(
            "TOOLS\\r\\nA tool for {} [SPONSOR]\\r\\n\\r\\nDEEP DIVES\\r\\nWhy {} matters",
            subject, subject
        )),
        ..Default::default()
    }
}

fn digest(config: Config, messages: Vec<Option<MailMessage>>) -> (Digest, FakeGenerator, FakeMailer) {
    let generator = FakeGenerator::default();
    let mailer = FakeMailer::default();
    let digest = Digest::builder(config)
        .source(FakeSource(messages))
        .generator(generator.clone())
        .mailer(mailer.clone())
        .build()
        .unwrap();
    (digest, generator, mailer)
}

const RECENT: &str = "Mon, 20 Oct 2025 10:00:00 +0000";

#[tokio::test]
async fn collect_isolates_failures_and_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("newsletters.json");

    let messages = vec![
        Some(newsletter(Some("<a@tldr>"), "alpha", RECENT)),
        None,
        Some(newsletter(None, "anonymous", RECENT)),
        Some(newsletter(Some("<b@tldr>"), "beta", RECENT)),
        Some(newsletter(Some("<a@tldr>"), "alpha again", RECENT)),
    ];
    let (digest, _, _) = digest(Config::default(), messages);

    let mut store = NewsletterStore::open(&path).await;
    let summary = digest.collect(&mut store).await.unwrap();
    assert_eq!(summary.fetched, 5);
    assert_eq!(summary.added, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 2);

    let reopened = NewsletterStore::open(&path).await;
    assert_eq!(reopened.len(), 2);
    assert_eq!(reopened.records()[0].subject.as_deref(), Some("alpha"));
    let latest = reopened.latest().unwrap();
    assert_eq!(latest.message_id, "<b@tldr>");
    assert_eq!(latest.sections.len(), 2);
    assert!(!latest.cleaned_content.contains("SPONSOR"));

    // nothing new the second time
    let summary = digest.collect(&mut store).await.unwrap();
    assert_eq!(summary.added, 0);
    assert_eq!(summary.skipped, 3);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn old_newsletters_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::builder()
        .max_age(Duration::from_secs(7 * 24 * 60 * 60))
        .build();
    let messages = vec![
        Some(newsletter(
            Some("<old@tldr>"),
            "ancient",
            "Mon, 1 Jan 2001 10:00:00 +0000",
        )),
        Some(newsletter(Some("<undated@tldr>"), "undated", "no date in here")),
    ];
    let (digest, _, _) = digest(config, messages);

    let mut store = NewsletterStore::new(dir.path().join("newsletters.json"));
    let summary = digest.collect(&mut store).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.added, 1);
    assert_eq!(store.latest().unwrap().message_id, "<undated@tldr>");
}

#[tokio::test]
async fn broadcasts_latest_newsletter() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::builder()
        .store_path(dir.path().join("newsletters.json"))
        .recipient("listener@example.com")
        .build();
    let messages = vec![
        Some(newsletter(Some("<a@tldr>"), "alpha", RECENT)),
        Some(newsletter(Some("<b@tldr>"), "beta", RECENT)),
    ];
    let (digest, generator, mailer) = digest(config, messages);

    let report = digest.run().await.unwrap();
    assert_eq!(report.summary.added, 2);
    assert_eq!(report.podcast, Some(PathBuf::from("episode.mp3")));

    let texts = generator.0.lock().unwrap();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Why beta matters"));

    let sent = mailer.0.lock().unwrap();
    assert_eq!(
        *sent,
        vec![(
            PathBuf::from("episode.mp3"),
            "listener@example.com".to_string()
        )]
    );
}

#[tokio::test]
async fn nothing_to_broadcast() {
    let dir = tempfile::tempdir().unwrap();
    let (digest, generator, mailer) = digest(Config::default(), Vec::new());

    let store = NewsletterStore::new(dir.path().join("newsletters.json"));
    assert_eq!(digest.broadcast(&store).await.unwrap(), None);
    assert!(generator.0.lock().unwrap().is_empty());
    assert!(mailer.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn without_recipient_nothing_is_sent() {
    let dir = tempfile::tempdir().unwrap();
    let messages = vec![Some(newsletter(Some("<a@tldr>"), "alpha", RECENT))];
    let (digest, generator, mailer) = digest(Config::default(), messages);

    let mut store = NewsletterStore::new(dir.path().join("newsletters.json"));
    digest.collect(&mut store).await.unwrap();
    let podcast = digest.broadcast(&store).await.unwrap();
    assert_eq!(podcast, Some(PathBuf::from("episode.mp3")));
    assert_eq!(generator.0.lock().unwrap().len(), 1);
    assert!(mailer.0.lock().unwrap().is_empty());
}
