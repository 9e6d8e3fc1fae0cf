use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};

use crate::error::BlattError;
use crate::secret::Secret;

/// An attachment of a message, only described, never downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub filename: String,
    pub content_type: String,
    /// Size of the decoded payload in bytes.
    pub size: usize,
}

/// The parts of an email the digest cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailMessage {
    pub message_id: Option<String>,
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub date: Option<String>,
    /// The last non empty `text/plain` part.
    pub body_text: Option<String>,
    /// The last non empty `text/html` part.
    pub body_html: Option<String>,
    pub attachments: Vec<AttachmentInfo>,
}

impl MailMessage {
    /// Parses a raw RFC 822 message.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let parsed = mailparse::parse_mail(raw).context("Failed to parse message.")?;
        let header = |name: &str| parsed.headers.get_first_value(name);

        let mut message = MailMessage {
            message_id: header("Message-ID"),
            subject: header("Subject"),
            from: header("From"),
            to: header("To"),
            date: header("Date"),
            ..Default::default()
        };

        if parsed.subparts.is_empty() {
            let body = parsed
                .get_body()
                .context("Failed to decode message body.")?;
            if !body.is_empty() {
                if parsed.ctype.mimetype.eq_ignore_ascii_case("text/html") {
                    message.body_html = Some(body);
                } else {
                    message.body_text = Some(body);
                }
            }
        } else {
            message.collect_parts(&parsed)?;
        }

        Ok(message)
    }

    /// Walks all leaf parts in order.
    fn collect_parts(&mut self, mail: &ParsedMail) -> Result<()> {
        for part in &mail.subparts {
            if !part.subparts.is_empty() {
                self.collect_parts(part)?;
                continue;
            }

            let content_type = part.ctype.mimetype.to_lowercase();
            let disposition = part.get_content_disposition();
            let is_attachment = disposition.disposition == DispositionType::Attachment;

            if content_type == "text/plain" && !is_attachment {
                let body = part.get_body().context("Failed to decode text part.")?;
                if !body.is_empty() {
                    self.body_text = Some(body);
                }
            } else if content_type == "text/html" && !is_attachment {
                let body = part.get_body().context("Failed to decode html part.")?;
                if !body.is_empty() {
                    self.body_html = Some(body);
                }
            } else if let Some(filename) = disposition
                .params
                .get("filename")
                .or_else(|| part.ctype.params.get("name"))
            {
                let size = part.get_body_raw().map(|b| b.len()).unwrap_or_default();
                self.attachments.push(AttachmentInfo {
                    filename: filename.clone(),
                    content_type,
                    size,
                });
            }
        }
        Ok(())
    }
}

/// A message as delivered by a [`MailSource`].
///
/// Decoding can fail for single messages without failing the whole batch.
#[derive(Debug)]
pub struct FetchedMail {
    /// The mailbox specific id of the message.
    pub id: String,
    pub message: Result<MailMessage>,
}

/// Where newsletters come from.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Fetches all messages matching the source's search.
    async fn fetch(&self) -> Result<Vec<FetchedMail>>;
}

/// Fetches newsletters from an IMAP mailbox over TLS.
#[derive(Debug, Clone)]
pub struct ImapSource {
    host: String,
    port: u16,
    username: String,
    password: Secret,
    mailbox: String,
    query: String,
}

impl ImapSource {
    pub fn new<T: ToString>(host: T, port: u16, username: T, password: T) -> Self {
        Self {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: Secret::new(password.to_string()),
            mailbox: "INBOX".to_string(),
            query: "ALL".to_string(),
        }
    }

    pub fn mailbox<T: ToString>(mut self, mailbox: T) -> Self {
        self.mailbox = mailbox.to_string();
        self
    }

    /// The IMAP `SEARCH` criteria, e.g. `FROM "dan@tldrnewsletter.com"`.
    pub fn query<T: ToString>(mut self, query: T) -> Self {
        self.query = query.to_string();
        self
    }

    fn fetch_blocking(&self) -> Result<Vec<FetchedMail>> {
        let tls = native_tls::TlsConnector::builder()
            .build()
            .context("Failed to set up TLS.")?;
        let client =
            imap::connect((self.host.as_str(), self.port), &self.host, &tls).map_err(imap_err)?;
        let mut session = client
            .login(&self.username, self.password.expose())
            .map_err(|(err, _)| imap_err(err))?;

        session.select(&self.mailbox).map_err(imap_err)?;
        let mut ids: Vec<_> = session
            .search(&self.query)
            .map_err(imap_err)?
            .into_iter()
            .collect();
        ids.sort_unstable();
        info!(
            "{} messages in {} match `{}`",
            ids.len(),
            self.mailbox,
            self.query
        );

        let mut fetched = Vec::with_capacity(ids.len());
        for id in ids {
            let message = session
                .fetch(id.to_string(), "RFC822")
                .map_err(imap_err)
                .and_then(|messages| {
                    let body = messages
                        .iter()
                        .next()
                        .and_then(|m| m.body())
                        .ok_or_else(|| anyhow!("Message {} has no body.", id))?;
                    MailMessage::parse(body)
                });
            fetched.push(FetchedMail {
                id: id.to_string(),
                message,
            });
        }

        if let Err(err) = session.close().and_then(|_| session.logout()) {
            debug!("IMAP logout failed: {}", err);
        }
        Ok(fetched)
    }
}

fn imap_err(err: imap::Error) -> anyhow::Error {
    BlattError::Imap(err.to_string()).into()
}

#[async_trait]
impl MailSource for ImapSource {
    async fn fetch(&self) -> Result<Vec<FetchedMail>> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || source.fetch_blocking())
            .await
            .context("IMAP worker panicked.")?
    }
}
