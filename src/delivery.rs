use std::path::Path;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::info;

use crate::secret::Secret;

/// Sends generated podcasts to their listeners.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_audio(&self, audio: &Path, recipient: &str) -> Result<()>;
}

/// Delivers over SMTP with STARTTLS.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
    username: String,
    password: Secret,
    subject: String,
}

impl SmtpMailer {
    pub const DEFAULT_SUBJECT: &'static str = "Your Podcast Audio File";

    pub fn new<T: ToString>(host: T, port: u16, username: T, password: T) -> Self {
        Self {
            host: host.to_string(),
            port,
            username: username.to_string(),
            password: Secret::new(password.to_string()),
            subject: Self::DEFAULT_SUBJECT.to_string(),
        }
    }

    pub fn subject<T: ToString>(mut self, subject: T) -> Self {
        self.subject = subject.to_string();
        self
    }

    /// Builds the email with `audio` attached under `filename`.
    pub fn message(&self, filename: &str, audio: Vec<u8>, recipient: &str) -> Result<Message> {
        let octet_stream = ContentType::parse("application/octet-stream")
            .map_err(|e| anyhow!("Invalid content type: {}", e))?;
        let attachment = Attachment::new(filename.to_string()).body(audio, octet_stream);

        Message::builder()
            .from(
                self.username
                    .parse()
                    .with_context(|| format!("Invalid sender address {:?}.", self.username))?,
            )
            .to(recipient
                .parse()
                .with_context(|| format!("Invalid recipient address {:?}.", recipient))?)
            .subject(self.subject.as_str())
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(format!(
                        "Your newsletter podcast {} is attached.",
                        filename
                    )))
                    .singlepart(attachment),
            )
            .context("Failed to build email.")
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_audio(&self, audio: &Path, recipient: &str) -> Result<()> {
        let filename = audio
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "podcast.mp3".to_string());
        let body = tokio::fs::read(audio)
            .await
            .with_context(|| format!("Failed to read {:?}.", audio))?;
        let email = self.message(&filename, body, recipient)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .with_context(|| format!("Failed to set up SMTP relay {}.", self.host))?
            .port(self.port)
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.expose().to_string(),
            ))
            .build();
        transport
            .send(email)
            .await
            .with_context(|| format!("Failed to send email to {}.", recipient))?;

        info!("Email sent to {} with attachment {:?}", recipient, audio);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attaches_audio() {
        let mailer = SmtpMailer::new("smtp.example.com", 587, "me@example.com", "secret");
        let email = mailer
            .message("episode.mp3", b"ID3 audio".to_vec(), "you@example.com")
            .unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();
        assert!(formatted.contains("Subject: Your Podcast Audio File"));
        assert!(formatted.contains("To: you@example.com"));
        assert!(formatted.contains("filename=\"episode.mp3\""));
        assert!(formatted.contains("application/octet-stream"));
    }

    #[test]
    fn debug_hides_password() {
        let mailer = SmtpMailer::new("smtp.example.com", 587, "me@example.com", "hunter2");
        assert!(!format!("{:?}", mailer).contains("hunter2"));
    }

    #[test]
    fn rejects_bad_recipient() {
        let mailer = SmtpMailer::new("smtp.example.com", 587, "me@example.com", "secret");
        assert!(mailer.message("a.mp3", Vec::new(), "not an address").is_err());
    }
}
