use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// All different error types this crate uses.
#[derive(Error, Debug)]
pub enum BlattError {
    /// The message carries no `Message-ID` header, so it can't be
    /// deduplicated and is never stored.
    #[error("Message {} has no Message-ID header", subject.as_deref().unwrap_or("<no subject>"))]
    MissingMessageId {
        /// Subject of the offending message, if any.
        subject: Option<String>,
    },
    /// Talking to the IMAP server failed.
    #[error("IMAP failure: {0}")]
    Imap(String),
    /// The podcast command exited unsuccessfully.
    #[error("Podcast command `{program}` failed ({status}): {stderr}")]
    PodcastCommand {
        /// The program that was run.
        program: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Captured standard error.
        stderr: String,
    },
    /// The podcast command did not finish in time.
    #[error("Podcast command `{program}` timed out after {timeout:?}")]
    PodcastTimeout {
        /// The program that was run.
        program: String,
        /// The configured limit.
        timeout: Duration,
    },
    /// The generator reported an audio file that doesn't exist.
    #[error("Podcast audio file {} does not exist", path.display())]
    MissingAudio {
        /// The reported path.
        path: PathBuf,
    },
    /// Received a non success Http response from the podcast endpoint.
    #[error("Expected a 2xx Success but got: {status}")]
    NoHttpSuccess {
        /// Status of the response.
        status: reqwest::StatusCode,
    },
}
