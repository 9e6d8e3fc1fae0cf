//! Turning newsletter text into audio.
//!
//! The actual text to speech work happens outside of this crate, either in a
//! program that is spawned per podcast or in an http service.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use reqwest::Client;
use serde::Serialize;

use crate::error::BlattError;

/// Produces an audio file for a text.
#[async_trait]
pub trait PodcastGenerator: Send + Sync {
    /// Returns the path of the generated audio file.
    async fn generate(&self, text: &str) -> Result<PathBuf>;
}

/// Models handed to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodcastModels {
    /// The text to speech model, e.g. `openai`.
    pub tts_model: String,
    /// The model that writes the podcast script, e.g. `gpt-4-turbo`.
    pub llm_model: String,
    /// Name of the api key the generator reads from its environment.
    pub api_key_label: String,
}

impl Default for PodcastModels {
    fn default() -> Self {
        Self {
            tts_model: "openai".to_string(),
            llm_model: "gpt-4-turbo".to_string(),
            api_key_label: "openai_api_key".to_string(),
        }
    }
}

/// Timestamped file name in the output directory.
fn output_file(dir: &Path, prefix: &str, ext: &str) -> PathBuf {
    dir.join(format!(
        "{}-{}.{}",
        prefix,
        Utc::now().format("%Y%m%d-%H%M%S%3f"),
        ext
    ))
}

/// Runs an external program per podcast.
///
/// The program is called as
/// `<program> [args..] --transcript-file <file> --tts-model <m> --llm-model <m> --api-key-label <label>`
/// and must print the path of the audio file as the last line of its
/// standard output.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
    models: PodcastModels,
    output_dir: PathBuf,
    timeout: Duration,
}

impl CommandGenerator {
    /// Default limit for a single podcast.
    pub const DEFAULT_TIMEOUT_SEC: u64 = 30 * 60;

    pub fn new<T: ToString, P: AsRef<Path>>(program: T, output_dir: P) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            models: PodcastModels::default(),
            output_dir: output_dir.as_ref().to_path_buf(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SEC),
        }
    }

    /// Arguments passed before the generated ones.
    pub fn arg<T: ToString>(mut self, arg: T) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn models(mut self, models: PodcastModels) -> Self {
        self.models = models;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PodcastGenerator for CommandGenerator {
    async fn generate(&self, text: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {:?}.", self.output_dir))?;
        // the program runs inside the output dir, so every path handed to it
        // has to be absolute
        let output_dir = tokio::fs::canonicalize(&self.output_dir)
            .await
            .with_context(|| format!("Failed to resolve {:?}.", self.output_dir))?;
        let transcript = output_file(&output_dir, "transcript", "txt");
        tokio::fs::write(&transcript, text)
            .await
            .with_context(|| format!("Failed to write {:?}.", transcript))?;

        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--transcript-file")
            .arg(&transcript)
            .arg("--tts-model")
            .arg(&self.models.tts_model)
            .arg("--llm-model")
            .arg(&self.models.llm_model)
            .arg("--api-key-label")
            .arg(&self.models.api_key_label)
            .current_dir(&output_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running podcast command {:?}", cmd);
        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn `{}`.", self.program))?;
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| BlattError::PodcastTimeout {
                program: self.program.clone(),
                timeout: self.timeout,
            })??;

        if !output.status.success() {
            return Err(BlattError::PodcastCommand {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .unwrap_or_default();
        let path = output_dir.join(reported);
        if reported.is_empty() || !path.is_file() {
            return Err(BlattError::MissingAudio { path }.into());
        }

        info!("Generated podcast {:?}", path);
        Ok(path)
    }
}

#[derive(Debug, Serialize)]
struct PodcastRequest<'a> {
    text: &'a str,
    #[serde(flatten)]
    models: &'a PodcastModels,
}

/// Posts the text to an http endpoint that answers with the audio bytes.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: Client,
    endpoint: String,
    models: PodcastModels,
    output_dir: PathBuf,
}

impl HttpGenerator {
    pub fn new<T: ToString, P: AsRef<Path>>(
        endpoint: T,
        output_dir: P,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.to_string(),
            models: PodcastModels::default(),
            output_dir: output_dir.as_ref().to_path_buf(),
        })
    }

    pub fn models(mut self, models: PodcastModels) -> Self {
        self.models = models;
        self
    }
}

#[async_trait]
impl PodcastGenerator for HttpGenerator {
    async fn generate(&self, text: &str) -> Result<PathBuf> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&PodcastRequest {
                text,
                models: &self.models,
            })
            .send()
            .await
            .with_context(|| format!("Request to {} failed.", self.endpoint))?;

        if !resp.status().is_success() {
            let msg = format!("Unsuccessful request to {:?}", resp.url());
            return Err(BlattError::NoHttpSuccess {
                status: resp.status(),
            })
            .context(msg);
        }

        let audio = resp.bytes().await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = output_file(&self.output_dir, "podcast", "mp3");
        tokio::fs::write(&path, &audio)
            .await
            .with_context(|| format!("Failed to write {:?}.", path))?;

        info!("Generated podcast {:?} ({} bytes)", path, audio.len());
        Ok(path)
    }
}
