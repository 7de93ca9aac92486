//! Ollama extraction backend implementation.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace, warn};

use docbridge_core::{defaults, Error, ExtractionBackend, Result};

use crate::prompt::{self, ChatMessage};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = defaults::OLLAMA_URL;

/// Timeout for chat requests (seconds).
pub const GEN_TIMEOUT_SECS: u64 = defaults::GEN_TIMEOUT_SECS;

/// Ollama extraction backend.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    gen_timeout_secs: u64,
}

impl OllamaBackend {
    /// Create a backend with the default chat timeout.
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        Self::with_timeout(base_url, model, GEN_TIMEOUT_SECS)
    }

    /// Create a backend with a custom chat timeout.
    ///
    /// The timeout applies to chat requests only; model pulls may run for
    /// as long as the download takes.
    pub fn with_timeout(base_url: &str, model: &str, gen_timeout_secs: u64) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Ollama host must start with http:// or https://, got: {}",
                base_url
            )));
        }
        if model.trim().is_empty() {
            return Err(Error::Config("Ollama model cannot be empty".to_string()));
        }

        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing Ollama backend: url={}, model={}",
            base_url, model
        );

        Ok(Self {
            client,
            base_url,
            model: model.trim().to_string(),
            gen_timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one non-streaming chat request and return the reply content.
    async fn chat(&self, messages: Vec<ChatMessage>, format: Option<serde_json::Value>) -> Result<String> {
        let start = Instant::now();

        debug!(
            message_count = messages.len(),
            json_format = format.is_some(),
            "Starting chat request"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            format,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(Duration::from_secs(self.gen_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("Failed to parse response: {}", e)))?;

        let content = result.message.content;
        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = content.len(),
            duration_ms = elapsed,
            "Chat complete"
        );
        if elapsed > defaults::SLOW_INFERENCE_THRESHOLD_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow chat operation");
        }
        Ok(content)
    }

    /// Pull the configured model, consuming the NDJSON progress stream.
    #[instrument(skip(self), fields(subsystem = "inference", component = "ollama", op = "pull_model", model = %self.model))]
    async fn pull_model(&self) -> Result<()> {
        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/pull", self.base_url))
            .json(&PullRequest {
                model: self.model.clone(),
                stream: true,
            })
            .send()
            .await
            .map_err(|e| Error::Request(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let mut progress = PullProgress::new(&self.model);
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                progress.record(&line)?;
            }
        }
        progress.record(&buffer)?;

        if !progress.succeeded() {
            return Err(Error::Inference(format!(
                "Pull of {} ended without success status",
                self.model
            )));
        }

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            "Model available"
        );
        Ok(())
    }
}

/// Request payload for the Ollama `/api/chat` endpoint.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// Output constraint: `"json"` or a JSON schema object.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
}

/// Response from the Ollama `/api/chat` endpoint.
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Request payload for the Ollama `/api/pull` endpoint.
#[derive(Serialize)]
struct PullRequest {
    model: String,
    stream: bool,
}

/// One NDJSON line of pull progress.
#[derive(Deserialize)]
struct PullStatus {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Tracks pull progress lines, logging each distinct status once.
struct PullProgress<'a> {
    model: &'a str,
    seen: HashSet<String>,
    success: bool,
}

impl<'a> PullProgress<'a> {
    fn new(model: &'a str) -> Self {
        Self {
            model,
            seen: HashSet::new(),
            success: false,
        }
    }

    /// Record one line. Blank lines are ignored; an `error` line fails.
    fn record(&mut self, line: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(line);
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let update: PullStatus = serde_json::from_str(text).map_err(|e| {
            Error::MalformedResponse(format!("Invalid pull progress line: {}", e))
        })?;
        if let Some(error) = update.error {
            return Err(Error::Inference(format!("Pull failed: {}", error)));
        }

        let Some(status) = update.status else {
            return Ok(());
        };
        if !self.seen.insert(status.clone()) {
            trace!(status = %status, "Pull progress");
            return Ok(());
        }

        if status.starts_with("pulling manifest") {
            info!("Checking model {}, pulling if not present", self.model);
        } else if status == "success" {
            self.success = true;
        }
        debug!(status = %status, "Pull status");
        Ok(())
    }

    fn succeeded(&self) -> bool {
        self.success
    }
}

#[async_trait]
impl ExtractionBackend for OllamaBackend {
    #[instrument(skip(self, content, instruction), fields(subsystem = "inference", component = "ollama", op = "extract_field", model = %self.model, content_len = content.len()))]
    async fn extract_field(&self, content: &str, instruction: &str) -> Result<String> {
        let messages = prompt::extraction_messages(content, instruction);
        let reply = self.chat(messages, Some(prompt::info_schema())).await?;
        prompt::parse_info_reply(&reply)
    }

    #[instrument(skip(self), fields(subsystem = "inference", component = "ollama", op = "self_check", model = %self.model))]
    async fn self_check(&self) -> Result<bool> {
        if let Err(e) = self.pull_model().await {
            error!(error = %e, "Model pull failed");
            return Ok(false);
        }

        let start = Instant::now();
        let reply = self
            .chat(vec![ChatMessage::user(defaults::SELF_CHECK_PROMPT)], None)
            .await?;
        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            response_len = reply.len(),
            "Ollama self-check passed"
        );
        Ok(true)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
