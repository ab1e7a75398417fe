//! OpenAI Provider - Implementation of AIProvider for OpenAI's chat API.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("gpt-4o-mini")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```
//!
//! # Streaming
//!
//! Uses Server-Sent Events (SSE). Network chunks do not line up with SSE
//! lines, so bytes are buffered until a full line is available, then each
//! `data:` line is parsed into a `StreamChunk`. `[DONE]` ends the stream.

use async_trait::async_trait;
use futures::future;
use futures::stream::{self, StreamExt};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::ports::{
    cancellable, AIError, AIProvider, CompletionRequest, CompletionResponse, CompletionStream,
    FinishReason, MessageRole, ProviderInfo, StreamChunk, TokenUsage,
};

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Default model (e.g., "gpt-4o-mini").
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// Request timeout. Applies to connecting and to each non-streaming call.
    pub timeout: Duration,
    /// Maximum retries on transient failures.
    pub max_retries: u32,
}

impl OpenAIConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(120),
            max_retries: 3,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum retry count.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Exposes the API key (for making requests).
    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI API provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new OpenAI provider with the given configuration.
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        // No overall timeout: streamed replies may run for minutes.
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| AIError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Builds the chat completions endpoint URL.
    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    /// Converts our request to OpenAI's format.
    fn to_openai_request(&self, request: &CompletionRequest, stream: bool) -> OpenAIRequest {
        let messages = request
            .messages
            .iter()
            .map(|msg| OpenAIMessage {
                role: match msg.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            })
            .collect();

        OpenAIRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            user: Some(request.metadata.user_id.to_string()),
            stream: Some(stream),
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    /// Sends one request without retrying.
    async fn send_once(&self, body: &OpenAIRequest, stream: bool) -> Result<Response, AIError> {
        let mut builder = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(body);
        if !stream {
            builder = builder.timeout(self.config.timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AIError::Timeout {
                    timeout_secs: self.config.timeout.as_secs() as u32,
                }
            } else if e.is_connect() {
                AIError::network(format!("Connection failed: {}", e))
            } else {
                AIError::network(e.to_string())
            }
        })?;

        self.handle_response_status(response).await
    }

    /// Sends a request, retrying transient failures with exponential backoff.
    async fn send_with_retry(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<Response, AIError> {
        let body = self.to_openai_request(request, stream);
        let mut retry_count = 0;

        loop {
            match self.send_once(&body, stream).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && retry_count < self.config.max_retries => {
                    let delay = match &err {
                        AIError::RateLimited { retry_after_secs } => {
                            Duration::from_secs(u64::from(*retry_after_secs).min(30))
                        }
                        _ => Duration::from_secs(1 << retry_count),
                    };
                    tracing::warn!(
                        error = %err,
                        attempt = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "OpenAI request failed, retrying"
                    );
                    sleep(delay).await;
                    retry_count += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Parses the API response status and handles errors.
    async fn handle_response_status(&self, response: Response) -> Result<Response, AIError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(AIError::AuthenticationFailed),
            429 => Err(AIError::rate_limited(parse_retry_after(&error_body))),
            400 => {
                if error_body.contains("maximum context length")
                    || error_body.contains("context_length_exceeded")
                {
                    Err(AIError::context_too_long(error_body))
                } else if error_body.contains("content_filter")
                    || error_body.contains("content_policy")
                {
                    Err(AIError::content_filtered(error_body))
                } else {
                    Err(AIError::InvalidRequest(error_body))
                }
            }
            500..=599 => Err(AIError::unavailable(format!(
                "Server error {}: {}",
                status, error_body
            ))),
            _ => Err(AIError::network(format!(
                "Unexpected status {}: {}",
                status, error_body
            ))),
        }
    }

    /// Parses a non-streaming response.
    async fn parse_response(response: Response) -> Result<CompletionResponse, AIError> {
        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| AIError::parse(format!("Failed to parse response: {}", e)))?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AIError::parse("No choices in response"))?;

        let usage = openai_response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            model: openai_response.model,
            finish_reason: finish_reason(choice.finish_reason.as_deref()),
        })
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_with_retry(&request, false).await?;
        Self::parse_response(response).await
    }

    async fn stream_complete(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionStream, AIError> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AIError::Cancelled),
            response = self.send_with_retry(&request, true) => response?,
        };

        let chunks = response
            .bytes_stream()
            .scan(SseLineBuffer::default(), |buffer, bytes| {
                let items: Vec<Result<StreamChunk, AIError>> = match bytes {
                    Ok(bytes) => buffer
                        .push(&bytes)
                        .iter()
                        .flat_map(|line| parse_sse_line(line))
                        .collect(),
                    Err(e) => vec![Err(AIError::network(format!("Stream error: {}", e)))],
                };
                future::ready(Some(items))
            })
            .flat_map(stream::iter);

        Ok(cancellable(chunks, cancel))
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("openai", &self.config.model)
    }
}

/// Accumulates raw bytes and hands back complete lines.
#[derive(Debug, Default)]
struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Appends bytes and drains every complete line, without the line ending.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();
        String::from_utf8_lossy(&complete)
            .split('\n')
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Parses one SSE line into zero or more chunks.
fn parse_sse_line(line: &str) -> Vec<Result<StreamChunk, AIError>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Vec::new();
    };
    let data = data.trim_start();

    if data == "[DONE]" || data.is_empty() {
        return Vec::new();
    }

    let chunk = match serde_json::from_str::<StreamResponseChunk>(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            return vec![Err(AIError::parse(format!(
                "Failed to parse SSE chunk: {}",
                e
            )))]
        }
    };

    let usage = chunk
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));
    let mut results = Vec::new();

    match chunk.choices.first() {
        Some(choice) => {
            if let Some(content) = choice.delta.content.as_deref().filter(|c| !c.is_empty()) {
                results.push(Ok(StreamChunk::content(content)));
            }
            if let Some(reason) = choice.finish_reason.as_deref() {
                results.push(Ok(StreamChunk::final_chunk(
                    finish_reason(Some(reason)),
                    usage.unwrap_or_default(),
                )));
            }
        }
        // With include_usage the last event carries usage and no choices.
        None => {
            if let Some(usage) = usage {
                results.push(Ok(StreamChunk {
                    delta: String::new(),
                    finish_reason: None,
                    usage: Some(usage),
                }));
            }
        }
    }

    results
}

fn finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

/// Parses retry-after from an error body, defaulting to 30 seconds.
fn parse_retry_after(error_body: &str) -> u32 {
    let message = serde_json::from_str::<serde_json::Value>(error_body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(str::to_string));

    message
        .as_deref()
        .and_then(|s| {
            let rest = &s[s.find("try again in ")? + "try again in ".len()..];
            let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            rest[..end].parse::<u32>().ok()
        })
        .unwrap_or(30)
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamResponseChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
