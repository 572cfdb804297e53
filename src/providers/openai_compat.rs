//! OpenAI-compatible provider
//!
//! Works with any API that implements the OpenAI chat completions format
//! with server-sent event streaming:
//! - OpenAI (api.openai.com)
//! - Groq (api.groq.com)
//! - vLLM (local server)
//! - LM Studio (local server)
//!
//! The stream is a sequence of `data: {json}` lines; text arrives in
//! `choices[0].delta.content` and the body ends with `data: [DONE]`.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::conversation::Message;

use super::lines::LineBuffer;
use super::{CompletionProvider, CompletionStream, ProviderError};

/// OpenAI-compatible chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }
    }
}

/// Streaming chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

/// One SSE payload
#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Error response from API
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// What a single SSE line means for the stream
#[derive(Debug, PartialEq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine, ProviderError> {
    let Some(data) = line.strip_prefix("data:") else {
        // comments, `event:` fields and blank separators
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }

    let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::warn!("Skipping unparseable SSE payload: {}", e);
            return Ok(SseLine::Skip);
        }
    };

    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream(error.message));
    }

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .unwrap_or_default();

    if text.is_empty() {
        Ok(SseLine::Skip)
    } else {
        Ok(SseLine::Delta(text))
    }
}

fn status_error(status: StatusCode, body: &str) -> ProviderError {
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error_resp) => error_resp.error.message,
        Err(_) => body.to_string(),
    };
    ProviderError::Status {
        status: status.as_u16(),
        message,
    }
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone)]
pub struct OpenAICompatConfig {
    /// Base URL for the API (e.g., https://api.openai.com/v1)
    pub base_url: String,
    /// API key (optional for local servers)
    pub api_key: Option<String>,
    /// Total request timeout in seconds, body included
    pub timeout_secs: u64,
}

/// OpenAI-compatible API provider
pub struct OpenAICompatProvider {
    config: OpenAICompatConfig,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a new provider with the given configuration
    pub fn new(config: OpenAICompatConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<CompletionStream, ProviderError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: messages.iter().map(ChatMessage::from).collect(),
            stream: true,
        };

        let mut req_builder = self.client.post(&url);

        // Add authorization if API key is provided
        if let Some(ref api_key) = self.config.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        tracing::debug!(%url, model, "Upstream stream opened");

        Ok(Box::pin(sse_deltas(response)))
    }
}

/// Text deltas from an SSE completion body.
fn sse_deltas(response: reqwest::Response) -> impl Stream<Item = Result<String, ProviderError>> + Send {
    try_stream! {
        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut done = false;

        'body: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ProviderError::Stream(e.to_string()))?;
            for line in lines.push(&chunk) {
                match parse_sse_line(&line)? {
                    SseLine::Delta(text) => {
                        yield text;
                    }
                    SseLine::Done => {
                        done = true;
                        break 'body;
                    }
                    SseLine::Skip => {}
                }
            }
        }

        // A final event may lack its trailing newline
        if !done {
            if let Some(line) = lines.finish() {
                if let SseLine::Delta(text) = parse_sse_line(&line)? {
                    yield text;
                }
            }
        }
    }
}
