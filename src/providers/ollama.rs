//! Ollama provider implementation
//!
//! With `stream: true` Ollama answers with newline-delimited JSON objects,
//! each carrying a piece of `message.content`, the last one with `done: true`.

use std::time::Duration;

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::conversation::Message;

use super::lines::LineBuffer;
use super::{CompletionProvider, CompletionStream, ProviderError};

pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Interpret one NDJSON line as `(text, done)`. Error objects become `Err`.
fn parse_line(line: &str) -> Result<(Option<String>, bool), ProviderError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok((None, false));
    }
    let chunk: OllamaChunk = serde_json::from_str(line)
        .map_err(|e| ProviderError::InvalidResponse(format!("Bad stream line: {}", e)))?;
    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream(error));
    }
    let text = chunk
        .message
        .map(|m| m.content)
        .filter(|content| !content.is_empty());
    Ok((text, chunk.done))
}

impl OllamaProvider {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl CompletionProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<CompletionStream, ProviderError> {
        let ollama_messages: Vec<OllamaMessage> = messages
            .iter()
            .map(|m| OllamaMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        let request = OllamaRequest {
            model: model.to_string(),
            messages: ollama_messages,
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(Box::pin(ndjson_deltas(response)))
    }
}

/// Text deltas from an NDJSON chat body.
fn ndjson_deltas(response: reqwest::Response) -> impl Stream<Item = Result<String, ProviderError>> + Send {
    try_stream! {
        let mut body = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut done = false;

        'body: while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| ProviderError::Stream(e.to_string()))?;
            for line in lines.push(&chunk) {
                let (text, finished) = parse_line(&line)?;
                if let Some(text) = text {
                    yield text;
                }
                if finished {
                    done = true;
                    break 'body;
                }
            }
        }

        if !done {
            if let Some(line) = lines.finish() {
                let (text, _) = parse_line(&line)?;
                if let Some(text) = text {
                    yield text;
                }
            }
        }
    }
}
