//! Network side of the chat client

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;

use super::ClientError;

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000/api/openai";

/// Raw response body of the relay, chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Opens a relay request for one prompt.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn open(&self, query: &str) -> Result<ByteStream, ClientError>;
}

#[derive(Debug, Serialize)]
struct RelayRequest<'a> {
    query: &'a str,
}

/// `RelayTransport` over HTTP
pub struct HttpRelay {
    client: Client,
    url: String,
}

impl HttpRelay {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl RelayTransport for HttpRelay {
    async fn open(&self, query: &str) -> Result<ByteStream, ClientError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RelayRequest { query })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ClientError::Stream(e.to_string())));
        Ok(Box::pin(body))
    }
}
