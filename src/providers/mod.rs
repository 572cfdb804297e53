//! AI provider integrations
//!
//! A provider turns a model id and a message list into a lazy stream of text
//! deltas. Providers are built once at startup and shared read-only between
//! requests.

mod lines;
pub mod ollama;
pub mod openai_compat;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::config::Config;
use crate::conversation::Message;

pub use ollama::OllamaProvider;
pub use openai_compat::{OpenAICompatConfig, OpenAICompatProvider};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

/// Finite, non-restartable sequence of generated text deltas.
///
/// Ends with `None` on natural end of generation; an `Err` item means the
/// upstream failed and no further items follow.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Open a streaming completion.
    ///
    /// Resolves once the upstream has accepted the request, so connection and
    /// status failures surface here rather than inside the stream.
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
    ) -> Result<CompletionStream, ProviderError>;
}

/// Build the provider named in `config`.
pub fn from_config(config: &Config) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
    match config.provider.to_lowercase().as_str() {
        "openai" => {
            let provider = OpenAICompatProvider::new(OpenAICompatConfig {
                base_url: config.openai_base_url.clone(),
                api_key: config.openai_api_key.clone(),
                timeout_secs: config.timeout_secs,
            })?;
            Ok(Arc::new(provider))
        }
        "ollama" => {
            let provider = OllamaProvider::new(config.ollama_url.clone(), config.timeout_secs)?;
            Ok(Arc::new(provider))
        }
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted provider and fake-upstream helpers shared by unit tests.

    use std::sync::Mutex;

    use axum::Router;

    use super::*;

    #[derive(Debug, Clone)]
    pub enum Step {
        Fragment(&'static str),
        Fail(&'static str),
    }

    /// Provider that replays a fixed script and records every call.
    #[derive(Default)]
    pub struct ScriptedProvider {
        steps: Vec<Step>,
        refuse: bool,
        pub calls: Mutex<Vec<(String, Vec<Message>)>>,
    }

    impl ScriptedProvider {
        pub fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                ..Self::default()
            }
        }

        /// A provider whose upstream rejects the request before streaming.
        pub fn refusing() -> Self {
            Self {
                refuse: true,
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn stream_chat(
            &self,
            model: &str,
            messages: &[Message],
        ) -> Result<CompletionStream, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), messages.to_vec()));

            if self.refuse {
                return Err(ProviderError::Status {
                    status: 401,
                    message: "Incorrect API key provided".into(),
                });
            }

            let items: Vec<Result<String, ProviderError>> = self
                .steps
                .iter()
                .map(|step| match step {
                    Step::Fragment(text) => Ok(text.to_string()),
                    Step::Fail(reason) => Err(ProviderError::Stream(reason.to_string())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    /// Serve `router` on an ephemeral local port and return its base URL.
    pub async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_known_providers() {
        let mut config = Config::default();
        assert_eq!(from_config(&config).unwrap().name(), "openai");

        config.provider = "Ollama".into();
        assert_eq!(from_config(&config).unwrap().name(), "ollama");
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let config = Config {
            provider: "anthropic".into(),
            ..Config::default()
        };
        let err = from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::UnknownProvider(ref name) if name == "anthropic"));
    }
}
