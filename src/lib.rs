//! relay-chat - minimal streaming chat relay
//!
//! The server half forwards a prompt to an LLM completion API and streams
//! the generated text back as it arrives. The client half keeps a chat
//! transcript and folds the streamed text into it fragment by fragment.

use std::sync::Arc;

pub mod client;
pub mod config;
pub mod conversation;
pub mod providers;
pub mod routes;

use config::Config;
use providers::CompletionProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }
}
