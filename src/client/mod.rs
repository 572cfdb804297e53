//! Chat client
//!
//! Keeps the transcript for one chat session, sends prompts to the relay and
//! folds the streamed reply into the transcript as it arrives. Every change is
//! published on a watch channel so a front-end can re-render after each
//! fragment.

mod decoder;
mod session;
mod transport;
pub mod view;

use thiserror::Error;

pub use decoder::Utf8StreamDecoder;
pub use session::{ChatClient, ChatState, Submission, FAILURE_MESSAGE};
pub use transport::{ByteStream, HttpRelay, RelayTransport, DEFAULT_RELAY_URL};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Relay responded with HTTP {0}")]
    Status(u16),

    #[error("Stream error: {0}")]
    Stream(String),
}
