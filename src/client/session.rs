//! Chat session state and the submit action

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;

use crate::conversation::{Message, Role, Transcript};

use super::decoder::Utf8StreamDecoder;
use super::transport::RelayTransport;
use super::ClientError;

/// Shown in place of a reply when the relay could not be reached or the
/// stream broke.
pub const FAILURE_MESSAGE: &str = "Something went wrong.";

/// Everything a front-end needs to draw the chat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub input: String,
    pub transcript: Transcript,
    pub busy: bool,
}

/// Outcome of [`ChatClient::submit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Empty input, or another submission was still in flight
    Ignored,
    /// Stream read to the end
    Completed,
    /// Transport failed; the failure message was recorded
    Failed,
}

/// One chat session.
///
/// Clones share the same session. At most one submission is in flight at a
/// time; the check and the state change happen under the watch channel's
/// lock, so concurrent callers cannot both get through.
pub struct ChatClient<T> {
    transport: Arc<T>,
    state: Arc<watch::Sender<ChatState>>,
}

impl<T> Clone for ChatClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            state: self.state.clone(),
        }
    }
}

/// Clears the busy flag when the submission ends, however it ends.
struct BusyGuard<'a> {
    state: &'a watch::Sender<ChatState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.busy = false);
    }
}

impl<T: RelayTransport> ChatClient<T> {
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(ChatState::default());
        Self {
            transport: Arc::new(transport),
            state: Arc::new(state),
        }
    }

    /// Receive every state change, starting from the current one.
    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ChatState {
        self.state.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().busy
    }

    pub fn set_input(&self, input: impl Into<String>) {
        let input = input.into();
        self.state.send_modify(|state| state.input = input);
    }

    /// Replace the input buffer and submit it.
    pub async fn send(&self, input: impl Into<String>) -> Submission {
        self.set_input(input);
        self.submit().await
    }

    /// Submit the current input buffer and stream the reply into the
    /// transcript.
    pub async fn submit(&self) -> Submission {
        let Some(query) = self.begin_turn() else {
            return Submission::Ignored;
        };
        let _busy = BusyGuard { state: &self.state };

        match self.stream_reply(&query).await {
            Ok(()) => Submission::Completed,
            Err(e) => {
                tracing::warn!(error = %e, "Relay request failed");
                self.record_failure();
                Submission::Failed
            }
        }
    }

    /// Claim the session for a new turn, returning the trimmed prompt.
    fn begin_turn(&self) -> Option<String> {
        let mut query = None;
        self.state.send_if_modified(|state| {
            let trimmed = state.input.trim();
            if trimmed.is_empty() || state.busy {
                return false;
            }
            let prompt = trimmed.to_string();
            state.input.clear();
            state.busy = true;
            state.transcript = state
                .transcript
                .push(Message::user(prompt.clone()))
                .push(Message::assistant(""));
            query = Some(prompt);
            true
        });
        query
    }

    async fn stream_reply(&self, query: &str) -> Result<(), ClientError> {
        let mut body = self.transport.open(query).await?;
        let mut decoder = Utf8StreamDecoder::new();

        while let Some(chunk) = body.next().await {
            let text = decoder.decode(&chunk?);
            self.fold(&text);
        }

        let tail = decoder.finish();
        self.fold(&tail);
        Ok(())
    }

    /// Rebuild the trailing assistant entry with `text` appended.
    fn fold(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.state.send_if_modified(|state| {
            match state.transcript.extend_last_assistant(text) {
                Some(next) => {
                    state.transcript = next;
                    true
                }
                None => false,
            }
        });
    }

    fn record_failure(&self) {
        self.state.send_modify(|state| {
            let placeholder_empty = matches!(
                state.transcript.last(),
                Some(last) if last.role == Role::Assistant && last.content.is_empty()
            );
            state.transcript = if placeholder_empty {
                state
                    .transcript
                    .replace_last(Message::assistant(FAILURE_MESSAGE))
            } else {
                state.transcript.push(Message::assistant(FAILURE_MESSAGE))
            };
        });
    }
}
