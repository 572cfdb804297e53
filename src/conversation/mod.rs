//! Conversation types and transcript state
//!
//! A [`Transcript`] is a persistent value: every update returns a new
//! transcript and leaves earlier snapshots untouched, so a renderer holding an
//! old snapshot never observes a half-applied change.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered, append-only chat transcript.
///
/// Cloning is cheap: entries are shared behind `Arc`s and only the spine is
/// copied when a new version is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Arc<Vec<Arc<Message>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last().map(|m| m.as_ref())
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index).map(|m| m.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().map(|m| m.as_ref())
    }

    /// Return a new transcript with `message` appended.
    pub fn push(&self, message: Message) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend(self.messages.iter().cloned());
        messages.push(Arc::new(message));
        Self {
            messages: Arc::new(messages),
        }
    }

    /// Return a new transcript whose last entry is `message`.
    ///
    /// On an empty transcript this behaves like [`Transcript::push`].
    pub fn replace_last(&self, message: Message) -> Self {
        let mut messages: Vec<Arc<Message>> = self.messages.iter().cloned().collect();
        match messages.last_mut() {
            Some(last) => *last = Arc::new(message),
            None => messages.push(Arc::new(message)),
        }
        Self {
            messages: Arc::new(messages),
        }
    }

    /// Fold a decoded fragment into the trailing assistant entry.
    ///
    /// The entry is rebuilt as `previous + fragment` and swapped in whole.
    /// Returns `None` when the transcript does not end with an assistant
    /// entry.
    pub fn extend_last_assistant(&self, fragment: &str) -> Option<Self> {
        let last = self.last()?;
        if last.role != Role::Assistant {
            return None;
        }
        let mut content = String::with_capacity(last.content.len() + fragment.len());
        content.push_str(&last.content);
        content.push_str(fragment);
        Some(self.replace_last(Message::assistant(content)))
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = Box<dyn Iterator<Item = &'a Message> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
