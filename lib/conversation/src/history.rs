//! The ordered transcript of a conversation.

use crate::message::ChatMessage;
use serde::{Deserialize, Serialize};

/// Append-only sequence of chat messages.
///
/// The transcript is replayed verbatim to the completion backend every turn,
/// so there is no way to remove, replace or reorder a message once it has
/// been appended. A run owns its history by value; handing out a copy means
/// cloning, which gives the receiver an independent version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history from prior messages, keeping their order.
    #[must_use]
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Appends a message to the end of the transcript.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Returns this history with `message` appended.
    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.append(message);
        self
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Iterates over the messages in order.
    pub fn iter(&self) -> std::slice::Iter<'_, ChatMessage> {
        self.messages.iter()
    }

    /// Returns the most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Consumes the history, returning the messages.
    #[must_use]
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages
    }
}

impl From<Vec<ChatMessage>> for ConversationHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self::from_messages(messages)
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a ChatMessage;
    type IntoIter = std::slice::Iter<'a, ChatMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
