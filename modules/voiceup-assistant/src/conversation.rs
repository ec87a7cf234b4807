//! Conversation transcript with synthetic failure handling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::client::Assistant;

/// Inserted into the transcript when the assistant call fails.
pub const FAILURE_MESSAGE: &str = "Failed to get a response from the AI assistant.";

/// Substituted when the assistant returns an empty reply.
pub const EMPTY_REPLY_MESSAGE: &str = "Sorry, I couldn't process that. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub speaker: Speaker,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// An assistant conversation. Errors never escape `send`: a failed
/// exchange becomes one synthetic bot message and the transcript up to
/// that point stays intact.
pub struct Conversation<A> {
    assistant: A,
    messages: Vec<ChatMessage>,
}

impl<A: Assistant> Conversation<A> {
    pub fn new(assistant: A) -> Self {
        Self {
            assistant,
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send the user's message and append the bot's reply. Blank input is
    /// ignored. Returns the bot message that was appended.
    pub async fn send(&mut self, text: &str) -> Option<&ChatMessage> {
        if text.trim().is_empty() {
            return None;
        }

        self.push(Speaker::User, text.to_string());

        let reply = match self.assistant.send(text).await {
            Ok(reply) if reply.is_empty() => EMPTY_REPLY_MESSAGE.to_string(),
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "assistant exchange failed");
                FAILURE_MESSAGE.to_string()
            }
        };

        self.push(Speaker::Bot, reply);
        self.messages.last()
    }

    fn push(&mut self, speaker: Speaker, text: String) {
        self.messages.push(ChatMessage {
            speaker,
            text,
            sent_at: Utc::now(),
        });
    }
}
