pub mod client;
pub mod conversation;

pub use client::{Assistant, AssistantClient};
pub use conversation::{
    ChatMessage, Conversation, Speaker, EMPTY_REPLY_MESSAGE, FAILURE_MESSAGE,
};
