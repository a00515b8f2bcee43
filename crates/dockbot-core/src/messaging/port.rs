use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Cross-messenger port.
///
/// Telegram is the first implementation; the shape is deliberately small so
/// future adapters (Slack/Discord) fit behind the same interface.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send plain text to a chat, with no markup parsing.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;
}
