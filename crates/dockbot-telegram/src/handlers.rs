//! Telegram update handlers.
//!
//! One inbound message maps to one dispatcher call; replies are sent back in
//! order through the messaging port so throttling and retries apply uniformly.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use tracing::error;

use dockbot_core::domain::{ChatId, UserId};

use crate::router::AppState;

const INTERNAL_ERROR_REPLY: &str = "An error occurred. Please try again later.";

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    // Updates without a sender or a text payload (stickers, photos, channel
    // posts) are ignored.
    let Some(user) = msg.from() else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = UserId(user.id.0 as i64);
    let chat_id = ChatId(msg.chat.id.0);

    let replies = match state.commands.handle(user_id, text).await {
        Ok(replies) => replies,
        Err(e) => {
            error!("Exception while handling an update: {e}");
            vec![INTERNAL_ERROR_REPLY.to_string()]
        }
    };

    for reply in replies {
        if let Err(e) = state.messenger.send_text(chat_id, &reply).await {
            error!("Failed to send reply to chat {}: {e}", chat_id.0);
        }
    }

    Ok(())
}
