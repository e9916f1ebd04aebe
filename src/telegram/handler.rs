//! Telegram message handling.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, UserId};

use crate::commands::permission::{CHANNEL_ADMIN, EVERYONE, OWNER};
use crate::commands::{CallerContext, Dispatcher, PermissionLevel};

/// Shared state for every update handler.
pub struct BotState {
    pub dispatcher: Dispatcher,
    pub owners: Vec<String>,
}

/// Permission level for a sender.
///
/// Telegram has no guilds, so a chat's administrators play the role of
/// channel admins, and in a private chat the sender administers their own chat.
pub fn resolve_level(
    user_id: &str,
    owners: &[String],
    is_private: bool,
    is_chat_admin: bool,
) -> PermissionLevel {
    if owners.iter().any(|o| o == user_id) {
        OWNER
    } else if is_private || is_chat_admin {
        CHANNEL_ADMIN
    } else {
        EVERYONE
    }
}

async fn is_chat_admin(bot: &Bot, msg: &Message, user_id: UserId) -> bool {
    match bot.get_chat_member(msg.chat.id, user_id).await {
        Ok(member) => member.kind.is_privileged(),
        Err(e) => {
            tracing::warn!("Failed to look up chat member {}: {}", user_id, e);
            false
        }
    }
}

/// Handle incoming messages.
pub async fn handle_message(
    bot: Bot,
    msg: Message,
    state: Arc<BotState>,
) -> Result<(), teloxide::RequestError> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if !text.starts_with(state.dispatcher.prefix()) {
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let user_id = user.id.0.to_string();
    let is_private = msg.chat.is_private();
    let is_owner = state.owners.iter().any(|o| o == &user_id);
    let is_admin = if is_private || is_owner {
        false
    } else {
        is_chat_admin(&bot, &msg, user.id).await
    };

    let chat_id = msg.chat.id.0.to_string();
    let caller = CallerContext {
        user_id: user_id.clone(),
        user_name: user.full_name(),
        level: resolve_level(&user_id, &state.owners, is_private, is_admin),
        channel_id: chat_id.clone(),
        guild_id: chat_id,
        guild_name: msg.chat.title().map(str::to_string),
    };

    let outcome = state.dispatcher.dispatch(text, caller).await;
    if let Some(reply) = outcome.reply_text() {
        send_response(&bot, msg.chat.id, &reply).await?;
    }

    Ok(())
}

/// Send a response message back to Telegram.
pub async fn send_response(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
) -> Result<Message, teloxide::RequestError> {
    bot.send_message(chat_id, text).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owners_outrank_admins() {
        let owners = vec!["7".to_string()];
        assert_eq!(resolve_level("7", &owners, false, false), OWNER);
        assert_eq!(resolve_level("8", &owners, false, true), CHANNEL_ADMIN);
        assert_eq!(resolve_level("8", &owners, true, false), CHANNEL_ADMIN);
        assert_eq!(resolve_level("8", &owners, false, false), EVERYONE);
    }
}
