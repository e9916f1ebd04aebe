//! Telegram bot client - simple polling version.

use std::sync::Arc;

use teloxide::prelude::*;

use crate::commands::build_dispatcher;
use crate::config::Settings;
use crate::error::Error;

use super::handler::{handle_message, BotState};

/// Run the telegram bot until Ctrl-C.
pub async fn run_telegram_daemon(settings: Settings) -> Result<(), Error> {
    tracing::info!("Starting Telegram bot...");

    let token = settings
        .telegram
        .bot_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::Telegram("No bot token configured".to_string()))?;

    let dispatcher = build_dispatcher(&settings)?;
    let state = Arc::new(BotState {
        dispatcher,
        owners: settings.permissions.owners.clone(),
    });

    let bot = Bot::new(token);
    match bot.get_me().await {
        Ok(me) => tracing::info!("Connected as @{}", me.username()),
        Err(e) => return Err(Error::Telegram(format!("getMe failed: {}", e))),
    }

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let state = state.clone();
        async move { handle_message(bot, msg, state).await }
    })
    .await;

    tracing::info!("Telegram bot stopped");
    Ok(())
}
