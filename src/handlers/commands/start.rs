//! Start command handler
//!
//! /start registers a player profile keyed by the Telegram account. The
//! display name is taken from Telegram; the level is picked from inline
//! buttons and defaults to intermediate until changed.

use teloxide::{
    prelude::*,
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message},
};
use tracing::info;

use crate::config::Settings;
use crate::models::booking::PlayerLevel;
use crate::services::ServiceFactory;
use crate::state::StateStorage;
use crate::utils::errors::{PitchBuddyError, Result};

/// Handle /start command
pub async fn handle_start(
    bot: Bot,
    msg: Message,
    services: ServiceFactory,
    state_storage: StateStorage,
    settings: Settings,
) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| {
        PitchBuddyError::InvalidInput("No user in message".to_string())
    })?;
    let user_id = user.id.0 as i64;

    // A fresh /start always discards any half-finished conversation
    state_storage.delete_context(user_id).await?;

    let existing = services.player_service.get_by_telegram_id(user_id).await?;
    let name = existing
        .as_ref()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| user.first_name.trim().to_string());

    let text = format!(
        "Welcome to the {} booking bot, {}!\n\n\
         I can show you free slots, book the pitch for you and get you into \
         open sessions. Send /book to get going, or /help for the full list.\n\n\
         First, how would you rate your level?",
        settings.pitch.name, name
    );

    bot.send_message(msg.chat.id, text)
        .reply_markup(level_keyboard())
        .await?;
    Ok(())
}

/// Handle a `level:` callback from the onboarding keyboard
pub async fn handle_level_callback(
    bot: Bot,
    chat_id: ChatId,
    user_id: i64,
    telegram_name: &str,
    level_code: &str,
    services: ServiceFactory,
) -> Result<()> {
    let Some(level) = PlayerLevel::parse(level_code) else {
        return Err(PitchBuddyError::InvalidInput(format!(
            "Unknown level: {}",
            level_code
        )));
    };

    let name = match services.player_service.get_by_telegram_id(user_id).await? {
        Some(player) => player.name,
        None => telegram_name.trim().to_string(),
    };

    let player = services
        .player_service
        .register(user_id, name, level)
        .await?;

    info!(user_id = user_id, level = level.as_str(), "Player level set");

    bot.send_message(
        chat_id,
        format!(
            "Noted, {} ({}). Send /book whenever you want to play.",
            player.name,
            player.level.as_str()
        ),
    )
    .await?;
    Ok(())
}

fn level_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("Beginner", "level:beginner"),
        InlineKeyboardButton::callback("Intermediate", "level:intermediate"),
        InlineKeyboardButton::callback("Advanced", "level:advanced"),
    ]])
}
