//! Command handlers module
//!
//! Handlers for all bot commands like /start, /book, /slots, etc.

pub mod admin;
pub mod book;
pub mod bookings;
pub mod help;
pub mod slots;
pub mod start;

use teloxide::{prelude::*, types::Message, utils::command::BotCommands};

use crate::config::Settings;
use crate::services::ServiceFactory;
use crate::state::{DialogueManager, StateStorage};
use crate::utils::errors::Result;

/// All available bot commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "PitchBuddy commands:")]
pub enum Command {
    #[command(description = "Start the bot and set up your player profile")]
    Start,
    #[command(description = "Book the pitch or join a session")]
    Book,
    #[command(description = "Show available slots for a day")]
    Slots(String),
    #[command(description = "List upcoming bookings")]
    Bookings,
    #[command(description = "Booking overview (admin only)")]
    Admin,
    #[command(description = "Abandon the current conversation")]
    Cancel,
    #[command(description = "Show help information")]
    Help,
}

/// Main command dispatcher
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    services: ServiceFactory,
    dialogue_manager: DialogueManager,
    state_storage: StateStorage,
    settings: Settings,
) -> Result<()> {
    match cmd {
        Command::Start => start::handle_start(bot, msg, services, state_storage, settings).await,
        Command::Book => {
            book::handle_book(bot, msg, services, dialogue_manager, state_storage, settings).await
        }
        Command::Slots(day) => {
            slots::handle_slots(bot, msg, day, services, state_storage, settings).await
        }
        Command::Bookings => bookings::handle_bookings(bot, msg, services, settings).await,
        Command::Admin => admin::handle_admin(bot, msg, services, settings).await,
        Command::Cancel => handle_cancel(bot, msg, state_storage).await,
        Command::Help => help::handle_help(bot, msg).await,
    }
}

/// Handle /cancel command
async fn handle_cancel(bot: Bot, msg: Message, state_storage: StateStorage) -> Result<()> {
    if let Some(user) = msg.from.as_ref() {
        state_storage.delete_context(user.id.0 as i64).await?;
    }
    bot.send_message(msg.chat.id, "Okay, conversation abandoned. Send /book to start again.")
        .await?;
    Ok(())
}
