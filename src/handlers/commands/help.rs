//! Help command handler

use teloxide::{prelude::*, types::Message};

use crate::utils::errors::Result;

/// Handle /help command
pub async fn handle_help(bot: Bot, msg: Message) -> Result<()> {
    let help_text = "PitchBuddy Help\n\n\
        /start - Set up your player profile\n\
        /book - Book the pitch or join a session\n\
        /slots [day] - Show available slots, e.g. /slots tomorrow\n\
        /bookings - List upcoming bookings\n\
        /cancel - Abandon the current conversation\n\
        /help - Show this message\n\n\
        The pitch is open 08:00-20:00 daily. Bookings run one or two hours; \
        open sessions accept extra players up to their limit.";

    bot.send_message(msg.chat.id, help_text).await?;
    Ok(())
}
