//! Admin command handler

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, Message},
};
use tracing::warn;

use crate::config::Settings;
use crate::services::ServiceFactory;
use crate::utils::helpers::{format_day, format_hour};
use crate::utils::errors::{PitchBuddyError, Result};
use crate::utils::logging::log_admin_action;

/// Handle /admin command: every booking plus aggregate counts, with a
/// delete button per booking.
pub async fn handle_admin(
    bot: Bot,
    msg: Message,
    services: ServiceFactory,
    settings: Settings,
) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| {
        PitchBuddyError::InvalidInput("No user in message".to_string())
    })?;
    let user_id = user.id.0 as i64;

    if !settings.bot.admin_ids.contains(&user_id) {
        warn!(user_id = user_id, "Admin command from non-admin");
        bot.send_message(msg.chat.id, "This command is for administrators only.")
            .await?;
        return Ok(());
    }

    log_admin_action(user_id, "overview", None);

    let overview = services.booking_service.admin_overview().await?;

    let mut lines = vec![format!(
        "Bookings: {} | Participants: {} | Registered players: {}",
        overview.total_bookings, overview.total_participants, overview.total_players
    )];
    let mut rows = Vec::new();

    for booking in &overview.bookings {
        lines.push(format!(
            "#{} {} {}-{} by {} ({})",
            booking.id,
            format_day(booking.booking_date),
            format_hour(booking.start_hour),
            format_hour(booking.end_hour()),
            booking.creator_name,
            booking.session_type.as_str(),
        ));
        rows.push(vec![InlineKeyboardButton::callback(
            format!("Delete #{}", booking.id),
            format!("bk:del:{}", booking.id),
        )]);
    }

    let mut request = bot.send_message(msg.chat.id, lines.join("\n"));
    if !rows.is_empty() {
        request = request.reply_markup(InlineKeyboardMarkup::new(rows));
    }
    request.await?;
    Ok(())
}
