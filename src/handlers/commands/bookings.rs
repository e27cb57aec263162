//! Bookings listing handler

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, Message},
};

use crate::config::Settings;
use crate::models::booking::{Booking, Participant, PlayerRef, SessionType};
use crate::services::ServiceFactory;
use crate::state::replies;
use crate::handlers::messages::ensure_player;
use crate::utils::errors::{PitchBuddyError, Result};

/// Handle /bookings command: upcoming bookings with per-row actions.
pub async fn handle_bookings(
    bot: Bot,
    msg: Message,
    services: ServiceFactory,
    _settings: Settings,
) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| {
        PitchBuddyError::InvalidInput("No user in message".to_string())
    })?;
    let user_id = user.id.0 as i64;

    let viewer = ensure_player(&services, user_id, &user.first_name).await?;

    let today = chrono::Local::now().date_naive();
    let upcoming = services.booking_service.upcoming_bookings(today).await?;

    if upcoming.is_empty() {
        bot.send_message(msg.chat.id, "No upcoming bookings. Send /book to make one.")
            .await?;
        return Ok(());
    }

    let lines: Vec<String> = upcoming
        .iter()
        .map(|(booking, participants)| replies::booking_line(booking, participants, &viewer))
        .collect();

    let mut request = bot.send_message(msg.chat.id, lines.join("\n"));
    if msg.chat.id.is_user() {
        let rows = action_rows(&upcoming, &viewer);
        if !rows.is_empty() {
            request = request.reply_markup(InlineKeyboardMarkup::new(rows));
        }
    }
    request.await?;
    Ok(())
}

/// One action button per booking the viewer can act on.
fn action_rows(
    upcoming: &[(Booking, Vec<Participant>)],
    viewer: &PlayerRef,
) -> Vec<Vec<InlineKeyboardButton>> {
    let mut rows = Vec::new();
    for (booking, participants) in upcoming {
        let is_member = participants
            .iter()
            .any(|p| p.player_name == viewer.name && p.player_level == viewer.level);

        let button = if booking.creator() == *viewer {
            InlineKeyboardButton::callback(
                format!("Delete #{}", booking.id),
                format!("bk:del:{}", booking.id),
            )
        } else if is_member {
            InlineKeyboardButton::callback(
                format!("Leave #{}", booking.id),
                format!("bk:leave:{}", booking.id),
            )
        } else if booking.session_type == SessionType::Open && !booking.is_full(participants.len())
        {
            InlineKeyboardButton::callback(
                format!("Join #{}", booking.id),
                format!("bk:join:{}", booking.id),
            )
        } else {
            continue;
        };
        rows.push(vec![button]);
    }
    rows
}
