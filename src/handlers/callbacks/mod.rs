//! Callback query handlers module
//!
//! Inline keyboard callbacks use three prefixes:
//! - `dlg:<input>` feeds the payload into the booking dialogue as if typed
//! - `level:<level>` sets the player level during onboarding
//! - `bk:<action>:<id>` is a direct join/leave/delete on a listed booking

use teloxide::{
    prelude::*,
    types::{CallbackQuery, ChatId},
};
use tracing::{debug, warn};

use crate::config::Settings;
use crate::handlers::commands::start;
use crate::handlers::messages::{ensure_player, run_dialogue_turn};
use crate::services::ServiceFactory;
use crate::state::{DialogueManager, StateStorage};
use crate::utils::errors::{PitchBuddyError, Result};
use crate::utils::logging::log_booking_action;

/// Main callback query dispatcher
pub async fn handle_callback_query(
    bot: Bot,
    query: CallbackQuery,
    services: ServiceFactory,
    dialogue_manager: DialogueManager,
    state_storage: StateStorage,
    settings: Settings,
) -> Result<()> {
    let user = query.from.clone();
    let user_id = user.id.0 as i64;
    let chat_id = query
        .message
        .as_ref()
        .map(|m| m.chat().id)
        .unwrap_or(ChatId(user_id));

    let Some(data) = query.data.clone() else {
        return Ok(());
    };

    debug!(user_id = user_id, callback_data = %data, "Processing callback query");

    // Answer first to clear the client's loading state
    if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
        warn!(error = %e, "Failed to answer callback query");
    }

    let (prefix, payload) = data.split_once(':').unwrap_or((data.as_str(), ""));

    match prefix {
        "dlg" => {
            let player = ensure_player(&services, user_id, &user.first_name).await?;
            run_dialogue_turn(
                &bot,
                chat_id,
                user_id,
                payload,
                &player,
                &services,
                &dialogue_manager,
                &state_storage,
                &settings,
            )
            .await
        }
        "level" => {
            start::handle_level_callback(bot, chat_id, user_id, &user.first_name, payload, services)
                .await
        }
        "bk" => handle_booking_action(bot, chat_id, user_id, &user.first_name, payload, services, settings).await,
        _ => {
            warn!(callback_data = %data, "Unknown callback prefix");
            Ok(())
        }
    }
}

/// Join, leave or delete straight from a booking listing.
async fn handle_booking_action(
    bot: Bot,
    chat_id: ChatId,
    user_id: i64,
    telegram_name: &str,
    payload: &str,
    services: ServiceFactory,
    settings: Settings,
) -> Result<()> {
    let (action, id_text) = payload
        .split_once(':')
        .ok_or_else(|| PitchBuddyError::InvalidInput(format!("Bad booking action: {}", payload)))?;
    let booking_id: i64 = id_text
        .parse()
        .map_err(|_| PitchBuddyError::InvalidInput(format!("Bad booking id: {}", id_text)))?;

    let player = ensure_player(&services, user_id, telegram_name).await?;

    let outcome = match action {
        "join" => services
            .booking_service
            .join_booking(booking_id, &player)
            .await
            .map(|_| format!("You're in. See you at booking #{}!", booking_id)),
        "leave" => services
            .booking_service
            .leave_booking(booking_id, &player)
            .await
            .map(|_| format!("You've left booking #{}.", booking_id)),
        "del" => {
            let is_admin = settings.bot.admin_ids.contains(&user_id);
            services
                .booking_service
                .delete_booking(booking_id, &player, is_admin)
                .await
                .map(|_| format!("Booking #{} deleted.", booking_id))
        }
        other => {
            return Err(PitchBuddyError::InvalidInput(format!(
                "Unknown booking action: {}",
                other
            )))
        }
    };

    let text = match outcome {
        Ok(text) => {
            log_booking_action(booking_id, action, &player.to_string(), None);
            text
        }
        Err(e) => {
            warn!(user_id = user_id, booking_id = booking_id, error = %e, "Booking action rejected");
            user_facing_message(&e)
        }
    };

    bot.send_message(chat_id, text).await?;
    Ok(())
}

/// Friendly wording for rejections the user can do something about.
fn user_facing_message(error: &PitchBuddyError) -> String {
    match error {
        PitchBuddyError::CapacityExceeded { .. } => {
            "That session has just filled up, sorry.".to_string()
        }
        PitchBuddyError::ClosedSession { .. } => {
            "That session is a closed group.".to_string()
        }
        PitchBuddyError::DuplicateParticipant { .. } => {
            "You're already in that session.".to_string()
        }
        PitchBuddyError::BookingNotFound { .. } => {
            "That booking no longer exists.".to_string()
        }
        PitchBuddyError::PermissionDenied(message) => message.clone(),
        PitchBuddyError::SlotUnavailable { .. } => {
            "That slot has just been taken.".to_string()
        }
        _ => "Something went wrong, please try again in a moment.".to_string(),
    }
}
