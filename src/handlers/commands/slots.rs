//! Slots command handler

use teloxide::{prelude::*, types::Message};
use tracing::debug;

use crate::config::Settings;
use crate::services::ServiceFactory;
use crate::state::replies;
use crate::state::{resolve_day_reference, ConversationContext, DialogueStep, StateStorage};
use crate::handlers::messages::quick_reply_keyboard;
use crate::state::QuickReply;
use crate::utils::errors::{PitchBuddyError, Result};
use crate::availability::SlotKind;
use crate::utils::helpers::format_hour;

/// Handle /slots command. The argument is a day reference ("tomorrow",
/// "saturday", "2025-06-21"); default is today.
pub async fn handle_slots(
    bot: Bot,
    msg: Message,
    day: String,
    services: ServiceFactory,
    state_storage: StateStorage,
    settings: Settings,
) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| {
        PitchBuddyError::InvalidInput("No user in message".to_string())
    })?;
    let user_id = user.id.0 as i64;

    let now = chrono::Local::now().naive_local();
    let date = if day.trim().is_empty() {
        now.date()
    } else {
        match resolve_day_reference(&day, now.date()) {
            Some(date) => date,
            None => {
                bot.send_message(msg.chat.id, replies::ask_when_again())
                    .await?;
                return Ok(());
            }
        }
    };

    debug!(user_id = user_id, date = %date, "Listing slots");

    let offers = services.booking_service.available_slots(date, now).await?;
    let text = replies::slot_summary(date, &offers);

    // Park the conversation at the action step so the buttons below work
    // like typed answers.
    if msg.chat.id.is_user() && !offers.is_empty() {
        let mut context = match state_storage.load_context(user_id).await? {
            Some(context) => context,
            None => ConversationContext::new(user_id, settings.redis.ttl_seconds),
        };
        context.draft.clear();
        context.draft.date = Some(date);
        context.set_step(DialogueStep::AskAction);
        state_storage.save_context(&context).await?;
    }

    let mut quick = Vec::new();
    for offer in &offers {
        if let SlotKind::Joinable { .. } = offer.kind {
            quick.push(QuickReply {
                label: format!("Join {}", format_hour(offer.start_hour)),
                data: format!("Join {}", format_hour(offer.start_hour)),
            });
        }
    }
    for offer in &offers {
        if quick.len() >= 6 {
            break;
        }
        if offer.kind == SlotKind::Free {
            quick.push(QuickReply {
                label: format!("Book {}", format_hour(offer.start_hour)),
                data: format!("Book {}", format_hour(offer.start_hour)),
            });
        }
    }

    let mut request = bot.send_message(msg.chat.id, text);
    if msg.chat.id.is_user() && !quick.is_empty() {
        request = request.reply_markup(quick_reply_keyboard(&quick));
    }
    request.await?;
    Ok(())
}
