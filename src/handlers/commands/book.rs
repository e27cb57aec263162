//! Book command handler

use teloxide::{prelude::*, types::Message};
use tracing::debug;

use crate::config::Settings;
use crate::services::ServiceFactory;
use crate::state::{ConversationContext, DialogueManager, StateStorage, TranscriptEntry};
use crate::handlers::messages::{ensure_player, send_reply};
use crate::utils::errors::{PitchBuddyError, Result};

/// Handle /book command: open a fresh booking conversation.
pub async fn handle_book(
    bot: Bot,
    msg: Message,
    services: ServiceFactory,
    dialogue_manager: DialogueManager,
    state_storage: StateStorage,
    settings: Settings,
) -> Result<()> {
    let user = msg.from.as_ref().ok_or_else(|| {
        PitchBuddyError::InvalidInput("No user in message".to_string())
    })?;

    if !msg.chat.id.is_user() {
        bot.send_message(msg.chat.id, "Message me privately to book the pitch.")
            .await?;
        return Ok(());
    }

    let user_id = user.id.0 as i64;
    debug!(user_id = user_id, "Starting booking conversation");

    ensure_player(&services, user_id, &user.first_name).await?;

    let mut context = ConversationContext::new(user_id, settings.redis.ttl_seconds);
    let reply = dialogue_manager.start(&mut context);
    context.push_entry(TranscriptEntry::assistant(reply.text.clone()));
    state_storage.save_context(&context).await?;

    send_reply(&bot, msg.chat.id, &reply).await
}
