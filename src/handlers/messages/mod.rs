//! Message handlers module
//!
//! Free text in private chats is routed into the booking dialogue. The
//! state machine is synchronous; this module supplies it with snapshots,
//! executes the commits it hands back, and consults the generative
//! responder when it raises the fallback flag.

use teloxide::{
    prelude::*,
    types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message},
};
use tracing::{debug, error, warn};

use crate::config::Settings;
use crate::models::booking::{PlayerLevel, PlayerRef};
use crate::services::ServiceFactory;
use crate::state::{
    CommitAction, ConversationContext, DialogueManager, DialogueOutcome, DialogueReply,
    QuickReply, StateStorage, TranscriptEntry,
};
use crate::state::replies;
use crate::utils::errors::{PitchBuddyError, Result};
use crate::utils::helpers::truncate_text;
use crate::utils::logging::log_dialogue_transition;

/// Handle incoming text messages
pub async fn handle_message(
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

    // The dialogue only runs one-on-one
    if !msg.chat.id.is_user() {
        return Ok(());
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = user.id.0 as i64;
    debug!(user_id = user_id, "Processing private message");

    let player = ensure_player(&services, user_id, &user.first_name).await?;

    run_dialogue_turn(
        &bot,
        msg.chat.id,
        user_id,
        text,
        &player,
        &services,
        &dialogue_manager,
        &state_storage,
        &settings,
    )
    .await
}

/// Advance the dialogue by one input, whether typed or tapped.
#[allow(clippy::too_many_arguments)]
pub async fn run_dialogue_turn(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    input: &str,
    player: &PlayerRef,
    services: &ServiceFactory,
    dialogue_manager: &DialogueManager,
    state_storage: &StateStorage,
    settings: &Settings,
) -> Result<()> {
    let mut context = match state_storage.load_context(user_id).await? {
        Some(context) => context,
        None => ConversationContext::new(user_id, settings.redis.ttl_seconds),
    };

    context.push_entry(TranscriptEntry::user(input));
    let step_before = context.step;

    let now = chrono::Local::now().naive_local();
    let mut snapshot = None;
    let mut reply = loop {
        match dialogue_manager.respond(&mut context, input, player, now, snapshot.as_ref()) {
            DialogueOutcome::NeedSnapshot(date) => {
                snapshot = Some(services.booking_service.day_snapshot(date).await?);
            }
            DialogueOutcome::Reply(reply) => break reply,
        }
    };

    if let Some(commit) = reply.commit.take() {
        reply = execute_commit(commit, &mut context, player, services, dialogue_manager).await;
    }

    if reply.needs_fallback {
        if let Some(answer) = fallback_answer(&context, services, settings).await {
            reply.text = truncate_text(&answer, 3500);
        }
    }

    if context.step != step_before {
        log_dialogue_transition(user_id, step_before.as_str(), context.step.as_str());
    }

    context.push_entry(TranscriptEntry::assistant(reply.text.clone()));
    context.touch(settings.redis.ttl_seconds);

    if reply.finished {
        state_storage.delete_context(user_id).await?;
    } else {
        state_storage.save_context(&context).await?;
    }

    send_reply(bot, chat_id, &reply).await
}

/// Execute a store write on the machine's behalf and feed the result back.
async fn execute_commit(
    commit: CommitAction,
    context: &mut ConversationContext,
    player: &PlayerRef,
    services: &ServiceFactory,
    dialogue_manager: &DialogueManager,
) -> DialogueReply {
    let result = match commit {
        CommitAction::CreateBooking(request) => services
            .booking_service
            .create_booking(request)
            .await
            .map(|_| ()),
        CommitAction::JoinBooking { booking_id } => services
            .booking_service
            .join_booking(booking_id, player)
            .await
            .map(|_| ()),
    };

    match result {
        Ok(()) => dialogue_manager.on_commit_success(context),
        Err(e) => {
            warn!(user_id = context.user_id, error = %e, "Dialogue commit rejected");
            dialogue_manager.on_commit_failure(context, &e)
        }
    }
}

/// Ask the generative responder; None keeps the machine's static copy.
async fn fallback_answer(
    context: &ConversationContext,
    services: &ServiceFactory,
    settings: &Settings,
) -> Option<String> {
    if !services.responder.is_enabled() {
        return None;
    }

    let today = chrono::Local::now().date_naive();
    let upcoming = match services.booking_service.upcoming_bookings(today).await {
        Ok(upcoming) => upcoming,
        Err(e) => {
            warn!(error = %e, "Could not load bookings for fallback grounding");
            Vec::new()
        }
    };

    let grounding = replies::grounding_context(&settings.pitch.name, &upcoming);
    match services
        .responder
        .complete(&context.transcript, &grounding)
        .await
    {
        Ok(answer) => Some(answer),
        Err(e) => {
            error!(user_id = context.user_id, error = %e, "Fallback responder failed");
            Some(replies::FALLBACK_UNAVAILABLE.to_string())
        }
    }
}

/// Send a dialogue reply, attaching its quick replies as an inline keyboard.
pub async fn send_reply(bot: &Bot, chat_id: ChatId, reply: &DialogueReply) -> Result<()> {
    if reply.text.is_empty() {
        return Ok(());
    }

    let mut request = bot.send_message(chat_id, &reply.text);
    if !reply.quick_replies.is_empty() {
        request = request.reply_markup(quick_reply_keyboard(&reply.quick_replies));
    }
    request.await?;
    Ok(())
}

/// Quick replies as rows of up to three buttons, routed back through the
/// `dlg:` callback prefix.
pub fn quick_reply_keyboard(quick_replies: &[QuickReply]) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = quick_replies
        .iter()
        .map(|quick| {
            InlineKeyboardButton::callback(quick.label.clone(), format!("dlg:{}", quick.data))
        })
        .collect();

    let rows: Vec<Vec<InlineKeyboardButton>> =
        buttons.chunks(3).map(|chunk| chunk.to_vec()).collect();
    InlineKeyboardMarkup::new(rows)
}

/// Look up the player profile for a Telegram account, registering a default
/// one from the Telegram name on first contact.
pub async fn ensure_player(
    services: &ServiceFactory,
    telegram_id: i64,
    telegram_name: &str,
) -> Result<PlayerRef> {
    if let Some(player) = services.player_service.get_by_telegram_id(telegram_id).await? {
        return Ok(player.player_ref());
    }

    let name = if telegram_name.trim().is_empty() {
        format!("Player {}", telegram_id)
    } else {
        telegram_name.trim().to_string()
    };

    let player = services
        .player_service
        .register(telegram_id, name, PlayerLevel::Intermediate)
        .await?;
    Ok(player.player_ref())
}
