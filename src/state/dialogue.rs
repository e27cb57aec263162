//! Booking dialogue state machine
//!
//! A deterministic, rule-based conversation that walks a player from "when
//! do you want to play?" to a committed booking or join. The machine itself
//! never touches the store: it reads pre-fetched day snapshots and hands any
//! write back to the caller as a [`CommitAction`]. When it cannot classify a
//! message at all it raises the `needs_fallback` flag and the caller may
//! consult the generative responder instead.
//!
//! `respond` mutates the context only when it returns a reply, so callers
//! can re-invoke it with the same input after fetching a requested snapshot.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;

use crate::availability::{
    enumerate_available_slots, is_slot_bookable, is_slot_joinable, DaySnapshot, JoinVerdict,
    SlotKind, SlotOffer,
};
use crate::models::booking::{
    CreateBookingRequest, PlayerRef, SessionType, SlotDuration,
};
use crate::state::context::{ConversationContext, DialogueStep};
use crate::state::replies;
use crate::state::when::resolve_day_reference;
use crate::utils::errors::PitchBuddyError;
use crate::utils::helpers::format_hour;

/// Inline answer the user can tap instead of typing. `data` is fed back
/// into the machine exactly as if it had been typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickReply {
    pub label: String,
    pub data: String,
}

impl QuickReply {
    fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            data: label.clone(),
            label,
        }
    }
}

/// A write the caller must perform on the machine's behalf.
#[derive(Debug, Clone)]
pub enum CommitAction {
    CreateBooking(CreateBookingRequest),
    JoinBooking { booking_id: i64 },
}

#[derive(Debug, Clone, Default)]
pub struct DialogueReply {
    pub text: String,
    pub quick_replies: Vec<QuickReply>,
    pub commit: Option<CommitAction>,
    /// The machine could not classify the input; the caller may replace
    /// `text` with a generative answer.
    pub needs_fallback: bool,
    /// The conversation ended; the caller should drop the context.
    pub finished: bool,
}

impl DialogueReply {
    fn text(text: String) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }

    fn with_quick(text: String, labels: &[&str]) -> Self {
        Self {
            text,
            quick_replies: labels.iter().map(|l| QuickReply::new(*l)).collect(),
            ..Default::default()
        }
    }

    fn fallback(text: String, labels: &[&str]) -> Self {
        Self {
            needs_fallback: true,
            ..Self::with_quick(text, labels)
        }
    }
}

/// What `respond` needs next.
#[derive(Debug, Clone)]
pub enum DialogueOutcome {
    /// Fetch a snapshot for this date and call `respond` again with the
    /// same input.
    NeedSnapshot(NaiveDate),
    Reply(DialogueReply),
}

use DialogueOutcome::{NeedSnapshot, Reply};

#[derive(Debug, Clone)]
pub struct DialogueManager {
    pitch_name: String,
}

impl DialogueManager {
    pub fn new(pitch_name: impl Into<String>) -> Self {
        Self {
            pitch_name: pitch_name.into(),
        }
    }

    /// Open a conversation: greet and ask for a day.
    pub fn start(&self, context: &mut ConversationContext) -> DialogueReply {
        context.reset_flow();
        DialogueReply::with_quick(
            replies::greeting(&self.pitch_name),
            &["Today", "Tomorrow", "This weekend"],
        )
    }

    /// Advance the conversation by one user message.
    ///
    /// `snapshot`, when given, must be the snapshot previously requested via
    /// [`DialogueOutcome::NeedSnapshot`] for this same input.
    pub fn respond(
        &self,
        context: &mut ConversationContext,
        input: &str,
        player: &PlayerRef,
        now: NaiveDateTime,
        snapshot: Option<&DaySnapshot>,
    ) -> DialogueOutcome {
        let text = input.trim().to_lowercase();

        if is_reset_phrase(&text) {
            context.reset_flow();
            return Reply(DialogueReply::with_quick(
                replies::flow_reset(),
                &["Today", "Tomorrow", "This weekend"],
            ));
        }

        match context.step {
            DialogueStep::Greeting | DialogueStep::AskWhen => {
                self.on_ask_when(context, &text, now, snapshot)
            }
            DialogueStep::AskAction => self.on_ask_action(context, &text, player, now, snapshot),
            DialogueStep::AskSessionType => Reply(self.on_ask_session_type(context, &text)),
            DialogueStep::AskMaxPlayers => Reply(self.on_ask_max_players(context, &text)),
            DialogueStep::AskDuration => self.on_ask_duration(context, &text, snapshot),
            DialogueStep::ConfirmBooking => Reply(self.on_confirm_booking(context, &text, player)),
            DialogueStep::ConfirmJoin => Reply(self.on_confirm_join(context, &text)),
            DialogueStep::Done => self.on_done(context, &text, now, snapshot),
        }
    }

    /// The caller executed a [`CommitAction`] successfully.
    pub fn on_commit_success(&self, context: &mut ConversationContext) -> DialogueReply {
        let date = context.draft.date.unwrap_or_default();
        let hour = context.draft.start_hour.unwrap_or(0);
        let text = match context.step {
            DialogueStep::ConfirmJoin => replies::join_done(date, hour),
            _ => replies::booking_done(date, hour),
        };
        context.set_step(DialogueStep::Done);
        DialogueReply::with_quick(text, &["Book another", "That's all"])
    }

    /// The caller's [`CommitAction`] was rejected by the store.
    ///
    /// Conflicts mean the world changed underneath the conversation, so the
    /// flow restarts at the date question; transient failures keep the
    /// confirmation step so a plain "yes" retries.
    pub fn on_commit_failure(
        &self,
        context: &mut ConversationContext,
        error: &PitchBuddyError,
    ) -> DialogueReply {
        let reason = friendly_reason(error);
        if error.is_booking_conflict() {
            context.reset_flow();
            DialogueReply::with_quick(
                replies::commit_conflict(&reason),
                &["Today", "Tomorrow", "This weekend"],
            )
        } else {
            DialogueReply::with_quick(replies::commit_failed(&reason), &["Yes", "Start over"])
        }
    }

    fn on_ask_when(
        &self,
        context: &mut ConversationContext,
        text: &str,
        now: NaiveDateTime,
        snapshot: Option<&DaySnapshot>,
    ) -> DialogueOutcome {
        let Some(date) = resolve_day_reference(text, now.date()) else {
            // In the greeting state an unparsed message is most likely small
            // talk, so greet instead of escalating to the responder.
            let reply = if context.step == DialogueStep::Greeting {
                DialogueReply::with_quick(
                    replies::greeting(&self.pitch_name),
                    &["Today", "Tomorrow", "This weekend"],
                )
            } else {
                DialogueReply::fallback(replies::ask_when_again(), &["Today", "Tomorrow"])
            };
            return Reply(reply);
        };

        if date < now.date() {
            return Reply(DialogueReply::with_quick(
                replies::past_day(),
                &["Today", "Tomorrow", "This weekend"],
            ));
        }

        let Some(snapshot) = snapshot_for(snapshot, date) else {
            return NeedSnapshot(date);
        };

        let offers = enumerate_available_slots(snapshot, now);
        if offers.is_empty() {
            context.set_step(DialogueStep::AskWhen);
            return Reply(DialogueReply::with_quick(
                replies::slot_summary(date, &offers),
                &["Tomorrow", "This weekend", "Next week"],
            ));
        }

        context.draft.clear();
        context.draft.date = Some(date);
        context.set_step(DialogueStep::AskAction);

        let quick_replies = offer_quick_replies(&offers);
        Reply(DialogueReply {
            text: replies::slot_summary(date, &offers),
            quick_replies,
            ..Default::default()
        })
    }

    fn on_ask_action(
        &self,
        context: &mut ConversationContext,
        text: &str,
        player: &PlayerRef,
        now: NaiveDateTime,
        snapshot: Option<&DaySnapshot>,
    ) -> DialogueOutcome {
        let Some(date) = context.draft.date else {
            context.reset_flow();
            return Reply(DialogueReply::with_quick(
                replies::ask_when(),
                &["Today", "Tomorrow", "This weekend"],
            ));
        };

        let hour = parse_hour_token(text);
        let intent = parse_intent(text);

        let Some(hour) = hour else {
            if intent.is_some() {
                let Some(snapshot) = snapshot_for(snapshot, date) else {
                    return NeedSnapshot(date);
                };
                let offers = enumerate_available_slots(snapshot, now);
                return Reply(DialogueReply {
                    text: replies::ask_action_again(date),
                    quick_replies: offer_quick_replies(&offers),
                    ..Default::default()
                });
            }
            return Reply(DialogueReply::fallback(
                replies::ask_action_again(date),
                &[],
            ));
        };

        let Some(snapshot) = snapshot_for(snapshot, date) else {
            return NeedSnapshot(date);
        };

        if date == now.date() && hour <= now.hour() as i32 {
            return Reply(DialogueReply::text(replies::past_hour(hour)));
        }

        let verdict = is_slot_joinable(snapshot, hour, player);
        let intent = intent.unwrap_or(if verdict.is_joinable() {
            Intent::Join
        } else {
            Intent::Book
        });

        match intent {
            Intent::Join => match verdict {
                JoinVerdict::Joinable {
                    booking_id,
                    spots_left,
                } => {
                    context.draft.start_hour = Some(hour);
                    context.draft.join_booking_id = Some(booking_id);
                    context.set_step(DialogueStep::ConfirmJoin);
                    Reply(DialogueReply::with_quick(
                        replies::confirm_join(date, hour, spots_left),
                        &["Yes", "No"],
                    ))
                }
                other => Reply(DialogueReply::text(replies::join_refused(&other, hour))),
            },
            Intent::Book => {
                if is_slot_bookable(date, hour, SlotDuration::OneHour, &snapshot.bookings) {
                    context.draft.start_hour = Some(hour);
                    context.set_step(DialogueStep::AskSessionType);
                    Reply(DialogueReply::with_quick(
                        replies::ask_session_type(),
                        &["Open", "Closed"],
                    ))
                } else if let JoinVerdict::Joinable { spots_left, .. } = verdict {
                    Reply(DialogueReply::text(replies::suggest_join(hour, spots_left)))
                } else {
                    Reply(DialogueReply::text(replies::slot_taken(hour)))
                }
            }
        }
    }

    fn on_ask_session_type(&self, context: &mut ConversationContext, text: &str) -> DialogueReply {
        if text.contains("open") {
            context.draft.session_type = Some(SessionType::Open);
            context.set_step(DialogueStep::AskMaxPlayers);
            DialogueReply::with_quick(replies::ask_max_players(), &["4", "6", "10"])
        } else if text.contains("closed") || text.contains("private") || text.contains("just us") {
            context.draft.session_type = Some(SessionType::Closed);
            context.draft.max_players = None;
            context.set_step(DialogueStep::AskDuration);
            DialogueReply::with_quick(replies::ask_duration(), &["1 hour", "2 hours"])
        } else {
            DialogueReply::with_quick(replies::ask_session_type(), &["Open", "Closed"])
        }
    }

    fn on_ask_max_players(&self, context: &mut ConversationContext, text: &str) -> DialogueReply {
        match parse_int_token(text) {
            Some(n) if (2..=22).contains(&n) => {
                context.draft.max_players = Some(n);
                context.set_step(DialogueStep::AskDuration);
                DialogueReply::with_quick(replies::ask_duration(), &["1 hour", "2 hours"])
            }
            _ => DialogueReply::with_quick(replies::ask_max_players_again(), &["4", "6", "10"]),
        }
    }

    fn on_ask_duration(
        &self,
        context: &mut ConversationContext,
        text: &str,
        snapshot: Option<&DaySnapshot>,
    ) -> DialogueOutcome {
        let duration = if text.contains('2') || text.contains("two") {
            SlotDuration::TwoHours
        } else if text.contains('1') || text.contains("one") {
            SlotDuration::OneHour
        } else {
            return Reply(DialogueReply::with_quick(
                replies::ask_duration_again(),
                &["1 hour", "2 hours"],
            ));
        };

        let (Some(date), Some(hour)) = (context.draft.date, context.draft.start_hour) else {
            context.reset_flow();
            return Reply(DialogueReply::with_quick(
                replies::ask_when(),
                &["Today", "Tomorrow", "This weekend"],
            ));
        };

        if duration == SlotDuration::TwoHours {
            let Some(snapshot) = snapshot_for(snapshot, date) else {
                return NeedSnapshot(date);
            };
            if !is_slot_bookable(date, hour, SlotDuration::TwoHours, &snapshot.bookings) {
                return Reply(DialogueReply::with_quick(
                    replies::two_hours_unavailable(hour),
                    &["1 hour"],
                ));
            }
        }

        context.draft.duration = Some(duration);
        context.set_step(DialogueStep::ConfirmBooking);

        let session_type = context.draft.session_type.unwrap_or(SessionType::Open);
        Reply(DialogueReply::with_quick(
            replies::confirm_booking(date, hour, duration, session_type, context.draft.max_players),
            &["Yes", "No"],
        ))
    }

    fn on_confirm_booking(
        &self,
        context: &mut ConversationContext,
        text: &str,
        player: &PlayerRef,
    ) -> DialogueReply {
        if is_affirmative(text) {
            let (Some(date), Some(hour), Some(duration), Some(session_type)) = (
                context.draft.date,
                context.draft.start_hour,
                context.draft.duration,
                context.draft.session_type,
            ) else {
                context.reset_flow();
                return DialogueReply::with_quick(
                    replies::ask_when(),
                    &["Today", "Tomorrow", "This weekend"],
                );
            };

            let request = CreateBookingRequest {
                creator: player.clone(),
                booking_date: date,
                start_hour: hour,
                duration,
                session_type,
                max_players: context.draft.max_players,
            };
            DialogueReply {
                commit: Some(CommitAction::CreateBooking(request)),
                ..Default::default()
            }
        } else if is_negative(text) {
            context.reset_flow();
            DialogueReply::with_quick(replies::flow_reset(), &["Today", "Tomorrow", "This weekend"])
        } else {
            DialogueReply::with_quick(replies::ask_confirm_again(), &["Yes", "No"])
        }
    }

    fn on_confirm_join(&self, context: &mut ConversationContext, text: &str) -> DialogueReply {
        if is_affirmative(text) {
            let Some(booking_id) = context.draft.join_booking_id else {
                context.reset_flow();
                return DialogueReply::with_quick(
                    replies::ask_when(),
                    &["Today", "Tomorrow", "This weekend"],
                );
            };
            DialogueReply {
                commit: Some(CommitAction::JoinBooking { booking_id }),
                ..Default::default()
            }
        } else if is_negative(text) {
            context.reset_flow();
            DialogueReply::with_quick(replies::flow_reset(), &["Today", "Tomorrow", "This weekend"])
        } else {
            DialogueReply::with_quick(replies::ask_confirm_again(), &["Yes", "No"])
        }
    }

    fn on_done(
        &self,
        context: &mut ConversationContext,
        text: &str,
        now: NaiveDateTime,
        snapshot: Option<&DaySnapshot>,
    ) -> DialogueOutcome {
        if text.contains("that's all") || text.contains("bye") {
            return Reply(DialogueReply {
                finished: true,
                ..DialogueReply::text(replies::farewell())
            });
        }
        // Restart keywords take precedence over a leading "no", so that
        // "no, book another" starts a new flow instead of ending one.
        if is_affirmative(text)
            || text.contains("book")
            || text.contains("join")
            || text.contains("another")
        {
            context.reset_flow();
            return Reply(DialogueReply::with_quick(
                replies::ask_when(),
                &["Today", "Tomorrow", "This weekend"],
            ));
        }
        if is_negative(text) {
            return Reply(DialogueReply {
                finished: true,
                ..DialogueReply::text(replies::farewell())
            });
        }
        // Anything else opens a fresh flow, so a day reference like
        // "tomorrow" is picked up directly instead of dead-ending here.
        context.reset_flow();
        self.on_ask_when(context, text, now, snapshot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Book,
    Join,
}

fn snapshot_for<'a>(snapshot: Option<&'a DaySnapshot>, date: NaiveDate) -> Option<&'a DaySnapshot> {
    snapshot.filter(|s| s.date == date)
}

fn offer_quick_replies(offers: &[SlotOffer]) -> Vec<QuickReply> {
    let mut quick = Vec::new();
    for offer in offers {
        if let SlotKind::Joinable { .. } = offer.kind {
            quick.push(QuickReply::new(format!(
                "Join {}",
                format_hour(offer.start_hour)
            )));
        }
    }
    for offer in offers {
        if quick.len() >= 6 {
            break;
        }
        if offer.kind == SlotKind::Free {
            quick.push(QuickReply::new(format!(
                "Book {}",
                format_hour(offer.start_hour)
            )));
        }
    }
    quick
}

fn is_reset_phrase(text: &str) -> bool {
    const PHRASES: [&str; 6] = [
        "start over",
        "restart",
        "reset",
        "different day",
        "another day",
        "never mind",
    ];
    PHRASES.iter().any(|phrase| text.contains(phrase)) || has_word(text, &["cancel"])
}

fn has_word(text: &str, words: &[&str]) -> bool {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| words.contains(&token))
}

fn is_affirmative(text: &str) -> bool {
    has_word(
        text,
        &["yes", "yep", "yeah", "sure", "ok", "okay", "confirm", "y"],
    ) || text.contains("go ahead")
        || text.contains("do it")
        || text.contains("book it")
}

fn is_negative(text: &str) -> bool {
    has_word(text, &["no", "nope", "nah", "not", "cancel", "n"])
}

fn parse_intent(text: &str) -> Option<Intent> {
    if text.contains("join") {
        Some(Intent::Join)
    } else if text.contains("book") || text.contains("reserve") || text.contains("take") {
        Some(Intent::Book)
    } else {
        None
    }
}

fn hour_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})(?::([0-5]\d))?\s*(am|pm)?\b").unwrap())
}

/// Extract an hour-of-day from free text: `14:00`, `14`, `2pm`, `2 pm`.
/// A bare 1-7 is read as afternoon since the pitch opens at 08:00.
fn parse_hour_token(text: &str) -> Option<i32> {
    let captures = hour_regex().captures(text)?;
    let mut hour: i32 = captures.get(1)?.as_str().parse().ok()?;
    let has_minutes = captures.get(2).is_some();
    let meridiem = captures.get(3).map(|m| m.as_str());

    match meridiem {
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        _ => {
            if meridiem.is_none() && !has_minutes && (1..=7).contains(&hour) {
                hour += 12;
            }
        }
    }

    if (0..=23).contains(&hour) {
        Some(hour)
    } else {
        None
    }
}

fn parse_int_token(text: &str) -> Option<i32> {
    text.split(|c: char| !c.is_ascii_digit())
        .find(|token| !token.is_empty())
        .and_then(|token| token.parse().ok())
}

fn friendly_reason(error: &PitchBuddyError) -> String {
    match error {
        PitchBuddyError::SlotUnavailable { .. } => "that slot has just been taken".to_string(),
        PitchBuddyError::CapacityExceeded { .. } => "the session has just filled up".to_string(),
        PitchBuddyError::ClosedSession { .. } => "that session is closed to joiners".to_string(),
        PitchBuddyError::DuplicateParticipant { .. } => {
            "you're already in that session".to_string()
        }
        PitchBuddyError::BookingNotFound { .. } => "that booking no longer exists".to_string(),
        PitchBuddyError::Validation(message) => message.clone(),
        _ => "a temporary problem talking to the booking store".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::{Booking, PlayerLevel};
    use chrono::{NaiveDate, Utc};

    fn player() -> PlayerRef {
        PlayerRef::new("Dana".to_string(), PlayerLevel::Intermediate)
    }

    fn booking(
        id: i64,
        date: NaiveDate,
        start_hour: i32,
        duration_hours: i32,
        session_type: SessionType,
        max_players: Option<i32>,
    ) -> Booking {
        Booking {
            id,
            creator_name: "Robin".to_string(),
            creator_level: PlayerLevel::Advanced,
            booking_date: date,
            start_hour,
            duration_hours,
            session_type,
            max_players,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn now_on(d: NaiveDate) -> NaiveDateTime {
        d.and_hms_opt(7, 30, 0).unwrap()
    }

    /// Drive respond through the snapshot loop with a fixed snapshot source.
    fn drive(
        manager: &DialogueManager,
        context: &mut ConversationContext,
        input: &str,
        now: NaiveDateTime,
        snapshots: &[DaySnapshot],
    ) -> DialogueReply {
        let mut provided: Option<&DaySnapshot> = None;
        loop {
            match manager.respond(context, input, &player(), now, provided) {
                DialogueOutcome::NeedSnapshot(wanted) => {
                    provided = Some(
                        snapshots
                            .iter()
                            .find(|s| s.date == wanted)
                            .unwrap_or_else(|| panic!("no snapshot prepared for {}", wanted)),
                    );
                }
                DialogueOutcome::Reply(reply) => return reply,
            }
        }
    }

    #[test]
    fn test_parse_hour_token_forms() {
        assert_eq!(parse_hour_token("book 14:00"), Some(14));
        assert_eq!(parse_hour_token("join 10"), Some(10));
        assert_eq!(parse_hour_token("2pm please"), Some(14));
        assert_eq!(parse_hour_token("2 pm please"), Some(14));
        assert_eq!(parse_hour_token("how about 7"), Some(19));
        assert_eq!(parse_hour_token("8:00 sharp"), Some(8));
        assert_eq!(parse_hour_token("no time here"), None);
    }

    #[test]
    fn test_reset_phrase_interrupts_any_step() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        context.set_step(DialogueStep::ConfirmBooking);
        context.draft.start_hour = Some(14);

        let reply = drive(
            &manager,
            &mut context,
            "actually, a different day",
            now_on(date(2025, 6, 4)),
            &[],
        );

        assert_eq!(context.step, DialogueStep::AskWhen);
        assert!(context.draft.start_hour.is_none());
        assert!(reply.commit.is_none());
    }

    #[test]
    fn test_unresolved_day_raises_fallback() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        context.set_step(DialogueStep::AskWhen);

        let reply = drive(
            &manager,
            &mut context,
            "what are your opening hours?",
            now_on(date(2025, 6, 4)),
            &[],
        );

        assert!(reply.needs_fallback);
        assert_eq!(context.step, DialogueStep::AskWhen);
    }

    #[test]
    fn test_full_booking_flow_commits_create() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        let today = date(2025, 6, 4);
        let saturday = date(2025, 6, 7);
        let now = now_on(today);
        let snapshots = vec![DaySnapshot::new(
            saturday,
            vec![booking(1, saturday, 10, 1, SessionType::Open, Some(4))],
            vec![],
        )];

        let reply = manager.start(&mut context);
        assert!(reply.text.contains("Test Pitch"));

        let reply = drive(&manager, &mut context, "this weekend", now, &snapshots);
        assert_eq!(context.step, DialogueStep::AskAction);
        assert!(reply.text.contains("14:00"));
        assert!(reply
            .quick_replies
            .iter()
            .any(|q| q.data == "Join 10:00"));

        let reply = drive(&manager, &mut context, "book 14:00", now, &snapshots);
        assert_eq!(context.step, DialogueStep::AskSessionType);
        assert!(reply.quick_replies.iter().any(|q| q.data == "Open"));

        drive(&manager, &mut context, "open", now, &snapshots);
        assert_eq!(context.step, DialogueStep::AskMaxPlayers);

        drive(&manager, &mut context, "10", now, &snapshots);
        assert_eq!(context.step, DialogueStep::AskDuration);

        let reply = drive(&manager, &mut context, "2 hours", now, &snapshots);
        assert_eq!(context.step, DialogueStep::ConfirmBooking);
        assert!(reply.text.contains("Shall I book it?"));

        let reply = drive(&manager, &mut context, "yes", now, &snapshots);
        let Some(CommitAction::CreateBooking(request)) = reply.commit else {
            panic!("expected a create commit");
        };
        assert_eq!(request.booking_date, saturday);
        assert_eq!(request.start_hour, 14);
        assert_eq!(request.duration, SlotDuration::TwoHours);
        assert_eq!(request.session_type, SessionType::Open);
        assert_eq!(request.max_players, Some(10));

        let reply = manager.on_commit_success(&mut context);
        assert_eq!(context.step, DialogueStep::Done);
        assert!(reply.text.contains("Done!"));
    }

    #[test]
    fn test_join_flow_commits_join() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        let today = date(2025, 6, 4);
        let now = now_on(today);
        let snapshots = vec![DaySnapshot::new(
            today,
            vec![booking(7, today, 10, 1, SessionType::Open, Some(4))],
            vec![],
        )];

        manager.start(&mut context);
        drive(&manager, &mut context, "today", now, &snapshots);

        let reply = drive(&manager, &mut context, "join 10:00", now, &snapshots);
        assert_eq!(context.step, DialogueStep::ConfirmJoin);
        assert!(reply.text.contains("join"));

        let reply = drive(&manager, &mut context, "yes", now, &snapshots);
        let Some(CommitAction::JoinBooking { booking_id }) = reply.commit else {
            panic!("expected a join commit");
        };
        assert_eq!(booking_id, 7);
    }

    #[test]
    fn test_join_closed_session_is_refused() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        let today = date(2025, 6, 4);
        let now = now_on(today);
        let snapshots = vec![DaySnapshot::new(
            today,
            vec![booking(3, today, 9, 1, SessionType::Closed, None)],
            vec![],
        )];

        manager.start(&mut context);
        drive(&manager, &mut context, "today", now, &snapshots);

        let reply = drive(&manager, &mut context, "join 9:00", now, &snapshots);
        assert_eq!(context.step, DialogueStep::AskAction);
        assert!(reply.text.contains("closed"));
        assert!(reply.commit.is_none());
    }

    #[test]
    fn test_booking_taken_slot_suggests_join() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        let today = date(2025, 6, 4);
        let now = now_on(today);
        let snapshots = vec![DaySnapshot::new(
            today,
            vec![booking(3, today, 10, 1, SessionType::Open, Some(4))],
            vec![],
        )];

        manager.start(&mut context);
        drive(&manager, &mut context, "today", now, &snapshots);

        let reply = drive(&manager, &mut context, "book 10:00", now, &snapshots);
        assert_eq!(context.step, DialogueStep::AskAction);
        assert!(reply.text.contains("join 10:00"));
    }

    #[test]
    fn test_two_hours_blocked_by_neighbour() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        let today = date(2025, 6, 4);
        let now = now_on(today);
        let snapshots = vec![DaySnapshot::new(
            today,
            vec![booking(3, today, 15, 1, SessionType::Closed, None)],
            vec![],
        )];

        manager.start(&mut context);
        drive(&manager, &mut context, "today", now, &snapshots);
        drive(&manager, &mut context, "book 14:00", now, &snapshots);
        drive(&manager, &mut context, "closed", now, &snapshots);

        let reply = drive(&manager, &mut context, "2 hours", now, &snapshots);
        assert_eq!(context.step, DialogueStep::AskDuration);
        assert!(reply.text.contains("only one hour"));

        drive(&manager, &mut context, "1 hour", now, &snapshots);
        assert_eq!(context.step, DialogueStep::ConfirmBooking);
    }

    #[test]
    fn test_past_hour_today_is_refused() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        let today = date(2025, 6, 4);
        let now = today.and_hms_opt(13, 15, 0).unwrap();
        let snapshots = vec![DaySnapshot::new(today, vec![], vec![])];

        manager.start(&mut context);
        drive(&manager, &mut context, "today", now, &snapshots);

        let reply = drive(&manager, &mut context, "book 13:00", now, &snapshots);
        assert_eq!(context.step, DialogueStep::AskAction);
        assert!(reply.text.contains("already gone by"));
    }

    #[test]
    fn test_conflict_on_commit_restarts_flow() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        context.set_step(DialogueStep::ConfirmBooking);
        context.draft.date = Some(date(2025, 6, 7));
        context.draft.start_hour = Some(14);

        let reply = manager.on_commit_failure(
            &mut context,
            &PitchBuddyError::SlotUnavailable {
                date: date(2025, 6, 7),
                start_hour: 14,
            },
        );

        assert_eq!(context.step, DialogueStep::AskWhen);
        assert!(reply.text.contains("just been taken"));
    }

    #[test]
    fn test_transient_failure_keeps_confirm_step() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        context.set_step(DialogueStep::ConfirmJoin);
        context.draft.join_booking_id = Some(4);

        let reply = manager.on_commit_failure(
            &mut context,
            &PitchBuddyError::ServiceUnavailable("store timeout".to_string()),
        );

        assert_eq!(context.step, DialogueStep::ConfirmJoin);
        assert!(reply.quick_replies.iter().any(|q| q.data == "Yes"));
    }

    #[test]
    fn test_done_step_farewell_and_restart() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        context.set_step(DialogueStep::Done);

        let reply = drive(
            &manager,
            &mut context,
            "that's all",
            now_on(date(2025, 6, 4)),
            &[],
        );
        assert!(reply.finished);

        context.set_step(DialogueStep::Done);
        let reply = drive(
            &manager,
            &mut context,
            "book another",
            now_on(date(2025, 6, 4)),
            &[],
        );
        assert!(!reply.finished);
        assert_eq!(context.step, DialogueStep::AskWhen);
        assert!(reply.text.contains("day"));
    }

    #[test]
    fn test_done_day_reference_starts_new_flow() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        let today = date(2025, 6, 4);
        let thursday = date(2025, 6, 5);
        let now = now_on(today);
        let snapshots = vec![DaySnapshot::new(thursday, vec![], vec![])];

        context.set_step(DialogueStep::Done);
        let reply = drive(&manager, &mut context, "tomorrow", now, &snapshots);
        assert!(!reply.finished);
        assert_eq!(context.draft.date, Some(thursday));
        assert_eq!(context.step, DialogueStep::AskAction);

        // Small talk also leaves the finished state behind
        context.set_step(DialogueStep::Done);
        let reply = drive(&manager, &mut context, "what a great pitch", now, &snapshots);
        assert!(!reply.finished);
        assert_eq!(context.step, DialogueStep::AskWhen);
        assert!(reply.needs_fallback);
    }

    #[test]
    fn test_done_negated_restart_still_restarts() {
        let manager = DialogueManager::new("Test Pitch");
        let mut context = ConversationContext::new(1, 1800);
        let now = now_on(date(2025, 6, 4));

        context.set_step(DialogueStep::Done);
        let reply = drive(&manager, &mut context, "no, book another", now, &[]);
        assert!(!reply.finished);
        assert_eq!(context.step, DialogueStep::AskWhen);

        context.set_step(DialogueStep::Done);
        let reply = drive(&manager, &mut context, "nope", now, &[]);
        assert!(reply.finished);
    }
}
