//! Conversation context
//!
//! Per-user dialogue state: the current step of the booking flow, the
//! partially collected booking draft, and the transcript. Contexts are
//! serialized to Redis with a TTL, so an abandoned conversation simply
//! expires.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::booking::{SessionType, SlotDuration};
use crate::state::transcript::TranscriptEntry;

/// How many transcript entries are kept; older ones are dropped.
const TRANSCRIPT_TAIL: usize = 40;

/// Where the conversation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueStep {
    Greeting,
    AskWhen,
    AskAction,
    AskSessionType,
    AskMaxPlayers,
    AskDuration,
    ConfirmBooking,
    ConfirmJoin,
    Done,
}

impl DialogueStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueStep::Greeting => "greeting",
            DialogueStep::AskWhen => "ask_when",
            DialogueStep::AskAction => "ask_action",
            DialogueStep::AskSessionType => "ask_session_type",
            DialogueStep::AskMaxPlayers => "ask_max_players",
            DialogueStep::AskDuration => "ask_duration",
            DialogueStep::ConfirmBooking => "confirm_booking",
            DialogueStep::ConfirmJoin => "confirm_join",
            DialogueStep::Done => "done",
        }
    }
}

/// Fields collected so far for a booking or join in progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingDraft {
    pub date: Option<NaiveDate>,
    pub start_hour: Option<i32>,
    pub duration: Option<SlotDuration>,
    pub session_type: Option<SessionType>,
    pub max_players: Option<i32>,
    pub join_booking_id: Option<i64>,
}

impl BookingDraft {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub user_id: i64,
    pub step: DialogueStep,
    pub draft: BookingDraft,
    pub transcript: Vec<TranscriptEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(user_id: i64, ttl_seconds: u64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            step: DialogueStep::Greeting,
            draft: BookingDraft::default(),
            transcript: Vec::new(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::seconds(ttl_seconds as i64),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Push back the expiry after activity
    pub fn touch(&mut self, ttl_seconds: u64) {
        let now = Utc::now();
        self.updated_at = now;
        self.expires_at = now + Duration::seconds(ttl_seconds as i64);
    }

    pub fn set_step(&mut self, step: DialogueStep) {
        self.step = step;
    }

    /// Discard the draft and restart the flow at the date question
    pub fn reset_flow(&mut self) {
        self.draft.clear();
        self.step = DialogueStep::AskWhen;
    }

    pub fn push_entry(&mut self, entry: TranscriptEntry) {
        self.transcript.push(entry);
        if self.transcript.len() > TRANSCRIPT_TAIL {
            let excess = self.transcript.len() - TRANSCRIPT_TAIL;
            self.transcript.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::transcript::TranscriptEntry;

    #[test]
    fn test_new_context_starts_at_greeting() {
        let context = ConversationContext::new(42, 1800);
        assert_eq!(context.step, DialogueStep::Greeting);
        assert!(context.draft.date.is_none());
        assert!(!context.is_expired());
    }

    #[test]
    fn test_reset_flow_discards_draft() {
        let mut context = ConversationContext::new(42, 1800);
        context.draft.start_hour = Some(14);
        context.draft.join_booking_id = Some(7);
        context.set_step(DialogueStep::ConfirmJoin);

        context.reset_flow();

        assert_eq!(context.step, DialogueStep::AskWhen);
        assert!(context.draft.start_hour.is_none());
        assert!(context.draft.join_booking_id.is_none());
    }

    #[test]
    fn test_transcript_keeps_tail_only() {
        let mut context = ConversationContext::new(42, 1800);
        for i in 0..(TRANSCRIPT_TAIL + 5) {
            context.push_entry(TranscriptEntry::user(format!("message {}", i)));
        }
        assert_eq!(context.transcript.len(), TRANSCRIPT_TAIL);
        assert_eq!(context.transcript[0].text, "message 5");
    }

    #[test]
    fn test_context_serialization_roundtrip() {
        let mut context = ConversationContext::new(42, 1800);
        context.set_step(DialogueStep::AskDuration);
        context.draft.date = Some(chrono::NaiveDate::from_ymd_opt(2025, 6, 7).unwrap());
        context.draft.start_hour = Some(14);

        let serialized = serde_json::to_string(&context).unwrap();
        let restored: ConversationContext = serde_json::from_str(&serialized).unwrap();

        assert_eq!(restored.step, DialogueStep::AskDuration);
        assert_eq!(restored.draft.start_hour, Some(14));
    }
}
