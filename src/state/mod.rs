//! Conversation state management
//!
//! The booking dialogue lives here: per-user contexts persisted in Redis,
//! the rule-based state machine that drives the flow, and the reply copy.

pub mod context;
pub mod dialogue;
pub mod replies;
pub mod storage;
pub mod transcript;
pub mod when;

pub use context::{BookingDraft, ConversationContext, DialogueStep};
pub use dialogue::{CommitAction, DialogueManager, DialogueOutcome, DialogueReply, QuickReply};
pub use storage::StateStorage;
pub use transcript::{TranscriptEntry, TranscriptRole};
pub use when::resolve_day_reference;
