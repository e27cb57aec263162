//! End-to-end dialogue tests
//!
//! Walks full conversations through the state machine with scripted day
//! snapshots, the same way the message handler drives it in production.

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveDateTime, Utc};

use PitchBuddy::availability::DaySnapshot;
use PitchBuddy::models::booking::{
    Booking, Participant, PlayerLevel, PlayerRef, SessionType, SlotDuration,
};
use PitchBuddy::state::{
    CommitAction, ConversationContext, DialogueManager, DialogueOutcome, DialogueReply,
    DialogueStep,
};
use PitchBuddy::PitchBuddyError;

fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
}

fn saturday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 7).unwrap()
}

fn morning(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_opt(7, 30, 0).unwrap()
}

fn player() -> PlayerRef {
    PlayerRef::new("Dana", PlayerLevel::Intermediate)
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

/// Feed one input through the machine, serving snapshot requests from the
/// prepared list.
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
            DialogueOutcome::NeedSnapshot(date) => {
                provided = Some(
                    snapshots
                        .iter()
                        .find(|s| s.date == date)
                        .unwrap_or_else(|| panic!("no snapshot prepared for {}", date)),
                );
            }
            DialogueOutcome::Reply(reply) => return reply,
        }
    }
}

#[test]
fn weekend_booking_conversation_end_to_end() {
    let manager = DialogueManager::new("Riverside Pitch");
    let mut context = ConversationContext::new(1, 1800);
    let now = morning(wednesday());
    let snapshots = vec![DaySnapshot::new(
        saturday(),
        vec![booking(5, saturday(), 10, 1, SessionType::Open, Some(6))],
        vec![],
    )];

    let greeting = manager.start(&mut context);
    assert!(greeting.text.contains("Riverside Pitch"));
    assert_eq!(context.step, DialogueStep::AskWhen);

    let listing = drive(&manager, &mut context, "this weekend", now, &snapshots);
    assert_eq!(context.draft.date, Some(saturday()));
    assert!(listing.text.contains("10:00"));
    assert!(listing.text.contains("Free to book"));

    drive(&manager, &mut context, "book 14:00", now, &snapshots);
    drive(&manager, &mut context, "open", now, &snapshots);
    drive(&manager, &mut context, "6 players", now, &snapshots);
    let confirm = drive(&manager, &mut context, "2 hours", now, &snapshots);
    assert!(confirm.text.contains("open session, up to 6 players"));

    let commit = drive(&manager, &mut context, "yes please", now, &snapshots);
    let Some(CommitAction::CreateBooking(request)) = commit.commit else {
        panic!("expected a booking commit, got {:?}", commit.commit);
    };
    assert_eq!(request.booking_date, saturday());
    assert_eq!(request.start_hour, 14);
    assert_eq!(request.duration, SlotDuration::TwoHours);
    assert_eq!(request.max_players, Some(6));
    assert!(request.validate().is_ok());

    let done = manager.on_commit_success(&mut context);
    assert!(done.text.contains("14:00"));
    assert_eq!(context.step, DialogueStep::Done);

    let farewell = drive(&manager, &mut context, "that's all", now, &snapshots);
    assert!(farewell.finished);
}

#[test]
fn declining_confirmation_restarts_cleanly() {
    let manager = DialogueManager::new("Riverside Pitch");
    let mut context = ConversationContext::new(1, 1800);
    let now = morning(wednesday());
    let thursday = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
    let snapshots = vec![
        DaySnapshot::new(saturday(), vec![], vec![]),
        DaySnapshot::new(thursday, vec![], vec![]),
    ];

    manager.start(&mut context);
    drive(&manager, &mut context, "saturday", now, &snapshots);
    drive(&manager, &mut context, "book 9:00", now, &snapshots);
    drive(&manager, &mut context, "closed", now, &snapshots);
    drive(&manager, &mut context, "1 hour", now, &snapshots);
    assert_eq!(context.step, DialogueStep::ConfirmBooking);

    let reply = drive(&manager, &mut context, "no, changed my mind", now, &snapshots);
    assert_eq!(context.step, DialogueStep::AskWhen);
    assert!(context.draft.start_hour.is_none());
    assert!(reply.commit.is_none());

    // The flow is immediately usable again
    let listing = drive(&manager, &mut context, "tomorrow", now, &snapshots);
    assert!(!listing.needs_fallback);
}

#[test]
fn join_race_lost_restarts_at_date_question() {
    let manager = DialogueManager::new("Riverside Pitch");
    let mut context = ConversationContext::new(1, 1800);
    let now = morning(wednesday());
    let mut participants = Vec::new();
    participants.push(Participant {
        id: 1,
        booking_id: 5,
        player_name: "Alice".to_string(),
        player_level: PlayerLevel::Beginner,
        joined_at: Utc::now(),
    });
    let snapshots = vec![DaySnapshot::new(
        saturday(),
        vec![booking(5, saturday(), 10, 1, SessionType::Open, Some(3))],
        participants,
    )];

    manager.start(&mut context);
    drive(&manager, &mut context, "saturday", now, &snapshots);
    let confirm = drive(&manager, &mut context, "join 10:00", now, &snapshots);
    assert_eq!(context.step, DialogueStep::ConfirmJoin);
    assert!(confirm.text.contains("1 spot left"));

    let commit = drive(&manager, &mut context, "yes", now, &snapshots);
    assert_matches!(
        commit.commit,
        Some(CommitAction::JoinBooking { booking_id: 5 })
    );

    // Meanwhile someone else took the last spot and the store said no
    let reply = manager.on_commit_failure(
        &mut context,
        &PitchBuddyError::CapacityExceeded { booking_id: 5 },
    );
    assert_eq!(context.step, DialogueStep::AskWhen);
    assert!(reply.text.contains("filled up"));
}

#[test]
fn day_reference_after_finishing_starts_the_next_booking() {
    let manager = DialogueManager::new("Riverside Pitch");
    let mut context = ConversationContext::new(1, 1800);
    let now = morning(wednesday());
    let thursday = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
    let snapshots = vec![
        DaySnapshot::new(saturday(), vec![], vec![]),
        DaySnapshot::new(thursday, vec![], vec![]),
    ];

    manager.start(&mut context);
    drive(&manager, &mut context, "saturday", now, &snapshots);
    drive(&manager, &mut context, "book 9:00", now, &snapshots);
    drive(&manager, &mut context, "closed", now, &snapshots);
    drive(&manager, &mut context, "1 hour", now, &snapshots);
    let commit = drive(&manager, &mut context, "yes", now, &snapshots);
    assert_matches!(commit.commit, Some(CommitAction::CreateBooking(_)));
    manager.on_commit_success(&mut context);
    assert_eq!(context.step, DialogueStep::Done);

    // A plain day reference right after finishing starts the next flow
    let listing = drive(&manager, &mut context, "tomorrow", now, &snapshots);
    assert!(!listing.finished);
    assert!(!listing.needs_fallback);
    assert_eq!(context.draft.date, Some(thursday));
    assert_eq!(context.step, DialogueStep::AskAction);
}

#[test]
fn tomorrow_listing_respects_snapshot_date() {
    let manager = DialogueManager::new("Riverside Pitch");
    let mut context = ConversationContext::new(1, 1800);
    let now = morning(wednesday());
    let thursday = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
    let snapshots = vec![DaySnapshot::new(
        thursday,
        vec![booking(9, thursday, 8, 2, SessionType::Closed, None)],
        vec![],
    )];

    manager.start(&mut context);
    let listing = drive(&manager, &mut context, "tomorrow", now, &snapshots);

    assert_eq!(context.draft.date, Some(thursday));
    // The closed 08:00-10:00 block is not offered
    assert!(!listing.text.contains("08:00"));
    assert!(!listing.text.contains("09:00"));
    assert!(listing.text.contains("10:00"));
}
