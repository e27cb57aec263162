//! Reply copy for the booking dialogue
//!
//! All user-facing dialogue text lives here so the state machine stays
//! free of strings and the wording can be reviewed in one place.

use chrono::NaiveDate;

use crate::availability::{JoinVerdict, SlotKind, SlotOffer};
use crate::models::booking::{Booking, Participant, PlayerRef, SessionType, SlotDuration};
use crate::utils::helpers::{format_day, format_hour};

pub const FALLBACK_UNAVAILABLE: &str =
    "Sorry, I couldn't work that one out. Tell me a day you'd like to play and we'll take it from there.";

pub fn greeting(pitch_name: &str) -> String {
    format!(
        "Hi! I'm the booking assistant for {}. When would you like to play? \
         You can say things like 'today', 'tomorrow' or 'this weekend'.",
        pitch_name
    )
}

pub fn ask_when() -> String {
    "Which day would you like to play?".to_string()
}

pub fn ask_when_again() -> String {
    "I couldn't work out which day you meant. Try 'today', 'tomorrow', a weekday name or a date like 2025-06-21.".to_string()
}

/// The availability summary shown once a date is fixed. Joinable sessions
/// come first, then free slots.
pub fn slot_summary(date: NaiveDate, offers: &[SlotOffer]) -> String {
    if offers.is_empty() {
        return format!(
            "{} is fully booked, I'm afraid. Want to try another day?",
            format_day(date)
        );
    }

    let mut lines = vec![format!("Here's {}:", format_day(date))];

    let joinable: Vec<&SlotOffer> = offers
        .iter()
        .filter(|offer| matches!(offer.kind, SlotKind::Joinable { .. }))
        .collect();
    if !joinable.is_empty() {
        lines.push("Open sessions you can join:".to_string());
        for offer in &joinable {
            if let SlotKind::Joinable { spots_left, .. } = offer.kind {
                lines.push(format!(
                    "  {} ({} spot{} left)",
                    format_hour(offer.start_hour),
                    spots_left,
                    if spots_left == 1 { "" } else { "s" }
                ));
            }
        }
    }

    let free: Vec<&SlotOffer> = offers
        .iter()
        .filter(|offer| matches!(offer.kind, SlotKind::Free))
        .collect();
    if !free.is_empty() {
        let hours: Vec<String> = free
            .iter()
            .map(|offer| format_hour(offer.start_hour))
            .collect();
        lines.push(format!("Free to book: {}", hours.join(", ")));
    }

    lines.push("Say e.g. 'book 14:00' or 'join 10:00'.".to_string());
    lines.join("\n")
}

pub fn ask_action_again(date: NaiveDate) -> String {
    format!(
        "For {}, tell me a time and whether you want to book or join, like 'book 14:00'.",
        format_day(date)
    )
}

pub fn slot_taken(start_hour: i32) -> String {
    format!(
        "{} isn't available on that day. Pick one of the listed times, or another day.",
        format_hour(start_hour)
    )
}

pub fn past_day() -> String {
    "That day has already passed. Which day would you like instead?".to_string()
}

pub fn past_hour(start_hour: i32) -> String {
    format!(
        "{} today has already gone by. Pick a later time, or another day.",
        format_hour(start_hour)
    )
}

pub fn suggest_join(start_hour: i32, spots_left: i32) -> String {
    format!(
        "{} is taken, but that session is open with {} spot{} left. Say 'join {}' if you'd like in.",
        format_hour(start_hour),
        spots_left,
        if spots_left == 1 { "" } else { "s" },
        format_hour(start_hour)
    )
}

pub fn commit_conflict(reason: &str) -> String {
    format!(
        "That didn't work: {}. Let's pick again, which day would you like?",
        reason
    )
}

pub fn join_refused(verdict: &JoinVerdict, start_hour: i32) -> String {
    match verdict {
        JoinVerdict::NothingToJoin => format!(
            "There's no session starting at {} to join. You could book it instead.",
            format_hour(start_hour)
        ),
        JoinVerdict::SessionClosed { .. } => format!(
            "The {} session is a closed group, so it isn't taking extra players.",
            format_hour(start_hour)
        ),
        JoinVerdict::SessionFull { .. } => format!(
            "The {} session is already full, sorry.",
            format_hour(start_hour)
        ),
        JoinVerdict::AlreadyMember { .. } => format!(
            "You're already in the {} session.",
            format_hour(start_hour)
        ),
        JoinVerdict::Joinable { .. } => String::new(),
    }
}

pub fn ask_session_type() -> String {
    "Should this be an open session others can join, or a closed one just for your group?"
        .to_string()
}

pub fn ask_max_players() -> String {
    "How many players at most, including you? (2-22)".to_string()
}

pub fn ask_max_players_again() -> String {
    "I need a number between 2 and 22 for the player limit.".to_string()
}

pub fn ask_duration() -> String {
    "One hour or two?".to_string()
}

pub fn ask_duration_again() -> String {
    "Just tell me '1 hour' or '2 hours'.".to_string()
}

pub fn two_hours_unavailable(start_hour: i32) -> String {
    format!(
        "Two hours from {} runs into another booking, so only one hour is possible there.",
        format_hour(start_hour)
    )
}

pub fn confirm_booking(
    date: NaiveDate,
    start_hour: i32,
    duration: SlotDuration,
    session_type: SessionType,
    max_players: Option<i32>,
) -> String {
    let session = match session_type {
        SessionType::Open => match max_players {
            Some(n) => format!("open session, up to {} players", n),
            None => "open session".to_string(),
        },
        SessionType::Closed => "closed session".to_string(),
    };
    format!(
        "To confirm: {} at {}, {} hour{}, {}. Shall I book it?",
        format_day(date),
        format_hour(start_hour),
        duration.hours(),
        if duration.hours() == 1 { "" } else { "s" },
        session
    )
}

pub fn confirm_join(date: NaiveDate, start_hour: i32, spots_left: i32) -> String {
    format!(
        "To confirm: join the open session on {} at {} ({} spot{} left). Shall I add you?",
        format_day(date),
        format_hour(start_hour),
        spots_left,
        if spots_left == 1 { "" } else { "s" }
    )
}

pub fn ask_confirm_again() -> String {
    "Just a yes or no: shall I go ahead?".to_string()
}

pub fn booking_done(date: NaiveDate, start_hour: i32) -> String {
    format!(
        "Done! You're booked for {} at {}. Anything else?",
        format_day(date),
        format_hour(start_hour)
    )
}

pub fn join_done(date: NaiveDate, start_hour: i32) -> String {
    format!(
        "Done! You've joined the session on {} at {}. Anything else?",
        format_day(date),
        format_hour(start_hour)
    )
}

pub fn commit_failed(reason: &str) -> String {
    format!(
        "That didn't go through: {}. Say 'yes' to try again or 'start over' to pick something else.",
        reason
    )
}

pub fn flow_reset() -> String {
    "No problem, let's start again. Which day would you like to play?".to_string()
}

pub fn farewell() -> String {
    "Alright, see you on the pitch!".to_string()
}

/// System prompt for the generative fallback: the house rules plus a
/// summary of upcoming bookings so answers stay grounded in real state.
pub fn grounding_context(pitch_name: &str, upcoming: &[(Booking, Vec<Participant>)]) -> String {
    let mut lines = vec![
        format!(
            "You are the booking assistant for {}, a shared sports pitch. \
             The pitch is open 08:00-20:00 daily. Bookings are 1 or 2 hours, \
             open sessions accept extra players up to their limit, closed \
             sessions do not. Answer briefly and only about the pitch. If the \
             user wants to book or join, tell them to name a day first.",
            pitch_name
        ),
        "Upcoming bookings:".to_string(),
    ];

    if upcoming.is_empty() {
        lines.push("  (none)".to_string());
    }
    for (booking, participants) in upcoming {
        let session = match booking.session_type {
            SessionType::Open => format!(
                "open, {} of {} players",
                booking.occupancy(participants.len()),
                booking
                    .max_players
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string())
            ),
            SessionType::Closed => "closed".to_string(),
        };
        lines.push(format!(
            "  {} {}-{} ({})",
            format_day(booking.booking_date),
            format_hour(booking.start_hour),
            format_hour(booking.end_hour()),
            session
        ));
    }

    lines.join("\n")
}

/// One line per booking for the /bookings listing.
pub fn booking_line(booking: &Booking, participants: &[Participant], viewer: &PlayerRef) -> String {
    let mut line = format!(
        "#{} {} {}-{} by {}",
        booking.id,
        format_day(booking.booking_date),
        format_hour(booking.start_hour),
        format_hour(booking.end_hour()),
        booking.creator_name
    );
    match booking.session_type {
        SessionType::Open => {
            line.push_str(&format!(
                " (open, {}/{})",
                booking.occupancy(participants.len()),
                booking
                    .max_players
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string())
            ));
        }
        SessionType::Closed => line.push_str(" (closed)"),
    }
    if booking.creator() == *viewer
        || participants
            .iter()
            .any(|p| p.player_name == viewer.name && p.player_level == viewer.level)
    {
        line.push_str(" [you're in]");
    }
    line
}
