//! Availability engine
//!
//! Pure projections over a day's bookings: whether a new reservation fits,
//! whether an existing open session can be joined, and the full classified
//! slot listing for a date. Nothing in here touches the store; callers feed
//! in a snapshot and must treat the result as advisory, since another user
//! may win a race before a write lands.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::models::booking::{
    Booking, Participant, PlayerRef, SessionType, SlotDuration, CLOSING_HOUR, OPENING_HOUR,
};

/// Every bookable start hour, ascending
pub fn slot_grid() -> impl Iterator<Item = i32> {
    OPENING_HOUR..CLOSING_HOUR
}

/// A day's bookings with their participants, as read from the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub date: NaiveDate,
    pub bookings: Vec<Booking>,
    /// Participants keyed by booking id
    pub participants: HashMap<i64, Vec<Participant>>,
}

impl DaySnapshot {
    pub fn new(date: NaiveDate, bookings: Vec<Booking>, participants: Vec<Participant>) -> Self {
        let mut by_booking: HashMap<i64, Vec<Participant>> = HashMap::new();
        for participant in participants {
            by_booking
                .entry(participant.booking_id)
                .or_default()
                .push(participant);
        }
        Self {
            date,
            bookings,
            participants: by_booking,
        }
    }

    pub fn participant_count(&self, booking_id: i64) -> usize {
        self.participants
            .get(&booking_id)
            .map_or(0, |members| members.len())
    }

    /// The booking starting exactly at the given hour, if any
    pub fn booking_starting_at(&self, start_hour: i32) -> Option<&Booking> {
        self.bookings
            .iter()
            .find(|booking| booking.start_hour == start_hour)
    }

    fn is_member(&self, booking: &Booking, player: &PlayerRef) -> bool {
        if booking.creator_name == player.name && booking.creator_level == player.level {
            return true;
        }
        self.participants
            .get(&booking.id)
            .map_or(false, |members| {
                members
                    .iter()
                    .any(|m| m.player_name == player.name && m.player_level == player.level)
            })
    }
}

/// Outcome of asking whether a slot's session can be joined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinVerdict {
    /// No session starts at that hour
    NothingToJoin,
    /// The session is closed to joiners
    SessionClosed { booking_id: i64 },
    /// The session has no spots left
    SessionFull { booking_id: i64 },
    /// The asking player already belongs to the session
    AlreadyMember { booking_id: i64 },
    /// The session can be joined
    Joinable { booking_id: i64, spots_left: i32 },
}

impl JoinVerdict {
    pub fn is_joinable(&self) -> bool {
        matches!(self, JoinVerdict::Joinable { .. })
    }
}

/// One entry in the availability listing for a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotOffer {
    pub start_hour: i32,
    pub kind: SlotKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotKind {
    /// No reservation conflicts with this one-hour cell
    Free,
    /// An open session starts here and still has capacity
    Joinable { booking_id: i64, spots_left: i32 },
}

/// Whether a new reservation for the candidate window can be created.
///
/// Any intersection with an existing reservation on the same date rejects,
/// open or closed: a calendar window hosts at most one reservation record.
/// "Open" only governs joining, never double-booking.
pub fn is_slot_bookable(
    date: NaiveDate,
    start_hour: i32,
    duration: SlotDuration,
    bookings: &[Booking],
) -> bool {
    if start_hour < OPENING_HOUR || start_hour + duration.hours() > CLOSING_HOUR {
        return false;
    }

    !bookings
        .iter()
        .filter(|booking| booking.booking_date == date)
        .any(|booking| booking.overlaps(start_hour, duration.hours()))
}

/// Whether the session starting exactly at (date, start_hour) can be joined
/// by the given player.
pub fn is_slot_joinable(snapshot: &DaySnapshot, start_hour: i32, player: &PlayerRef) -> JoinVerdict {
    let Some(booking) = snapshot.booking_starting_at(start_hour) else {
        return JoinVerdict::NothingToJoin;
    };

    if booking.session_type == SessionType::Closed {
        return JoinVerdict::SessionClosed { booking_id: booking.id };
    }

    if snapshot.is_member(booking, player) {
        return JoinVerdict::AlreadyMember { booking_id: booking.id };
    }

    let spots_left = booking.spots_left(snapshot.participant_count(booking.id));
    if spots_left > 0 {
        JoinVerdict::Joinable { booking_id: booking.id, spots_left }
    } else {
        JoinVerdict::SessionFull { booking_id: booking.id }
    }
}

/// Classified slot listing for a date, ascending by hour.
///
/// For today, hours at or before the current wall-clock hour are skipped
/// outright; the cutoff is hour-grained to match the grid. Occupied slots
/// whose session is closed or full are omitted entirely.
pub fn enumerate_available_slots(snapshot: &DaySnapshot, now: NaiveDateTime) -> Vec<SlotOffer> {
    let cutoff_hour = if snapshot.date == now.date() {
        now.hour() as i32
    } else if snapshot.date < now.date() {
        // past dates never offer anything
        return Vec::new();
    } else {
        OPENING_HOUR - 1
    };

    slot_grid()
        .filter(|&hour| hour > cutoff_hour)
        .filter_map(|hour| {
            if is_slot_bookable(snapshot.date, hour, SlotDuration::OneHour, &snapshot.bookings) {
                return Some(SlotOffer { start_hour: hour, kind: SlotKind::Free });
            }

            let booking = snapshot.booking_starting_at(hour)?;
            if booking.session_type != SessionType::Open {
                return None;
            }
            let spots_left = booking.spots_left(snapshot.participant_count(booking.id));
            if spots_left > 0 {
                Some(SlotOffer {
                    start_hour: hour,
                    kind: SlotKind::Joinable { booking_id: booking.id, spots_left },
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::PlayerLevel;
    use chrono::{NaiveTime, Utc};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn booking(
        id: i64,
        start_hour: i32,
        duration_hours: i32,
        session_type: SessionType,
        max_players: Option<i32>,
    ) -> Booking {
        Booking {
            id,
            creator_name: "Alice".to_string(),
            creator_level: PlayerLevel::Intermediate,
            booking_date: date(),
            start_hour,
            duration_hours,
            session_type,
            max_players,
            created_at: Utc::now(),
        }
    }

    fn participant(id: i64, booking_id: i64, name: &str) -> Participant {
        Participant {
            id,
            booking_id,
            player_name: name.to_string(),
            player_level: PlayerLevel::Beginner,
            joined_at: Utc::now(),
        }
    }

    fn at(date: NaiveDate, hour: u32) -> NaiveDateTime {
        date.and_time(NaiveTime::from_hms_opt(hour, 15, 0).unwrap())
    }

    #[test]
    fn test_closed_booking_blocks_slot() {
        // a single closed one-hour session at 10:00
        let bookings = vec![booking(1, 10, 1, SessionType::Closed, None)];

        assert!(!is_slot_bookable(date(), 10, SlotDuration::OneHour, &bookings));
        assert!(is_slot_bookable(date(), 11, SlotDuration::OneHour, &bookings));
    }

    #[test]
    fn test_open_booking_also_blocks_slot() {
        let bookings = vec![booking(1, 10, 1, SessionType::Open, Some(4))];

        assert!(!is_slot_bookable(date(), 10, SlotDuration::OneHour, &bookings));
    }

    #[test]
    fn test_two_hour_candidate_checked_over_full_span() {
        let bookings = vec![booking(1, 11, 1, SessionType::Closed, None)];

        assert!(!is_slot_bookable(date(), 10, SlotDuration::TwoHours, &bookings));
        assert!(!is_slot_bookable(date(), 11, SlotDuration::TwoHours, &bookings));
        assert!(is_slot_bookable(date(), 12, SlotDuration::TwoHours, &bookings));
    }

    #[test]
    fn test_two_hour_existing_blocks_both_cells() {
        let bookings = vec![booking(1, 10, 2, SessionType::Closed, None)];

        assert!(!is_slot_bookable(date(), 10, SlotDuration::OneHour, &bookings));
        assert!(!is_slot_bookable(date(), 11, SlotDuration::OneHour, &bookings));
        assert!(is_slot_bookable(date(), 12, SlotDuration::OneHour, &bookings));
    }

    #[test]
    fn test_other_dates_ignored() {
        let mut other_day = booking(1, 10, 1, SessionType::Closed, None);
        other_day.booking_date = date().succ_opt().unwrap();

        assert!(is_slot_bookable(date(), 10, SlotDuration::OneHour, &[other_day]));
    }

    #[test]
    fn test_window_bounds_rejected() {
        assert!(!is_slot_bookable(date(), 7, SlotDuration::OneHour, &[]));
        assert!(!is_slot_bookable(date(), 20, SlotDuration::OneHour, &[]));
        assert!(!is_slot_bookable(date(), 19, SlotDuration::TwoHours, &[]));
        assert!(is_slot_bookable(date(), 19, SlotDuration::OneHour, &[]));
    }

    #[test]
    fn test_join_verdicts() {
        let snapshot = DaySnapshot::new(
            date(),
            vec![
                booking(1, 10, 1, SessionType::Open, Some(3)),
                booking(2, 14, 1, SessionType::Closed, None),
            ],
            vec![participant(1, 1, "Bob")],
        );
        let carol = PlayerRef::new("Carol", PlayerLevel::Beginner);

        // open session, occupancy 2 of 3: one spot left
        assert_eq!(
            is_slot_joinable(&snapshot, 10, &carol),
            JoinVerdict::Joinable { booking_id: 1, spots_left: 1 }
        );
        assert_eq!(
            is_slot_joinable(&snapshot, 14, &carol),
            JoinVerdict::SessionClosed { booking_id: 2 }
        );
        assert_eq!(is_slot_joinable(&snapshot, 12, &carol), JoinVerdict::NothingToJoin);
    }

    #[test]
    fn test_join_rejects_existing_members() {
        let snapshot = DaySnapshot::new(
            date(),
            vec![booking(1, 10, 1, SessionType::Open, Some(4))],
            vec![participant(1, 1, "Bob")],
        );

        let creator = PlayerRef::new("Alice", PlayerLevel::Intermediate);
        assert_eq!(
            is_slot_joinable(&snapshot, 10, &creator),
            JoinVerdict::AlreadyMember { booking_id: 1 }
        );

        // same name, different level is a different player
        let bob = PlayerRef::new("Bob", PlayerLevel::Beginner);
        assert_eq!(
            is_slot_joinable(&snapshot, 10, &bob),
            JoinVerdict::AlreadyMember { booking_id: 1 }
        );
        let other_bob = PlayerRef::new("Bob", PlayerLevel::Advanced);
        assert!(is_slot_joinable(&snapshot, 10, &other_bob).is_joinable());
    }

    #[test]
    fn test_join_full_session() {
        let snapshot = DaySnapshot::new(
            date(),
            vec![booking(1, 10, 1, SessionType::Open, Some(2))],
            vec![participant(1, 1, "Bob")],
        );
        let carol = PlayerRef::new("Carol", PlayerLevel::Beginner);

        assert_eq!(
            is_slot_joinable(&snapshot, 10, &carol),
            JoinVerdict::SessionFull { booking_id: 1 }
        );
    }

    #[test]
    fn test_enumerate_classifies_and_omits() {
        let snapshot = DaySnapshot::new(
            date(),
            vec![
                booking(1, 9, 1, SessionType::Closed, None),
                booking(2, 11, 1, SessionType::Open, Some(4)),
                booking(3, 13, 2, SessionType::Open, Some(2)),
            ],
            vec![participant(1, 3, "Bob")],
        );
        // the day before, so no hour cutoff applies
        let now = at(date().pred_opt().unwrap(), 12);

        let offers = enumerate_available_slots(&snapshot, now);

        // 9 occupied/closed, 11 joinable, 13+14 occupied by a full session
        let hours: Vec<i32> = offers.iter().map(|offer| offer.start_hour).collect();
        assert_eq!(hours, vec![8, 10, 11, 12, 15, 16, 17, 18, 19]);

        let joinable: Vec<&SlotOffer> = offers
            .iter()
            .filter(|offer| matches!(offer.kind, SlotKind::Joinable { .. }))
            .collect();
        assert_eq!(joinable.len(), 1);
        assert_eq!(joinable[0].start_hour, 11);
        assert_eq!(
            joinable[0].kind,
            SlotKind::Joinable { booking_id: 2, spots_left: 3 }
        );
    }

    #[test]
    fn test_enumerate_today_excludes_current_hour() {
        let snapshot = DaySnapshot::new(date(), vec![], vec![]);

        // 14:15 today: slot 14 is gone even though it started this hour
        let offers = enumerate_available_slots(&snapshot, at(date(), 14));
        let hours: Vec<i32> = offers.iter().map(|offer| offer.start_hour).collect();
        assert_eq!(hours, vec![15, 16, 17, 18, 19]);
    }

    #[test]
    fn test_enumerate_past_date_is_empty() {
        let snapshot = DaySnapshot::new(date(), vec![], vec![]);
        let tomorrow = at(date().succ_opt().unwrap(), 9);
        assert!(enumerate_available_slots(&snapshot, tomorrow).is_empty());
    }

    #[test]
    fn test_enumerate_is_idempotent() {
        let snapshot = DaySnapshot::new(
            date(),
            vec![booking(1, 10, 1, SessionType::Open, Some(3))],
            vec![],
        );
        let now = at(date(), 8);

        let first = enumerate_available_slots(&snapshot, now);
        let second = enumerate_available_slots(&snapshot, now);
        assert_eq!(first, second);
    }
}
