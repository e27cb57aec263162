//! Booking model
//!
//! Reservations of the pitch and their participants. Occupancy is always
//! derived from the creator plus the participant rows, never stored.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::utils::errors::{PitchBuddyError, Result};

/// First bookable hour of the day
pub const OPENING_HOUR: i32 = 8;
/// The pitch closes at this hour; no session may run past it
pub const CLOSING_HOUR: i32 = 20;

/// Coarse skill tag carried by every player identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "player_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlayerLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl PlayerLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayerLevel::Beginner => "beginner",
            PlayerLevel::Intermediate => "intermediate",
            PlayerLevel::Advanced => "advanced",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "beginner" => Some(PlayerLevel::Beginner),
            "intermediate" => Some(PlayerLevel::Intermediate),
            "advanced" => Some(PlayerLevel::Advanced),
            _ => None,
        }
    }
}

/// Whether a session is exclusive or joinable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Open,
    Closed,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Open => "open",
            SessionType::Closed => "closed",
        }
    }
}

/// Session length, restricted to the two values the grid supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotDuration {
    OneHour,
    TwoHours,
}

impl SlotDuration {
    pub fn hours(&self) -> i32 {
        match self {
            SlotDuration::OneHour => 1,
            SlotDuration::TwoHours => 2,
        }
    }

    pub fn from_hours(hours: i32) -> Option<Self> {
        match hours {
            1 => Some(SlotDuration::OneHour),
            2 => Some(SlotDuration::TwoHours),
            _ => None,
        }
    }
}

/// A player identity as the booking rules see it: (name, level)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRef {
    pub name: String,
    pub level: PlayerLevel,
}

impl PlayerRef {
    pub fn new(name: impl Into<String>, level: PlayerLevel) -> Self {
        Self { name: name.into(), level }
    }
}

impl std::fmt::Display for PlayerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.level.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: i64,
    pub creator_name: String,
    pub creator_level: PlayerLevel,
    pub booking_date: NaiveDate,
    pub start_hour: i32,
    pub duration_hours: i32,
    pub session_type: SessionType,
    pub max_players: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn creator(&self) -> PlayerRef {
        PlayerRef::new(self.creator_name.clone(), self.creator_level)
    }

    /// Hour at which the session ends (exclusive)
    pub fn end_hour(&self) -> i32 {
        self.start_hour + self.duration_hours
    }

    /// Half-open interval overlap against a candidate window
    pub fn overlaps(&self, start_hour: i32, duration_hours: i32) -> bool {
        start_hour < self.end_hour() && self.start_hour < start_hour + duration_hours
    }

    /// Creator plus current participants
    pub fn occupancy(&self, participant_count: usize) -> i32 {
        1 + participant_count as i32
    }

    /// Remaining spots for open sessions, zero for closed ones
    pub fn spots_left(&self, participant_count: usize) -> i32 {
        match (self.session_type, self.max_players) {
            (SessionType::Open, Some(max)) => {
                (max - self.occupancy(participant_count)).max(0)
            }
            _ => 0,
        }
    }

    /// Closed sessions are always full; open ones fill up at max_players
    pub fn is_full(&self, participant_count: usize) -> bool {
        match self.session_type {
            SessionType::Closed => true,
            SessionType::Open => self.spots_left(participant_count) == 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Participant {
    pub id: i64,
    pub booking_id: i64,
    pub player_name: String,
    pub player_level: PlayerLevel,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn player(&self) -> PlayerRef {
        PlayerRef::new(self.player_name.clone(), self.player_level)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub creator: PlayerRef,
    pub booking_date: NaiveDate,
    pub start_hour: i32,
    pub duration: SlotDuration,
    pub session_type: SessionType,
    pub max_players: Option<i32>,
}

impl CreateBookingRequest {
    /// Reject malformed drafts before they reach the store
    pub fn validate(&self) -> Result<()> {
        if self.creator.name.trim().is_empty() {
            return Err(PitchBuddyError::Validation(
                "Creator name must not be empty".to_string(),
            ));
        }

        if self.start_hour < OPENING_HOUR || self.start_hour >= CLOSING_HOUR {
            return Err(PitchBuddyError::Validation(format!(
                "Start hour {} is outside the {}:00-{}:00 operating window",
                self.start_hour, OPENING_HOUR, CLOSING_HOUR
            )));
        }

        if self.start_hour + self.duration.hours() > CLOSING_HOUR {
            return Err(PitchBuddyError::Validation(format!(
                "A {}h session starting at {}:00 runs past closing time",
                self.duration.hours(),
                self.start_hour
            )));
        }

        match (self.session_type, self.max_players) {
            (SessionType::Open, Some(max)) if max >= 2 => Ok(()),
            (SessionType::Open, _) => Err(PitchBuddyError::Validation(
                "Open sessions need a maximum of at least 2 players".to_string(),
            )),
            (SessionType::Closed, None) => Ok(()),
            (SessionType::Closed, Some(_)) => Err(PitchBuddyError::Validation(
                "Closed sessions do not take a player maximum".to_string(),
            )),
        }
    }
}
