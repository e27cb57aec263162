//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod booking;
pub mod player;

// Re-export commonly used models
pub use booking::{
    Booking, CreateBookingRequest, Participant, PlayerLevel, PlayerRef, SessionType,
    SlotDuration, CLOSING_HOUR, OPENING_HOUR,
};
pub use player::{Player, UpsertPlayerRequest};
