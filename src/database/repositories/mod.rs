//! Repository modules
//!
//! This module contains repository implementations for data access

pub mod booking;
pub mod player;

pub use booking::BookingRepository;
pub use player::PlayerRepository;
