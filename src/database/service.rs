//! Database service layer
//!
//! This module provides a high-level interface to database operations

use chrono::NaiveDate;

use crate::availability::DaySnapshot;
use crate::database::{BookingRepository, DatabasePool, PlayerRepository};
use crate::utils::errors::PitchBuddyError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub bookings: BookingRepository,
    pub players: PlayerRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            bookings: BookingRepository::new(pool.clone()),
            players: PlayerRepository::new(pool),
        }
    }

    /// Read a full day's bookings and participants in one snapshot for the
    /// availability engine. Always re-derives from the tables; change
    /// notifications only tell us to call this again.
    pub async fn day_snapshot(&self, date: NaiveDate) -> Result<DaySnapshot, PitchBuddyError> {
        let bookings = self.bookings.list_for_date(date).await?;
        let ids: Vec<i64> = bookings.iter().map(|booking| booking.id).collect();
        let participants = self.bookings.participants_for(&ids).await?;

        Ok(DaySnapshot::new(date, bookings, participants))
    }
}
