//! Booking repository implementation
//!
//! All reservation and participant rows flow through here. The capacity
//! trigger and the overlap exclusion constraint live in the database; this
//! layer translates their rejections into typed errors.

use sqlx::PgPool;
use chrono::{NaiveDate, Utc};
use crate::models::booking::{Booking, CreateBookingRequest, Participant, PlayerRef};
use crate::utils::errors::PitchBuddyError;

const BOOKING_COLUMNS: &str =
    "id, creator_name, creator_level, booking_date, start_hour, duration_hours, session_type, max_players, created_at";

#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new booking. The exclusion constraint rejects overlapping
    /// windows atomically, so two racing creates cannot both land.
    pub async fn create(&self, request: CreateBookingRequest) -> Result<Booking, PitchBuddyError> {
        request.validate()?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (creator_name, creator_level, booking_date, start_hour, duration_hours, session_type, max_players, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, creator_name, creator_level, booking_date, start_hour, duration_hours, session_type, max_players, created_at
            "#
        )
        .bind(&request.creator.name)
        .bind(request.creator.level)
        .bind(request.booking_date)
        .bind(request.start_hour)
        .bind(request.duration.hours())
        .bind(request.session_type)
        .bind(request.max_players)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_create_error(e, &request))?;

        Ok(booking)
    }

    /// Find booking by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, PitchBuddyError> {
        let booking = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// All bookings for a date, ascending by start hour
    pub async fn list_for_date(&self, date: NaiveDate) -> Result<Vec<Booking>, PitchBuddyError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_date = $1 ORDER BY start_hour ASC"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// All bookings from a date onwards, ascending by date then start hour
    pub async fn list_upcoming(&self, from: NaiveDate) -> Result<Vec<Booking>, PitchBuddyError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE booking_date >= $1 ORDER BY booking_date ASC, start_hour ASC"
        ))
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Every booking in the system, newest date first (admin listing)
    pub async fn list_all(&self) -> Result<Vec<Booking>, PitchBuddyError> {
        let bookings = sqlx::query_as::<_, Booking>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY booking_date DESC, start_hour ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    /// Delete booking; participants cascade
    pub async fn delete(&self, id: i64) -> Result<(), PitchBuddyError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PitchBuddyError::BookingNotFound { booking_id: id });
        }

        Ok(())
    }

    /// Join an open session. The capacity trigger runs inside this insert's
    /// transaction with the booking row locked, so concurrent joins for the
    /// last spot resolve to exactly one success.
    pub async fn join(
        &self,
        booking_id: i64,
        player: &PlayerRef,
    ) -> Result<Participant, PitchBuddyError> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants (booking_id, player_name, player_level, joined_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, booking_id, player_name, player_level, joined_at
            "#,
        )
        .bind(booking_id)
        .bind(&player.name)
        .bind(player.level)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_join_error(e, booking_id))?;

        Ok(participant)
    }

    /// Remove a player's own participation
    pub async fn leave(&self, booking_id: i64, player: &PlayerRef) -> Result<(), PitchBuddyError> {
        let result = sqlx::query(
            "DELETE FROM participants WHERE booking_id = $1 AND player_name = $2 AND player_level = $3",
        )
        .bind(booking_id)
        .bind(&player.name)
        .bind(player.level)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PitchBuddyError::BookingNotFound { booking_id });
        }

        Ok(())
    }

    /// Participants of the given bookings, ascending by join time
    pub async fn participants_for(
        &self,
        booking_ids: &[i64],
    ) -> Result<Vec<Participant>, PitchBuddyError> {
        if booking_ids.is_empty() {
            return Ok(Vec::new());
        }

        let participants = sqlx::query_as::<_, Participant>(
            "SELECT id, booking_id, player_name, player_level, joined_at FROM participants WHERE booking_id = ANY($1) ORDER BY joined_at ASC",
        )
        .bind(booking_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    /// Participant count for one booking
    pub async fn participant_count(&self, booking_id: i64) -> Result<i64, PitchBuddyError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM participants WHERE booking_id = $1")
                .bind(booking_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0)
    }

    /// Count total bookings (admin stats)
    pub async fn count(&self) -> Result<i64, PitchBuddyError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    /// Count total participations (admin stats)
    pub async fn count_participants(&self) -> Result<i64, PitchBuddyError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM participants")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

/// Map create failures: the overlap exclusion constraint surfaces as
/// SQLSTATE 23P01 and means another reservation already holds the window.
fn map_create_error(err: sqlx::Error, request: &CreateBookingRequest) -> PitchBuddyError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23P01") {
            return PitchBuddyError::SlotUnavailable {
                date: request.booking_date,
                start_hour: request.start_hour as u32,
            };
        }
    }
    PitchBuddyError::Database(err)
}

/// Map join failures raised by the capacity trigger (PB001..PB003) and the
/// per-booking membership uniqueness constraint (23505).
fn map_join_error(err: sqlx::Error, booking_id: i64) -> PitchBuddyError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            Some("PB001") => return PitchBuddyError::CapacityExceeded { booking_id },
            Some("PB002") => return PitchBuddyError::ClosedSession { booking_id },
            Some("PB003") => return PitchBuddyError::BookingNotFound { booking_id },
            Some("23505") => return PitchBuddyError::DuplicateParticipant { booking_id },
            _ => {}
        }
    }
    PitchBuddyError::Database(err)
}
