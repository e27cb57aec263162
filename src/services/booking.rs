//! Booking service implementation
//!
//! Business rules on top of the repositories: ownership gating for deletes
//! and leaves, day snapshots for the availability engine, and a short-lived
//! Redis cache of those snapshots that the change feed invalidates.
//!
//! Capacity and overlap are NOT checked here; the database enforces both
//! atomically. Callers must treat any snapshot as advisory and be ready for
//! a typed rejection even when local state suggested success.

use chrono::{NaiveDate, NaiveDateTime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use crate::availability::{enumerate_available_slots, DaySnapshot, SlotOffer};
use crate::config::Settings;
use crate::database::DatabaseService;
use crate::models::booking::{Booking, CreateBookingRequest, Participant, PlayerRef};
use crate::utils::errors::{PitchBuddyError, Result};

#[derive(Clone)]
pub struct BookingService {
    database: DatabaseService,
    redis_client: redis::Client,
    settings: Settings,
}

impl BookingService {
    pub fn new(
        database: DatabaseService,
        redis_client: redis::Client,
        settings: Settings,
    ) -> Self {
        Self {
            database,
            redis_client,
            settings,
        }
    }

    /// Classified availability for a date, computed from a (possibly cached)
    /// snapshot. The `now` cutoff is always applied fresh.
    pub async fn available_slots(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<SlotOffer>> {
        let snapshot = self.day_snapshot_cached(date).await?;
        Ok(enumerate_available_slots(&snapshot, now))
    }

    /// Fresh snapshot straight from the store; used to re-validate right
    /// before presenting a commit choice.
    pub async fn day_snapshot(&self, date: NaiveDate) -> Result<DaySnapshot> {
        self.database.day_snapshot(date).await
    }

    /// Snapshot via the Redis cache. Cache failures degrade to a direct read.
    pub async fn day_snapshot_cached(&self, date: NaiveDate) -> Result<DaySnapshot> {
        match self.read_cached_snapshot(date).await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => {}
            Err(e) => warn!(error = %e, date = %date, "Snapshot cache read failed, falling back to store"),
        }

        let snapshot = self.database.day_snapshot(date).await?;

        if let Err(e) = self.write_cached_snapshot(&snapshot).await {
            warn!(error = %e, date = %date, "Snapshot cache write failed");
        }

        Ok(snapshot)
    }

    /// Create a new reservation
    pub async fn create_booking(&self, request: CreateBookingRequest) -> Result<Booking> {
        let booking = self.database.bookings.create(request).await?;

        info!(
            booking_id = booking.id,
            date = %booking.booking_date,
            start_hour = booking.start_hour,
            session_type = booking.session_type.as_str(),
            "Booking created"
        );

        self.invalidate_date(booking.booking_date).await;
        Ok(booking)
    }

    /// Join an open session; the capacity trigger arbitrates races
    pub async fn join_booking(&self, booking_id: i64, player: &PlayerRef) -> Result<Participant> {
        let participant = self.database.bookings.join(booking_id, player).await?;

        info!(booking_id = booking_id, player = %player, "Player joined booking");

        if let Some(booking) = self.database.bookings.find_by_id(booking_id).await? {
            self.invalidate_date(booking.booking_date).await;
        }

        Ok(participant)
    }

    /// Leave a session. The creator cannot leave their own booking, only
    /// delete it.
    pub async fn leave_booking(&self, booking_id: i64, player: &PlayerRef) -> Result<()> {
        let booking = self
            .database
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(PitchBuddyError::BookingNotFound { booking_id })?;

        if booking.creator() == *player {
            return Err(PitchBuddyError::PermissionDenied(
                "The creator cannot leave their own booking; delete it instead".to_string(),
            ));
        }

        self.database.bookings.leave(booking_id, player).await?;

        info!(booking_id = booking_id, player = %player, "Player left booking");

        self.invalidate_date(booking.booking_date).await;
        Ok(())
    }

    /// Delete a reservation. Only the creator may delete it, unless the
    /// actor is an admin.
    pub async fn delete_booking(
        &self,
        booking_id: i64,
        actor: &PlayerRef,
        is_admin: bool,
    ) -> Result<()> {
        let booking = self
            .database
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or(PitchBuddyError::BookingNotFound { booking_id })?;

        if !is_admin && booking.creator() != *actor {
            return Err(PitchBuddyError::PermissionDenied(
                "Only the creator can delete this booking".to_string(),
            ));
        }

        self.database.bookings.delete(booking_id).await?;

        info!(booking_id = booking_id, actor = %actor, is_admin = is_admin, "Booking deleted");

        self.invalidate_date(booking.booking_date).await;
        Ok(())
    }

    /// Upcoming bookings with their participants, for the list view
    pub async fn upcoming_bookings(
        &self,
        from: NaiveDate,
    ) -> Result<Vec<(Booking, Vec<Participant>)>> {
        let bookings = self.database.bookings.list_upcoming(from).await?;
        let ids: Vec<i64> = bookings.iter().map(|booking| booking.id).collect();
        let mut participants = self.database.bookings.participants_for(&ids).await?;

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let (mine, rest): (Vec<_>, Vec<_>) = participants
                    .drain(..)
                    .partition(|p| p.booking_id == booking.id);
                participants = rest;
                (booking, mine)
            })
            .collect())
    }

    /// Every booking plus aggregate counts, for the admin view
    pub async fn admin_overview(&self) -> Result<AdminOverview> {
        let bookings = self.database.bookings.list_all().await?;
        let total_bookings = self.database.bookings.count().await?;
        let total_participants = self.database.bookings.count_participants().await?;
        let total_players = self.database.players.count().await?;

        Ok(AdminOverview {
            bookings,
            total_bookings,
            total_participants,
            total_players,
        })
    }

    /// Drop the cached snapshot for a date after a local write
    pub async fn invalidate_date(&self, date: NaiveDate) {
        if let Err(e) = self.delete_cached_snapshot(date).await {
            warn!(error = %e, date = %date, "Snapshot cache invalidation failed");
        }
    }

    /// Drop every cached snapshot; used by the change feed, whose events do
    /// not carry a date
    pub async fn invalidate_all(&self) -> Result<u64> {
        let mut conn = self.redis_client.get_async_connection().await?;

        let pattern = format!("{}avail:*", self.settings.redis.prefix);
        let keys: Vec<String> = conn.keys(&pattern).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = conn.del(&keys).await?;
        debug!(deleted_keys = deleted, "Cleared cached availability snapshots");
        Ok(deleted)
    }

    fn snapshot_key(&self, date: NaiveDate) -> String {
        format!("{}avail:{}", self.settings.redis.prefix, date)
    }

    async fn read_cached_snapshot(&self, date: NaiveDate) -> Result<Option<DaySnapshot>> {
        let mut conn = self.redis_client.get_async_connection().await?;

        let cached: Option<String> = conn.get(self.snapshot_key(date)).await?;
        match cached {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn write_cached_snapshot(&self, snapshot: &DaySnapshot) -> Result<()> {
        let mut conn = self.redis_client.get_async_connection().await?;

        let serialized = serde_json::to_string(snapshot)?;
        let _: () = conn
            .set_ex(
                self.snapshot_key(snapshot.date),
                serialized,
                self.settings.pitch.availability_cache_seconds,
            )
            .await?;

        Ok(())
    }

    async fn delete_cached_snapshot(&self, date: NaiveDate) -> Result<()> {
        let mut conn = self.redis_client.get_async_connection().await?;
        let _: () = conn.del(self.snapshot_key(date)).await?;
        Ok(())
    }
}

/// Aggregates for the admin listing
#[derive(Debug, Clone)]
pub struct AdminOverview {
    pub bookings: Vec<Booking>,
    pub total_bookings: i64,
    pub total_participants: i64,
    pub total_players: i64,
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService").finish_non_exhaustive()
    }
}
