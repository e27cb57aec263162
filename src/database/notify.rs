//! Booking change feed
//!
//! Wraps Postgres LISTEN/NOTIFY on the channel the schema triggers fire.
//! Events carry no authoritative data; subscribers re-fetch from the tables
//! on every event, whatever order events arrive in relative to their own
//! writes.

use async_stream::stream;
use futures::Stream;
use sqlx::postgres::PgListener;
use tracing::{debug, warn};

use crate::database::DatabasePool;
use crate::utils::errors::Result;

/// Channel name matching the `notify_booking_change` trigger
pub const CHANGE_CHANNEL: &str = "pitchbuddy_changes";

/// A single "something changed, re-fetch" hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingChange {
    /// Raw trigger payload, `table:operation`; informational only
    pub payload: String,
}

/// Listener for booking/participant table changes
pub struct BookingWatcher {
    listener: PgListener,
}

impl BookingWatcher {
    pub async fn connect(pool: &DatabasePool) -> Result<Self> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        Ok(Self { listener })
    }

    /// Turn the listener into a stream of change hints. Reconnects inside
    /// `recv` are handled by sqlx; errors end the stream and the caller is
    /// expected to rebuild the watcher.
    pub fn into_stream(mut self) -> impl Stream<Item = BookingChange> {
        stream! {
            loop {
                match self.listener.recv().await {
                    Ok(notification) => {
                        let payload = notification.payload().to_string();
                        debug!(payload = %payload, "Booking change notification received");
                        yield BookingChange { payload };
                    }
                    Err(e) => {
                        warn!(error = %e, "Booking change listener failed, ending stream");
                        break;
                    }
                }
            }
        }
    }
}
