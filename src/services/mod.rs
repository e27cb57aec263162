//! Services module
//!
//! This module contains business logic services

pub mod booking;
pub mod player;
pub mod responder;

// Re-export commonly used services
pub use booking::{AdminOverview, BookingService};
pub use player::PlayerService;
pub use responder::FallbackResponder;

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Debug, Clone)]
pub struct ServiceFactory {
    pub booking_service: BookingService,
    pub player_service: PlayerService,
    pub responder: FallbackResponder,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(
        database: DatabaseService,
        settings: Settings,
        redis_client: ::redis::Client,
    ) -> Result<Self> {
        let booking_service =
            BookingService::new(database.clone(), redis_client, settings.clone());
        let player_service = PlayerService::new(database.players.clone());
        let responder = FallbackResponder::new(settings)?;

        Ok(Self {
            booking_service,
            player_service,
            responder,
        })
    }
}
