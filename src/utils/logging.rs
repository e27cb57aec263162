//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the PitchBuddy application.

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration
///
/// Returns the worker guard for the rolling file writer; dropping it stops
/// the file sink, so the caller must hold it for the life of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "pitchbuddy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log booking mutations with structured data
pub fn log_booking_action(booking_id: i64, action: &str, player: &str, details: Option<&str>) {
    info!(
        booking_id = booking_id,
        action = action,
        player = player,
        details = details,
        "Booking action performed"
    );
}

/// Log dialogue transitions
pub fn log_dialogue_transition(user_id: i64, from: &str, to: &str) {
    info!(
        user_id = user_id,
        from = from,
        to = to,
        "Dialogue transition"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        "Admin action performed"
    );
}
