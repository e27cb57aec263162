//! Error handling for PitchBuddy
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

/// Main error type for PitchBuddy application
#[derive(Error, Debug)]
pub enum PitchBuddyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Assistant responder error: {0}")]
    Responder(#[from] ResponderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Booking not found: {booking_id}")]
    BookingNotFound { booking_id: i64 },

    #[error("Slot {date} {start_hour}:00 is already reserved")]
    SlotUnavailable { date: chrono::NaiveDate, start_hour: u32 },

    #[error("Booking {booking_id} has no spots left")]
    CapacityExceeded { booking_id: i64 },

    #[error("Booking {booking_id} is a closed session")]
    ClosedSession { booking_id: i64 },

    #[error("Player has already joined booking {booking_id}")]
    DuplicateParticipant { booking_id: i64 },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Fallback responder specific errors
#[derive(Error, Debug)]
pub enum ResponderError {
    #[error("Responder request failed: {0}")]
    RequestFailed(String),

    #[error("Responder request timed out")]
    Timeout,

    #[error("Invalid responder reply: {0}")]
    InvalidResponse(String),

    #[error("Responder service unavailable")]
    ServiceUnavailable,
}

/// Result type alias for PitchBuddy operations
pub type Result<T> = std::result::Result<T, PitchBuddyError>;

impl PitchBuddyError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            PitchBuddyError::Database(_) => false,
            PitchBuddyError::Migration(_) => false,
            PitchBuddyError::Telegram(_) => true,
            PitchBuddyError::Responder(_) => true,
            PitchBuddyError::Config(_) => false,
            PitchBuddyError::PermissionDenied(_) => false,
            PitchBuddyError::Validation(_) => false,
            PitchBuddyError::BookingNotFound { .. } => false,
            PitchBuddyError::SlotUnavailable { .. } => true,
            PitchBuddyError::CapacityExceeded { .. } => true,
            PitchBuddyError::ClosedSession { .. } => false,
            PitchBuddyError::DuplicateParticipant { .. } => false,
            PitchBuddyError::Redis(_) => true,
            PitchBuddyError::Serialization(_) => false,
            PitchBuddyError::Io(_) => true,
            PitchBuddyError::InvalidInput(_) => false,
            PitchBuddyError::ServiceUnavailable(_) => true,
        }
    }

    /// True for errors raised by losing a race against another writer; the
    /// user can simply pick another slot or retry.
    pub fn is_booking_conflict(&self) -> bool {
        matches!(
            self,
            PitchBuddyError::SlotUnavailable { .. }
                | PitchBuddyError::CapacityExceeded { .. }
                | PitchBuddyError::DuplicateParticipant { .. }
                | PitchBuddyError::ClosedSession { .. }
                | PitchBuddyError::BookingNotFound { .. }
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PitchBuddyError::Database(_) => ErrorSeverity::Critical,
            PitchBuddyError::Migration(_) => ErrorSeverity::Critical,
            PitchBuddyError::Config(_) => ErrorSeverity::Critical,
            PitchBuddyError::PermissionDenied(_) => ErrorSeverity::Warning,
            PitchBuddyError::Validation(_) => ErrorSeverity::Info,
            PitchBuddyError::InvalidInput(_) => ErrorSeverity::Info,
            PitchBuddyError::SlotUnavailable { .. } => ErrorSeverity::Info,
            PitchBuddyError::CapacityExceeded { .. } => ErrorSeverity::Info,
            PitchBuddyError::ClosedSession { .. } => ErrorSeverity::Info,
            PitchBuddyError::DuplicateParticipant { .. } => ErrorSeverity::Info,
            PitchBuddyError::BookingNotFound { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_conflict_classification() {
        let err = PitchBuddyError::CapacityExceeded { booking_id: 7 };
        assert!(err.is_booking_conflict());
        assert!(err.is_recoverable());

        let err = PitchBuddyError::SlotUnavailable {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            start_hour: 10,
        };
        assert!(err.is_booking_conflict());

        let err = PitchBuddyError::Config("missing token".to_string());
        assert!(!err.is_booking_conflict());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_severity() {
        assert_eq!(
            PitchBuddyError::Config("x".to_string()).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            PitchBuddyError::CapacityExceeded { booking_id: 1 }.severity(),
            ErrorSeverity::Info
        );
    }
}
