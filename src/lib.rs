//! PitchBuddy Telegram Bot
//!
//! A Telegram bot for managing a shared sports pitch: hourly availability,
//! open and closed sessions, capacity-checked joins, and a conversational
//! booking flow with a generative fallback for off-script questions.

#![allow(non_snake_case)]

pub mod availability;
pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{PitchBuddyError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;
pub use state::{DialogueManager, StateStorage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
