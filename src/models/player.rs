//! Player profile model
//!
//! Profiles map a Telegram account to the (name, level) identity the booking
//! rules operate on. There is no password; this is a naming convention, not
//! authentication.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::booking::{PlayerLevel, PlayerRef};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Player {
    pub id: i64,
    pub telegram_id: i64,
    pub name: String,
    pub level: PlayerLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn player_ref(&self) -> PlayerRef {
        PlayerRef::new(self.name.clone(), self.level)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPlayerRequest {
    pub telegram_id: i64,
    pub name: String,
    pub level: PlayerLevel,
}
