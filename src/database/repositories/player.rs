//! Player profile repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::player::{Player, UpsertPlayerRequest};
use crate::utils::errors::PitchBuddyError;

#[derive(Debug, Clone)]
pub struct PlayerRepository {
    pool: PgPool,
}

impl PlayerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or update the profile for a Telegram account
    pub async fn upsert(&self, request: UpsertPlayerRequest) -> Result<Player, PitchBuddyError> {
        let player = sqlx::query_as::<_, Player>(
            r#"
            INSERT INTO players (telegram_id, name, level, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (telegram_id)
            DO UPDATE SET name = EXCLUDED.name, level = EXCLUDED.level, updated_at = EXCLUDED.updated_at
            RETURNING id, telegram_id, name, level, created_at, updated_at
            "#,
        )
        .bind(request.telegram_id)
        .bind(&request.name)
        .bind(request.level)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(player)
    }

    /// Find profile by Telegram ID
    pub async fn find_by_telegram_id(
        &self,
        telegram_id: i64,
    ) -> Result<Option<Player>, PitchBuddyError> {
        let player = sqlx::query_as::<_, Player>(
            "SELECT id, telegram_id, name, level, created_at, updated_at FROM players WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(player)
    }

    /// Count registered players (admin stats)
    pub async fn count(&self) -> Result<i64, PitchBuddyError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM players")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}
