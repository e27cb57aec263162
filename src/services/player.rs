//! Player profile service implementation

use tracing::info;

use crate::database::repositories::PlayerRepository;
use crate::models::booking::PlayerLevel;
use crate::models::player::{Player, UpsertPlayerRequest};
use crate::utils::errors::Result;

#[derive(Debug, Clone)]
pub struct PlayerService {
    repository: PlayerRepository,
}

impl PlayerService {
    pub fn new(repository: PlayerRepository) -> Self {
        Self { repository }
    }

    /// Register or update the (name, level) identity for a Telegram account
    pub async fn register(
        &self,
        telegram_id: i64,
        name: String,
        level: PlayerLevel,
    ) -> Result<Player> {
        let player = self
            .repository
            .upsert(UpsertPlayerRequest {
                telegram_id,
                name,
                level,
            })
            .await?;

        info!(
            telegram_id = telegram_id,
            name = %player.name,
            level = player.level.as_str(),
            "Player profile registered"
        );

        Ok(player)
    }

    /// Look up the profile for a Telegram account
    pub async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Player>> {
        self.repository.find_by_telegram_id(telegram_id).await
    }
}
