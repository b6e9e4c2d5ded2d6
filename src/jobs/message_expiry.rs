use sqlx::MySqlPool;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::core::AppError;
use crate::db::messages::purge_expired_messages;

/// Background job that deletes messages past their `expires_at`
pub fn start_message_expiry_job(pool: MySqlPool, every: Duration) -> JoinHandle<()> {
    info!("Starting message expiry job, running every {:?}", every);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;

            if let Err(e) = purge_once(&pool).await {
                error!("Failed to purge expired messages: {}", e);
            }
        }
    })
}

async fn purge_once(pool: &MySqlPool) -> Result<u64, AppError> {
    let deleted = purge_expired_messages(pool).await?;

    if deleted > 0 {
        info!("Purged {} expired message(s)", deleted);
    }

    Ok(deleted)
}
