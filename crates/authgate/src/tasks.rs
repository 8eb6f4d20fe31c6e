//! Background maintenance tasks

use authgate_db::{Database, DbError};
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tracing::{info, warn};

/// Delete revocation entries whose tokens have expired
pub async fn purge_expired_revocations(db: &Database) -> Result<u64, DbError> {
    let purged = db.purge_expired_revocations(Utc::now()).await?;
    metrics::counter!("authgate_revocations_purged_total").increment(purged);
    Ok(purged)
}

fn purge_period(interval_minutes: u64) -> Duration {
    Duration::from_secs(interval_minutes.saturating_mul(60))
}

/// Periodically purge expired revocation entries
pub fn spawn_revocation_purge_task(db: Database, interval_minutes: u64) -> JoinHandle<()> {
    info!(
        "Starting revocation purge task (interval: {} minutes)",
        interval_minutes
    );

    tokio::spawn(async move {
        let mut ticker = interval(purge_period(interval_minutes));

        // Skip the first tick (which fires immediately)
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match purge_expired_revocations(&db).await {
                Ok(purged) if purged > 0 => {
                    info!("Purged {} expired revocation entries", purged)
                }
                Ok(_) => {}
                Err(e) => warn!("Error purging revocation entries: {}", e),
            }
        }
    })
}
