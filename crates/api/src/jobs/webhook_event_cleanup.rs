//! Prunes the webhook event ledger past its retention window.

use chrono::{Duration, Utc};
use persistence::repositories::WebhookEventRepository;
use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::config::MAX_EVENT_RETENTION_DAYS;

pub struct WebhookEventCleanupJob {
    pool: PgPool,
    retention_days: i64,
}

impl WebhookEventCleanupJob {
    pub fn new(pool: PgPool, retention_days: i64) -> Self {
        Self {
            pool,
            retention_days: retention_days.clamp(1, MAX_EVENT_RETENTION_DAYS),
        }
    }
}

#[async_trait::async_trait]
impl Job for WebhookEventCleanupJob {
    fn name(&self) -> &'static str {
        "webhook_event_cleanup"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), String> {
        let cutoff = Utc::now() - Duration::days(self.retention_days);
        let deleted = WebhookEventRepository::new(self.pool.clone())
            .delete_received_before(cutoff)
            .await
            .map_err(|e| format!("Failed to prune webhook events: {}", e))?;

        info!(
            deleted = deleted,
            retention_days = self.retention_days,
            "Pruned webhook events"
        );
        Ok(())
    }
}
