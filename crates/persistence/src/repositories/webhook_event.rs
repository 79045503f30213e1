//! Webhook event ledger used for de-duplication.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::entities::WebhookEventEntity;
use crate::metrics::QueryTimer;

/// Seconds a `processing` claim is held before a redelivery may take it over.
pub const DEFAULT_PROCESSING_LEASE_SECS: i64 = 120;

#[derive(Clone)]
pub struct WebhookEventRepository {
    pool: PgPool,
    processing_lease_secs: i64,
}

impl WebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            processing_lease_secs: DEFAULT_PROCESSING_LEASE_SECS,
        }
    }

    pub fn with_processing_lease(mut self, secs: i64) -> Self {
        self.processing_lease_secs = secs;
        self
    }

    /// Records an incoming event as `processing`.
    ///
    /// Returns `false` when `(provider, event_id)` was already seen. An event
    /// whose earlier attempt `failed` is claimed again, as is one left in
    /// `processing` longer than the lease (its handler was dropped before it
    /// could finish).
    pub async fn claim(
        &self,
        provider: &str,
        event_id: &str,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("claim_webhook_event");
        let claimed: Option<(uuid::Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO webhook_events (provider, event_id, event_type, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider, event_id) DO UPDATE SET
                status = 'processing',
                error = NULL,
                payload = EXCLUDED.payload,
                received_at = NOW()
            WHERE webhook_events.status = 'failed'
               OR (webhook_events.status = 'processing'
                   AND webhook_events.received_at < NOW() - make_interval(secs => $5))
            RETURNING id
            "#,
        )
        .bind(provider)
        .bind(event_id)
        .bind(event_type)
        .bind(payload)
        .bind(self.processing_lease_secs as f64)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();
        Ok(claimed.is_some())
    }

    /// Stores the final outcome of a claimed event.
    pub async fn finish(
        &self,
        provider: &str,
        event_id: &str,
        status: &str,
        error: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("finish_webhook_event");
        let result = sqlx::query(
            r#"
            UPDATE webhook_events SET status = $3, error = $4, processed_at = NOW()
            WHERE provider = $1 AND event_id = $2
            "#,
        )
        .bind(provider)
        .bind(event_id)
        .bind(status)
        .bind(error)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    pub async fn find(
        &self,
        provider: &str,
        event_id: &str,
    ) -> Result<Option<WebhookEventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_webhook_event");
        let result = sqlx::query_as::<_, WebhookEventEntity>(
            "SELECT * FROM webhook_events WHERE provider = $1 AND event_id = $2",
        )
        .bind(provider)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Retention cleanup. Returns rows deleted.
    pub async fn delete_received_before(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_old_webhook_events");
        let result = sqlx::query("DELETE FROM webhook_events WHERE received_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
