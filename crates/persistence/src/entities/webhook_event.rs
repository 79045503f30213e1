//! Webhook event ledger entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the webhook_events table.
#[derive(Debug, Clone, FromRow)]
pub struct WebhookEventEntity {
    pub id: Uuid,
    pub provider: String,
    pub event_id: String,
    pub event_type: String,
    pub status: String,
    pub error: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
