//! Inbound webhook payloads from billing, KYC and email providers.
//!
//! Only the fields this service acts on are modelled; everything else in the
//! provider payload is ignored by serde.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provider a webhook event came from. Stored in `webhook_events.provider`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookProvider {
    Stripe,
    Gocardless,
    Sumsub,
    Postmark,
}

impl WebhookProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookProvider::Stripe => "stripe",
            WebhookProvider::Gocardless => "gocardless",
            WebhookProvider::Sumsub => "sumsub",
            WebhookProvider::Postmark => "postmark",
        }
    }
}

impl fmt::Display for WebhookProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome recorded against a received event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventStatus {
    Processing,
    Processed,
    Ignored,
    Failed,
}

impl WebhookEventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventStatus::Processing => "processing",
            WebhookEventStatus::Processed => "processed",
            WebhookEventStatus::Ignored => "ignored",
            WebhookEventStatus::Failed => "failed",
        }
    }
}

/// Acknowledgement body returned to providers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

impl WebhookAck {
    pub fn accepted() -> Self {
        Self {
            received: true,
            duplicate: false,
        }
    }

    pub fn duplicate() -> Self {
        Self {
            received: true,
            duplicate: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Stripe
// ---------------------------------------------------------------------------

pub mod stripe_event_type {
    pub const INVOICE_PAID: &str = "invoice.paid";
    pub const INVOICE_PAYMENT_FAILED: &str = "invoice.payment_failed";
    pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
    pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub period_start: Option<i64>,
    #[serde(default)]
    pub period_end: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_currency() -> String {
    "gbp".to_string()
}

fn from_unix(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| Utc.timestamp_opt(s, 0).single())
}

impl StripeInvoice {
    /// `metadata.user_id`, when the checkout attached one.
    pub fn metadata_user_id(&self) -> Option<Uuid> {
        self.metadata
            .get("user_id")
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
    }

    pub fn period_start_at(&self) -> Option<DateTime<Utc>> {
        from_unix(self.period_start)
    }

    pub fn period_end_at(&self) -> Option<DateTime<Utc>> {
        from_unix(self.period_end)
    }

    /// Amount charged: what was paid when non-zero, else what was due.
    pub fn amount_pence(&self) -> i64 {
        if self.amount_paid > 0 {
            self.amount_paid
        } else {
            self.amount_due
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeSubscription {
    pub fn metadata_user_id(&self) -> Option<Uuid> {
        self.metadata
            .get("user_id")
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
    }
}

// ---------------------------------------------------------------------------
// Sumsub
// ---------------------------------------------------------------------------

pub mod sumsub_event_type {
    pub const APPLICANT_REVIEWED: &str = "applicantReviewed";
    pub const APPLICANT_PENDING: &str = "applicantPending";
    pub const APPLICANT_CREATED: &str = "applicantCreated";
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SumsubWebhook {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub applicant_id: Option<String>,
    #[serde(default)]
    pub external_user_id: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub review_result: Option<SumsubReviewResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SumsubReviewResult {
    pub review_answer: String,
}

impl SumsubWebhook {
    pub fn user_id(&self) -> Option<Uuid> {
        self.external_user_id
            .as_deref()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
    }
}

// ---------------------------------------------------------------------------
// GoCardless
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GoCardlessWebhook {
    #[serde(default)]
    pub events: Vec<GoCardlessEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoCardlessEvent {
    pub id: String,
    pub resource_type: String,
    pub action: String,
    #[serde(default)]
    pub links: GoCardlessLinks,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoCardlessLinks {
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(default)]
    pub mandate: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
}

// ---------------------------------------------------------------------------
// Postmark
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PostmarkWebhook {
    pub record_type: String,
    #[serde(default, rename = "ID")]
    pub id: Option<i64>,
    #[serde(default, rename = "MessageID")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl PostmarkWebhook {
    /// Bounces and spam complaints mark the address as undeliverable.
    pub fn is_deliverability_failure(&self) -> bool {
        matches!(self.record_type.as_str(), "Bounce" | "SpamComplaint")
    }

    /// Identifier used for de-duplication, when Postmark supplied one.
    pub fn event_id(&self) -> Option<String> {
        match (self.id, self.message_id.as_deref()) {
            (Some(id), _) => Some(format!("{}:{}", self.record_type, id)),
            (None, Some(message_id)) => Some(format!("{}:{}", self.record_type, message_id)),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stripe_invoice_event() {
        let body = serde_json::json!({
            "id": "evt_1",
            "type": "invoice.paid",
            "data": {"object": {
                "id": "in_1",
                "customer": "cus_1",
                "amount_paid": 999,
                "amount_due": 999,
                "currency": "gbp",
                "period_start": 1_700_000_000,
                "metadata": {"user_id": "6b0f3c9e-9d1c-4f55-8d7e-1c2b3a4d5e6f"}
            }}
        });
        let event: StripeEvent = serde_json::from_value(body).unwrap();
        assert_eq!(event.event_type, stripe_event_type::INVOICE_PAID);

        let invoice: StripeInvoice = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(invoice.amount_pence(), 999);
        assert!(invoice.metadata_user_id().is_some());
        assert!(invoice.period_start_at().is_some());
        assert!(invoice.period_end_at().is_none());
    }

    #[test]
    fn test_stripe_invoice_defaults() {
        let invoice: StripeInvoice =
            serde_json::from_value(serde_json::json!({"id": "in_2", "amount_due": 500})).unwrap();
        assert_eq!(invoice.currency, "gbp");
        assert_eq!(invoice.amount_pence(), 500);
        assert!(invoice.customer.is_none());
        assert!(invoice.metadata_user_id().is_none());
    }

    #[test]
    fn test_parse_sumsub() {
        let body = r#"{
            "type": "applicantReviewed",
            "applicantId": "abc",
            "externalUserId": "6b0f3c9e-9d1c-4f55-8d7e-1c2b3a4d5e6f",
            "reviewResult": {"reviewAnswer": "GREEN"}
        }"#;
        let hook: SumsubWebhook = serde_json::from_str(body).unwrap();
        assert!(hook.user_id().is_some());
        assert_eq!(hook.review_result.unwrap().review_answer, "GREEN");
    }

    #[test]
    fn test_parse_gocardless() {
        let body = r#"{"events": [
            {"id": "EV1", "resource_type": "payments", "action": "confirmed",
             "links": {"payment": "PM1", "mandate": "MD1"}},
            {"id": "EV2", "resource_type": "mandates", "action": "cancelled"}
        ]}"#;
        let hook: GoCardlessWebhook = serde_json::from_str(body).unwrap();
        assert_eq!(hook.events.len(), 2);
        assert_eq!(hook.events[0].links.mandate.as_deref(), Some("MD1"));
        assert!(hook.events[1].links.mandate.is_none());
    }

    #[test]
    fn test_postmark_bounce() {
        let body = r#"{"RecordType": "Bounce", "ID": 42, "Email": "a@example.com"}"#;
        let hook: PostmarkWebhook = serde_json::from_str(body).unwrap();
        assert!(hook.is_deliverability_failure());
        assert_eq!(hook.event_id().as_deref(), Some("Bounce:42"));

        let delivery: PostmarkWebhook =
            serde_json::from_str(r#"{"RecordType": "Delivery"}"#).unwrap();
        assert!(!delivery.is_deliverability_failure());
        assert!(delivery.event_id().is_none());
    }

    #[test]
    fn test_ack_serialization() {
        let json = serde_json::to_value(WebhookAck::accepted()).unwrap();
        assert_eq!(json, serde_json::json!({"received": true}));
        let json = serde_json::to_value(WebhookAck::duplicate()).unwrap();
        assert_eq!(json["duplicate"], true);
    }
}
