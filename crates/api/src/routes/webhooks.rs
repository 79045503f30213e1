//! Inbound provider webhooks.
//!
//! Each handler authenticates the raw body before touching the database,
//! records the event in `webhook_events` and applies it at most once.

use std::future::Future;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use chrono::Utc;
use domain::models::billing::InvoiceUpsert;
use domain::models::webhook::{
    GoCardlessEvent, GoCardlessWebhook, PostmarkWebhook, StripeEvent, SumsubWebhook, WebhookAck,
};
use domain::models::{ApiResponse, PlanStatus, WebhookEventStatus, WebhookProvider};
use domain::services::{
    classify_gocardless_event, classify_stripe_event, kyc_status_for_sumsub, GoCardlessAction,
    StripeAction,
};
use persistence::repositories::{InvoiceRepository, UserRepository, WebhookEventRepository};
use serde::de::DeserializeOwned;
use shared::crypto::sha256_hex;
use sqlx::PgPool;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_webhook_event;
use crate::services::webhook_signature::{
    verify_basic_credentials, verify_body_hmac, verify_stripe_signature, SignatureError,
};

const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";
const SUMSUB_DIGEST_HEADER: &str = "X-Payload-Digest";
const GOCARDLESS_SIGNATURE_HEADER: &str = "Webhook-Signature";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn reject(provider: WebhookProvider, err: SignatureError) -> ApiError {
    record_webhook_event(provider.as_str(), "rejected");
    err.into()
}

/// Parses the body twice: once as raw JSON for the ledger, once into the
/// typed payload.
fn parse_body<T: DeserializeOwned>(
    provider: WebhookProvider,
    body: &[u8],
) -> Result<(serde_json::Value, T), ApiError> {
    let invalid = |e: serde_json::Error| {
        record_webhook_event(provider.as_str(), "invalid");
        tracing::warn!(provider = %provider, error = %e, "Unparseable webhook body");
        ApiError::Validation(format!("Invalid {} payload", provider))
    };
    let raw: serde_json::Value = serde_json::from_slice(body).map_err(invalid)?;
    let typed: T = serde_json::from_value(raw.clone()).map_err(invalid)?;
    Ok((raw, typed))
}

fn body_digest(body: &[u8]) -> String {
    sha256_hex(&String::from_utf8_lossy(body))
}

fn ledger(state: &AppState) -> WebhookEventRepository {
    WebhookEventRepository::new(state.pool.clone())
        .with_processing_lease(state.config.webhooks.processing_lease_secs)
}

/// Result of running one event through the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LedgerOutcome {
    Duplicate,
    Finished(WebhookEventStatus),
}

/// Claims `(provider, event_id)` and, when the claim is new, runs `apply` and
/// stores its outcome. A failed apply is stored as `failed` so the provider's
/// retry can claim it again.
async fn run_once<F>(
    ledger: &WebhookEventRepository,
    provider: WebhookProvider,
    event_id: &str,
    event_type: &str,
    payload: &serde_json::Value,
    apply: F,
) -> Result<LedgerOutcome, ApiError>
where
    F: Future<Output = Result<WebhookEventStatus, sqlx::Error>>,
{
    if !ledger
        .claim(provider.as_str(), event_id, event_type, payload)
        .await?
    {
        record_webhook_event(provider.as_str(), "duplicate");
        tracing::info!(
            provider = %provider,
            event_id = %event_id,
            event_type = %event_type,
            "Duplicate webhook event acknowledged"
        );
        return Ok(LedgerOutcome::Duplicate);
    }

    match apply.await {
        Ok(status) => {
            ledger
                .finish(provider.as_str(), event_id, status.as_str(), None)
                .await?;
            record_webhook_event(provider.as_str(), status.as_str());
            tracing::info!(
                provider = %provider,
                event_id = %event_id,
                event_type = %event_type,
                status = status.as_str(),
                "Webhook event handled"
            );
            Ok(LedgerOutcome::Finished(status))
        }
        Err(e) => {
            let message = e.to_string();
            if let Err(finish_err) = ledger
                .finish(
                    provider.as_str(),
                    event_id,
                    WebhookEventStatus::Failed.as_str(),
                    Some(&message),
                )
                .await
            {
                tracing::error!(error = %finish_err, "Failed to record webhook failure");
            }
            record_webhook_event(provider.as_str(), "failed");
            tracing::error!(
                provider = %provider,
                event_id = %event_id,
                event_type = %event_type,
                error = %message,
                "Webhook event failed"
            );
            Err(ApiError::Internal(format!(
                "Failed to apply {} event {}",
                provider, event_id
            )))
        }
    }
}

fn ack(outcome: LedgerOutcome) -> impl IntoResponse {
    let body = match outcome {
        LedgerOutcome::Duplicate => WebhookAck::duplicate(),
        LedgerOutcome::Finished(_) => WebhookAck::accepted(),
    };
    (StatusCode::OK, Json(ApiResponse::new(body)))
}

// ---------------------------------------------------------------------------
// Stripe
// ---------------------------------------------------------------------------

/// POST /api/webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let provider = WebhookProvider::Stripe;
    verify_stripe_signature(
        &state.config.webhooks.stripe_secret,
        &body,
        header_str(&headers, STRIPE_SIGNATURE_HEADER),
        state.config.webhooks.stripe_tolerance_secs,
        Utc::now().timestamp(),
    )
    .map_err(|e| reject(provider, e))?;

    let (payload, event): (_, StripeEvent) = parse_body(provider, &body)?;
    let action = classify_stripe_event(&event).map_err(|e| {
        record_webhook_event(provider.as_str(), "invalid");
        ApiError::Validation(format!("Invalid {} object: {}", event.event_type, e))
    })?;

    let ledger = ledger(&state);
    let outcome = run_once(
        &ledger,
        provider,
        &event.id,
        &event.event_type,
        &payload,
        apply_stripe(&state.pool, &event.id, action),
    )
    .await?;

    Ok(ack(outcome))
}

/// Finds the user a Stripe object belongs to: by customer id first, then by
/// `metadata.user_id`, in which case the customer id is recorded on the user.
async fn resolve_stripe_user(
    users: &UserRepository,
    customer: Option<&str>,
    metadata_user_id: Option<Uuid>,
) -> Result<Option<Uuid>, sqlx::Error> {
    if let Some(customer) = customer {
        if let Some(user) = users.find_by_stripe_customer_id(customer).await? {
            return Ok(Some(user.id));
        }
    }

    let Some(user_id) = metadata_user_id else {
        return Ok(None);
    };
    let Some(user) = users.find_by_id(user_id).await? else {
        return Ok(None);
    };
    if let Some(customer) = customer {
        users.set_stripe_customer_id(user.id, customer).await?;
    }
    Ok(Some(user.id))
}

async fn apply_stripe(
    pool: &PgPool,
    event_id: &str,
    action: StripeAction,
) -> Result<WebhookEventStatus, sqlx::Error> {
    let users = UserRepository::new(pool.clone());

    match action {
        StripeAction::Invoice {
            invoice,
            invoice_status,
            plan_status,
        } => {
            let Some(user_id) = resolve_stripe_user(
                &users,
                invoice.customer.as_deref(),
                invoice.metadata_user_id(),
            )
            .await?
            else {
                tracing::warn!(
                    event_id = %event_id,
                    invoice_id = %invoice.id,
                    "Stripe invoice has no matching user"
                );
                return Ok(WebhookEventStatus::Ignored);
            };

            InvoiceRepository::new(pool.clone())
                .upsert_stripe(&InvoiceUpsert {
                    user_id,
                    external_id: invoice.id.clone(),
                    amount_pence: invoice.amount_pence(),
                    currency: invoice.currency.clone(),
                    status: invoice_status,
                    period_start: invoice.period_start_at(),
                    period_end: invoice.period_end_at(),
                })
                .await?;
            users.set_plan_status(user_id, plan_status.into()).await?;
            Ok(WebhookEventStatus::Processed)
        }
        StripeAction::Subscription {
            subscription,
            plan_status,
        } => {
            let Some(user_id) = resolve_stripe_user(
                &users,
                subscription.customer.as_deref(),
                subscription.metadata_user_id(),
            )
            .await?
            else {
                tracing::warn!(
                    event_id = %event_id,
                    subscription_id = %subscription.id,
                    "Stripe subscription has no matching user"
                );
                return Ok(WebhookEventStatus::Ignored);
            };

            users.set_plan_status(user_id, plan_status.into()).await?;
            Ok(WebhookEventStatus::Processed)
        }
        StripeAction::Ignored => Ok(WebhookEventStatus::Ignored),
    }
}

// ---------------------------------------------------------------------------
// Sumsub
// ---------------------------------------------------------------------------

/// POST /api/webhooks/sumsub
pub async fn sumsub_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let provider = WebhookProvider::Sumsub;
    verify_body_hmac(
        &state.config.webhooks.sumsub_secret,
        &body,
        header_str(&headers, SUMSUB_DIGEST_HEADER),
    )
    .map_err(|e| reject(provider, e))?;

    let (payload, hook): (_, SumsubWebhook) = parse_body(provider, &body)?;
    let event_id = hook
        .correlation_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| body_digest(&body));

    let ledger = ledger(&state);
    let outcome = run_once(
        &ledger,
        provider,
        &event_id,
        &hook.event_type,
        &payload,
        apply_sumsub(&state.pool, &hook),
    )
    .await?;

    Ok(ack(outcome))
}

async fn apply_sumsub(
    pool: &PgPool,
    hook: &SumsubWebhook,
) -> Result<WebhookEventStatus, sqlx::Error> {
    let Some(kyc_status) = kyc_status_for_sumsub(hook) else {
        return Ok(WebhookEventStatus::Ignored);
    };
    let Some(user_id) = hook.user_id() else {
        tracing::warn!(
            applicant_id = ?hook.applicant_id,
            "Sumsub event without a usable externalUserId"
        );
        return Ok(WebhookEventStatus::Ignored);
    };

    let updated = UserRepository::new(pool.clone())
        .set_kyc_status(user_id, kyc_status.into(), hook.applicant_id.as_deref())
        .await?;
    if updated == 0 {
        tracing::warn!(user_id = %user_id, "Sumsub event for unknown user");
        return Ok(WebhookEventStatus::Ignored);
    }
    Ok(WebhookEventStatus::Processed)
}

// ---------------------------------------------------------------------------
// GoCardless
// ---------------------------------------------------------------------------

/// POST /api/webhooks-gc
///
/// A batch may mix new and already-seen events; each is claimed on its own.
pub async fn gocardless_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let provider = WebhookProvider::Gocardless;
    verify_body_hmac(
        &state.config.webhooks.gocardless_secret,
        &body,
        header_str(&headers, GOCARDLESS_SIGNATURE_HEADER),
    )
    .map_err(|e| reject(provider, e))?;

    let (payload, hook): (_, GoCardlessWebhook) = parse_body(provider, &body)?;
    let raw_events = payload
        .get("events")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let ledger = ledger(&state);
    let mut all_duplicates = !hook.events.is_empty();
    for (index, event) in hook.events.iter().enumerate() {
        let event_type = format!("{}.{}", event.resource_type, event.action);
        let raw = raw_events
            .get(index)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        let outcome = run_once(
            &ledger,
            provider,
            &event.id,
            &event_type,
            &raw,
            apply_gocardless(&state.pool, event),
        )
        .await?;
        all_duplicates &= outcome == LedgerOutcome::Duplicate;
    }

    let outcome = if all_duplicates {
        LedgerOutcome::Duplicate
    } else {
        LedgerOutcome::Finished(WebhookEventStatus::Processed)
    };
    Ok(ack(outcome))
}

async fn apply_gocardless(
    pool: &PgPool,
    event: &GoCardlessEvent,
) -> Result<WebhookEventStatus, sqlx::Error> {
    let users = UserRepository::new(pool.clone());

    match classify_gocardless_event(event) {
        GoCardlessAction::Payment {
            payment_id,
            mandate_id,
            invoice_status,
            plan_status,
        } => {
            let Some(mandate_id) = mandate_id else {
                tracing::warn!(event_id = %event.id, "GoCardless payment without mandate link");
                return Ok(WebhookEventStatus::Ignored);
            };
            let Some(user) = users.find_by_gocardless_mandate_id(&mandate_id).await? else {
                tracing::warn!(
                    event_id = %event.id,
                    mandate_id = %mandate_id,
                    "GoCardless mandate has no matching user"
                );
                return Ok(WebhookEventStatus::Ignored);
            };

            InvoiceRepository::new(pool.clone())
                .upsert_gocardless(user.id, &payment_id, invoice_status)
                .await?;
            users.set_plan_status(user.id, plan_status.into()).await?;
            Ok(WebhookEventStatus::Processed)
        }
        GoCardlessAction::MandateLapsed { mandate_id } => {
            let updated = users
                .set_plan_status_by_mandate(&mandate_id, PlanStatus::PastDue.into())
                .await?;
            if updated == 0 {
                return Ok(WebhookEventStatus::Ignored);
            }
            Ok(WebhookEventStatus::Processed)
        }
        GoCardlessAction::Ignored => Ok(WebhookEventStatus::Ignored),
    }
}

// ---------------------------------------------------------------------------
// Postmark
// ---------------------------------------------------------------------------

/// POST /api/webhooks-postmark
pub async fn postmark_webhook(
    State(state): State<AppState>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let provider = WebhookProvider::Postmark;
    verify_basic_credentials(
        &state.config.webhooks.postmark_username,
        &state.config.webhooks.postmark_password,
        credentials
            .as_ref()
            .map(|TypedHeader(auth)| (auth.username(), auth.password())),
    )
    .map_err(|e| reject(provider, e))?;

    let (payload, hook): (_, PostmarkWebhook) = parse_body(provider, &body)?;
    let event_id = hook.event_id().unwrap_or_else(|| body_digest(&body));

    let ledger = ledger(&state);
    let outcome = run_once(
        &ledger,
        provider,
        &event_id,
        &hook.record_type,
        &payload,
        apply_postmark(&state.pool, &hook),
    )
    .await?;

    Ok(ack(outcome))
}

async fn apply_postmark(
    pool: &PgPool,
    hook: &PostmarkWebhook,
) -> Result<WebhookEventStatus, sqlx::Error> {
    if !hook.is_deliverability_failure() {
        return Ok(WebhookEventStatus::Ignored);
    }
    let Some(email) = hook.email.as_deref().filter(|e| !e.trim().is_empty()) else {
        return Ok(WebhookEventStatus::Ignored);
    };

    let updated = UserRepository::new(pool.clone())
        .mark_email_bounced(email)
        .await?;
    if updated == 0 {
        return Ok(WebhookEventStatus::Ignored);
    }
    Ok(WebhookEventStatus::Processed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_digest_is_stable() {
        let a = body_digest(br#"{"RecordType":"Delivery"}"#);
        let b = body_digest(br#"{"RecordType":"Delivery"}"#);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, body_digest(br#"{"RecordType":"Bounce"}"#));
    }

    #[test]
    fn test_parse_body_rejects_wrong_shape() {
        let result: Result<(serde_json::Value, StripeEvent), _> =
            parse_body(WebhookProvider::Stripe, br#"{"id": "evt_1"}"#);
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let result: Result<(serde_json::Value, StripeEvent), _> =
            parse_body(WebhookProvider::Stripe, b"not json");
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_parse_body_keeps_raw_payload() {
        let body = br#"{"RecordType": "Bounce", "ID": 7, "Email": "a@example.com", "Extra": 1}"#;
        let (raw, hook): (serde_json::Value, PostmarkWebhook) =
            parse_body(WebhookProvider::Postmark, body).unwrap();
        assert_eq!(raw["Extra"], 1);
        assert_eq!(hook.email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn test_header_str() {
        let mut headers = HeaderMap::new();
        headers.insert(SUMSUB_DIGEST_HEADER, "abc".parse().unwrap());
        assert_eq!(header_str(&headers, "x-payload-digest"), Some("abc"));
        assert_eq!(header_str(&headers, STRIPE_SIGNATURE_HEADER), None);
    }
}
