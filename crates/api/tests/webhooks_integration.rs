//! Integration tests for provider webhooks.
//!
//! Authentication failures are checked against an app whose pool never
//! connects, which also proves they are rejected before any query runs.

#[macro_use]
mod common;

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
};
use axum_extra::headers::{Authorization, HeaderMapExt};
use chrono::Utc;
use common::{
    create_session, gocardless_signature, parse_response_body, stripe_signature,
    stripe_signature_at, sumsub_digest,
};
use domain::models::user::{KycStatus, PlanStatus};
use persistence::repositories::{InvoiceRepository, UserRepository, WebhookEventRepository};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

fn webhook_request(uri: &str, body: &[u8], headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

fn postmark_auth(username: &str, password: &str) -> String {
    let mut headers = HeaderMap::new();
    headers.typed_insert(Authorization::basic(username, password));
    headers["authorization"].to_str().unwrap().to_string()
}

fn invoice_paid_event(event_id: &str, invoice_id: &str, user_id: Uuid) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": event_id,
        "type": "invoice.paid",
        "data": {"object": {
            "id": invoice_id,
            "customer": format!("cus_{}", user_id.simple()),
            "amount_paid": 1499,
            "amount_due": 1499,
            "currency": "gbp",
            "metadata": {"user_id": user_id.to_string()}
        }}
    }))
    .unwrap()
}

// ============================================================================
// Authentication (no database)
// ============================================================================

#[tokio::test]
async fn test_stripe_missing_signature_is_rejected() {
    let app = common::lazy_app();
    let body = invoice_paid_event("evt_missing", "in_missing", Uuid::new_v4());

    let response = app
        .oneshot(webhook_request("/api/webhooks/stripe", &body, &[]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "invalid_signature");
}

#[tokio::test]
async fn test_stripe_tampered_body_is_rejected() {
    let app = common::lazy_app();
    let body = invoice_paid_event("evt_tamper", "in_tamper", Uuid::new_v4());
    let signature = stripe_signature(&body);
    let mut tampered = body.clone();
    tampered.extend_from_slice(b" ");

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks/stripe",
            &tampered,
            &[("Stripe-Signature", &signature)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_stripe_stale_timestamp_is_rejected() {
    let app = common::lazy_app();
    let body = invoice_paid_event("evt_stale", "in_stale", Uuid::new_v4());
    let signature = stripe_signature_at(&body, Utc::now().timestamp() - 3600);

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks/stripe",
            &body,
            &[("Stripe-Signature", &signature)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sumsub_bad_digest_is_rejected() {
    let app = common::lazy_app();
    let body = br#"{"type": "applicantReviewed"}"#;

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks/sumsub",
            body,
            &[("X-Payload-Digest", "00ff")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gocardless_missing_signature_is_rejected() {
    let app = common::lazy_app();

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks-gc",
            br#"{"events": []}"#,
            &[],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_postmark_wrong_password_is_rejected() {
    let app = common::lazy_app();
    let auth = postmark_auth("postmark", "wrong");

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks-postmark",
            br#"{"RecordType": "Bounce", "ID": 1, "Email": "a@example.com"}"#,
            &[("Authorization", &auth)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signed_but_malformed_body_is_bad_request() {
    let app = common::lazy_app();
    let body = b"{not json";
    let signature = gocardless_signature(body);

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks-gc",
            body,
            &[("Webhook-Signature", &signature)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Database-backed
// ============================================================================

#[tokio::test]
async fn test_stripe_invoice_paid_activates_plan_once() {
    let pool = require_db!();
    let session = create_session(&pool).await;
    let app = common::app(&pool);

    let event_id = format!("evt_{}", Uuid::new_v4().simple());
    let invoice_id = format!("in_{}", Uuid::new_v4().simple());
    let body = invoice_paid_event(&event_id, &invoice_id, session.user_id);

    let response = app
        .clone()
        .oneshot(webhook_request(
            "/api/webhooks/stripe",
            &body,
            &[("Stripe-Signature", &stripe_signature(&body))],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = parse_response_body(response).await;
    assert_eq!(ack["data"]["received"], true);
    assert!(ack["data"].get("duplicate").is_none());

    let user = UserRepository::new(pool.clone())
        .find_by_id(session.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(PlanStatus::from(user.plan_status), PlanStatus::Active);
    assert_eq!(
        user.stripe_customer_id.as_deref(),
        Some(format!("cus_{}", session.user_id.simple()).as_str())
    );

    let invoices = InvoiceRepository::new(pool.clone())
        .list_for_user(session.user_id)
        .await
        .unwrap();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].amount_pence, 1499);
    assert!(invoices[0].paid_at.is_some());

    // Redelivery is acknowledged and not applied again.
    let response = app
        .oneshot(webhook_request(
            "/api/webhooks/stripe",
            &body,
            &[("Stripe-Signature", &stripe_signature(&body))],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = parse_response_body(response).await;
    assert_eq!(ack["data"]["duplicate"], true);

    let event = WebhookEventRepository::new(pool.clone())
        .find("stripe", &event_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.status, "processed");
}

#[tokio::test]
async fn test_stripe_unknown_event_type_is_ignored() {
    let pool = require_db!();
    let app = common::app(&pool);
    let event_id = format!("evt_{}", Uuid::new_v4().simple());
    let body = serde_json::to_vec(&json!({
        "id": event_id,
        "type": "charge.refunded",
        "data": {"object": {"id": "ch_1"}}
    }))
    .unwrap();

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks/stripe",
            &body,
            &[("Stripe-Signature", &stripe_signature(&body))],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let event = WebhookEventRepository::new(pool.clone())
        .find("stripe", &event_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.status, "ignored");
}

#[tokio::test]
async fn test_sumsub_green_review_verifies_user() {
    let pool = require_db!();
    let session = create_session(&pool).await;
    let app = common::app(&pool);
    let body = serde_json::to_vec(&json!({
        "type": "applicantReviewed",
        "applicantId": "applicant-1",
        "externalUserId": session.user_id.to_string(),
        "correlationId": format!("corr-{}", Uuid::new_v4()),
        "reviewResult": {"reviewAnswer": "GREEN"}
    }))
    .unwrap();

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks/sumsub",
            &body,
            &[("X-Payload-Digest", &sumsub_digest(&body))],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = UserRepository::new(pool.clone())
        .find_by_id(session.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(KycStatus::from(user.kyc_status), KycStatus::Verified);
    assert_eq!(user.sumsub_applicant_id.as_deref(), Some("applicant-1"));
}

#[tokio::test]
async fn test_gocardless_mandate_cancelled_marks_past_due() {
    let pool = require_db!();
    let session = create_session(&pool).await;
    common::set_account_status(&pool, session.user_id, PlanStatus::Active, KycStatus::Verified)
        .await;
    let mandate_id = format!("MD{}", Uuid::new_v4().simple());
    sqlx::query("UPDATE users SET gocardless_mandate_id = $2 WHERE id = $1")
        .bind(session.user_id)
        .bind(&mandate_id)
        .execute(&pool)
        .await
        .unwrap();

    let app = common::app(&pool);
    let body = serde_json::to_vec(&json!({"events": [{
        "id": format!("EV{}", Uuid::new_v4().simple()),
        "resource_type": "mandates",
        "action": "cancelled",
        "links": {"mandate": mandate_id}
    }]}))
    .unwrap();

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks-gc",
            &body,
            &[("Webhook-Signature", &gocardless_signature(&body))],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = UserRepository::new(pool.clone())
        .find_by_id(session.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(PlanStatus::from(user.plan_status), PlanStatus::PastDue);
}

#[tokio::test]
async fn test_postmark_bounce_flags_email() {
    let pool = require_db!();
    let session = create_session(&pool).await;
    let app = common::app(&pool);
    let config = common::test_config();
    let auth = postmark_auth(
        &config.webhooks.postmark_username,
        &config.webhooks.postmark_password,
    );
    let body = serde_json::to_vec(&json!({
        "RecordType": "Bounce",
        "ID": Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        "Email": session.email.to_uppercase()
    }))
    .unwrap();

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks-postmark",
            &body,
            &[("Authorization", &auth)],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = UserRepository::new(pool.clone())
        .find_by_id(session.user_id)
        .await
        .unwrap()
        .unwrap();
    assert!(user.email_bounced_at.is_some());
}

#[tokio::test]
async fn test_abandoned_processing_claim_is_taken_over_after_lease() {
    let pool = require_db!();
    let ledger = WebhookEventRepository::new(pool.clone());
    let event_id = format!("evt_{}", Uuid::new_v4().simple());
    let payload = json!({"id": event_id});

    assert!(ledger
        .claim("stripe", &event_id, "invoice.paid", &payload)
        .await
        .unwrap());
    // Still within the lease: another delivery is a duplicate.
    assert!(!ledger
        .claim("stripe", &event_id, "invoice.paid", &payload)
        .await
        .unwrap());

    sqlx::query(
        "UPDATE webhook_events SET received_at = NOW() - INTERVAL '1 hour' \
         WHERE provider = 'stripe' AND event_id = $1",
    )
    .bind(&event_id)
    .execute(&pool)
    .await
    .unwrap();

    assert!(ledger
        .claim("stripe", &event_id, "invoice.paid", &payload)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_stripe_redelivery_applies_event_left_processing() {
    let pool = require_db!();
    let session = create_session(&pool).await;
    let app = common::app(&pool);

    let event_id = format!("evt_{}", Uuid::new_v4().simple());
    let invoice_id = format!("in_{}", Uuid::new_v4().simple());
    let body = invoice_paid_event(&event_id, &invoice_id, session.user_id);

    // An earlier delivery claimed the event and never finished.
    let ledger = WebhookEventRepository::new(pool.clone());
    assert!(ledger
        .claim("stripe", &event_id, "invoice.paid", &json!({}))
        .await
        .unwrap());
    sqlx::query(
        "UPDATE webhook_events SET received_at = NOW() - INTERVAL '1 hour' \
         WHERE provider = 'stripe' AND event_id = $1",
    )
    .bind(&event_id)
    .execute(&pool)
    .await
    .unwrap();

    let response = app
        .oneshot(webhook_request(
            "/api/webhooks/stripe",
            &body,
            &[("Stripe-Signature", &stripe_signature(&body))],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = parse_response_body(response).await;
    assert!(ack["data"].get("duplicate").is_none());

    let user = UserRepository::new(pool.clone())
        .find_by_id(session.user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(PlanStatus::from(user.plan_status), PlanStatus::Active);

    let event = ledger.find("stripe", &event_id).await.unwrap().unwrap();
    assert_eq!(event.status, "processed");
}
