use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use domain::models::destruction::AttributionError;
use domain::models::forwarding::TransitionError;
use domain::services::ComplianceError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("CSRF token missing or invalid")]
    CsrfFailed,

    #[error("KYC verification required")]
    KycRequired,

    #[error("Active billing required")]
    BillingRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Illegal transition: {0}")]
    IllegalTransition(String),

    #[error("Invalid attribution: {0}")]
    InvalidAttribution(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
    message: String,
}

impl ApiError {
    /// Status code and machine-readable `error` value.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::CsrfFailed => (StatusCode::FORBIDDEN, "csrf_failed"),
            ApiError::KycRequired => (StatusCode::FORBIDDEN, "KYC_REQUIRED"),
            ApiError::BillingRequired => (StatusCode::FORBIDDEN, "BILLING_REQUIRED"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::IllegalTransition(_) => (StatusCode::BAD_REQUEST, "illegal_transition"),
            ApiError::InvalidAttribution(_) => (StatusCode::BAD_REQUEST, "invalid_attribution"),
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();
        let message = match self {
            ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Validation(msg)
            | ApiError::IllegalTransition(msg)
            | ApiError::InvalidAttribution(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::InvalidSignature => "Webhook signature verification failed".into(),
            ApiError::CsrfFailed => "CSRF token missing or invalid".into(),
            ApiError::KycRequired => {
                "Complete identity verification to access your registered office address".into()
            }
            ApiError::BillingRequired => {
                "An active subscription is required to access your registered office address"
                    .into()
            }
            ApiError::RateLimited => "Too many requests. Please try again later.".into(),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".into()
            }
        };

        let body = ErrorBody {
            ok: false,
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();

        let message = if messages.len() == 1 {
            messages.remove(0)
        } else {
            format!("{} validation errors: {}", messages.len(), messages.join("; "))
        };

        ApiError::Validation(message)
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::IllegalTransition(err.to_string())
    }
}

impl From<AttributionError> for ApiError {
    fn from(err: AttributionError) -> Self {
        match err {
            AttributionError::InvalidAttribution(reason) => {
                ApiError::InvalidAttribution(reason.to_string())
            }
        }
    }
}

impl From<ComplianceError> for ApiError {
    fn from(err: ComplianceError) -> Self {
        match err {
            ComplianceError::KycRequired => ApiError::KycRequired,
            ComplianceError::BillingRequired => ApiError::BillingRequired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use domain::models::forwarding::ForwardingStatus;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ApiError::InvalidSignature, StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::CsrfFailed, StatusCode::FORBIDDEN),
            (ApiError::KycRequired, StatusCode::FORBIDDEN),
            (ApiError::BillingRequired, StatusCode::FORBIDDEN),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::IllegalTransition("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::InvalidAttribution("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::ServiceUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_error_envelope() {
        let (status, json) = body_json(ApiError::KycRequired).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "KYC_REQUIRED");
        assert!(json["message"].is_string());
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (_, json) = body_json(ApiError::Internal("password=hunter2".into())).await;
        assert_eq!(json["error"], "internal_error");
        assert!(!json["message"].as_str().unwrap().contains("hunter2"));
    }

    #[test]
    fn test_from_transition_error() {
        let err: ApiError = TransitionError::IllegalTransition {
            from: ForwardingStatus::Delivered,
            action: "cancel".into(),
        }
        .into();
        assert_eq!(err.status_and_code().1, "illegal_transition");
    }

    #[test]
    fn test_from_attribution_error() {
        let err: ApiError = AttributionError::InvalidAttribution("staff initials cannot be 'UN'").into();
        match err {
            ApiError::InvalidAttribution(msg) => assert!(msg.contains("UN")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_from_compliance_error() {
        assert!(matches!(
            ApiError::from(ComplianceError::BillingRequired),
            ApiError::BillingRequired
        ));
    }

    #[test]
    fn test_from_sqlx_row_not_found() {
        let error: ApiError = sqlx::Error::RowNotFound.into();
        match error {
            ApiError::NotFound(msg) => assert_eq!(msg, "Resource not found"),
            _ => panic!("Expected NotFound error"),
        }
    }
}
