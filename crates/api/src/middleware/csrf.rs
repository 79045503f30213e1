//! Double-submit CSRF protection for session routes.
//!
//! State-changing requests must echo the `vah_csrf` cookie in the
//! `X-CSRF-Token` header.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::crypto::constant_time_eq;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::CookieHelper;

pub const CSRF_HEADER: &str = "X-CSRF-Token";

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Whether the header token matches the cookie token.
pub fn csrf_token_matches(cookies: &CookieHelper, headers: &HeaderMap) -> bool {
    let cookie = cookies.extract_csrf_token(headers);
    let header = headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (cookie, header) {
        (Some(cookie), Some(header)) => constant_time_eq(cookie, header),
        _ => false,
    }
}

pub async fn require_csrf(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_state_changing(req.method()) && !csrf_token_matches(&state.cookies, req.headers()) {
        tracing::info!(
            method = %req.method(),
            path = %req.uri().path(),
            "Rejected request without matching CSRF token"
        );
        return ApiError::CsrfFailed.into_response();
    }
    next.run(req).await
}
