//! Per-client rate limiting.
//!
//! Clients are keyed by session user when one is attached to the request,
//! otherwise by the client IP taken from `X-Forwarded-For` / `X-Real-IP`.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{Arc, RwLock},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

type ClientRateLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared limiter table. Built only when `rate_limit_per_minute > 0`.
pub struct RateLimiterState {
    limiters: RwLock<HashMap<String, Arc<ClientRateLimiter>>>,
    quota: Quota,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// `None` when rate limiting is disabled.
    pub fn new(rate_limit_per_minute: u32) -> Option<Self> {
        let per_minute = NonZeroU32::new(rate_limit_per_minute)?;
        Some(Self {
            limiters: RwLock::new(HashMap::new()),
            quota: Quota::per_minute(per_minute),
            rate_limit_per_minute,
        })
    }

    fn get_or_create_limiter(&self, client: &str) -> Arc<ClientRateLimiter> {
        {
            let limiters = self.limiters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(limiter) = limiters.get(client) {
                return limiter.clone();
            }
        }

        let mut limiters = self.limiters.write().unwrap_or_else(|e| e.into_inner());
        limiters
            .entry(client.to_string())
            .or_insert_with(|| Arc::new(GovRateLimiter::direct(self.quota)))
            .clone()
    }

    /// `Err(retry_after_secs)` when the client is over its quota.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        let limiter = self.get_or_create_limiter(client);
        limiter.check().map_err(|not_until| {
            not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1)
        })
    }

    pub fn active_clients(&self) -> usize {
        self.limiters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("active_clients", &self.active_clients())
            .finish()
    }
}

/// Client IP from proxy headers: first `X-Forwarded-For` hop, then `X-Real-IP`.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}

fn client_key(req: &Request<Body>) -> String {
    if let Some(CurrentUser(user)) = req.extensions().get::<CurrentUser>() {
        return format!("user:{}", user.id);
    }
    match client_ip(req.headers()) {
        Some(ip) => format!("ip:{}", ip),
        None => "ip:unknown".to_string(),
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(ref limiter) = state.rate_limiter {
        let key = client_key(&req);
        if let Err(retry_after) = limiter.check(&key) {
            tracing::info!(client = %key, retry_after, "Rate limit exceeded");
            return rate_limited_response(retry_after);
        }
    }
    next.run(req).await
}

fn rate_limited_response(retry_after: u64) -> Response {
    let mut response = ApiError::RateLimited.into_response();
    if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}
