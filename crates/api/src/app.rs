use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_admin, require_csrf,
    require_session, security_headers_middleware, trace_id, RateLimiterState, REQUEST_ID_HEADER,
};
use crate::routes::{
    account, admin_users, auth, destruction, forwarding, health, mail_items, webhooks,
};
use crate::services::CookieHelper;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
    pub cookies: CookieHelper,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        // Disabled when rate_limit_per_minute is 0.
        let rate_limiter = RateLimiterState::new(config.security.rate_limit_per_minute).map(Arc::new);
        let cookies = CookieHelper::new(config.session.clone());
        Self {
            pool,
            config: Arc::new(config),
            rate_limiter,
            cookies,
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Development: any origin, no credentials.
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    // Cookies require credentials, which cannot be combined with wildcards.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let state = AppState::new(config, pool);
    create_app_with_state(state)
}

pub fn create_app_with_state(state: AppState) -> Router {
    let config = state.config.clone();

    // Signup and login: no session yet, so no CSRF token either.
    let auth_routes = Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    // Customer routes. Layers run bottom-up: session, then CSRF, then rate
    // limiting keyed by the session user.
    let session_routes = Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/mail-items", get(mail_items::list_mail_items))
        .route(
            "/api/mail-items/:id",
            get(mail_items::get_mail_item).patch(mail_items::update_mail_item),
        )
        .route(
            "/api/forwarding/requests",
            get(forwarding::list_forwarding_requests).post(forwarding::create_forwarding_request),
        )
        .route(
            "/api/forwarding/requests/:id",
            get(forwarding::get_forwarding_request),
        )
        .route("/api/billing/overview", get(account::billing_overview))
        .route("/api/billing/invoices", get(account::list_invoices))
        .route("/api/kyc/status", get(account::kyc_status))
        .route(
            "/api/profile/registered-office-address",
            get(account::registered_office_address),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_csrf))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let admin_routes = Router::new()
        .route("/api/admin/users", get(admin_users::list_users))
        .route(
            "/api/admin/users/:id",
            get(admin_users::get_user).patch(admin_users::update_user),
        )
        .route("/api/admin/mail-items", post(mail_items::create_mail_item))
        .route(
            "/api/admin/mail-items/:id/destroy",
            post(destruction::destroy_mail_item),
        )
        .route(
            "/api/admin/destruction-logs",
            get(destruction::list_destruction_logs),
        )
        .route(
            "/api/admin/forwarding/requests",
            get(forwarding::admin_list_forwarding_requests),
        )
        .route(
            "/api/admin/forwarding/requests/:id",
            get(forwarding::admin_get_forwarding_request)
                .patch(forwarding::admin_update_forwarding_request),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_csrf))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    // Providers authenticate with signatures, not sessions.
    let webhook_routes = Router::new()
        .route("/api/webhooks/stripe", post(webhooks::stripe_webhook))
        .route("/api/webhooks/sumsub", post(webhooks::sumsub_webhook))
        .route("/api/webhooks-gc", post(webhooks::gocardless_webhook))
        .route("/api/webhooks-postmark", post(webhooks::postmark_webhook));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .merge(webhook_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}
