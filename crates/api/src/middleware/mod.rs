//! HTTP middleware components.

pub mod csrf;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod security_headers;
pub mod session_auth;
pub mod trace_id;

pub use csrf::{require_csrf, CSRF_HEADER};
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rate_limit::{rate_limit_middleware, RateLimiterState};
pub use security_headers::security_headers_middleware;
pub use session_auth::{require_admin, require_session};
pub use trace_id::{trace_id, RequestId, REQUEST_ID_HEADER};
