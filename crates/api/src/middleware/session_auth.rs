//! Cookie session authentication.
//!
//! `require_session` resolves the `vah_session` cookie to an account and
//! stores it in request extensions as [`CurrentUser`]. `require_admin` must
//! run after it.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::services::AuthService;

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match state.cookies.extract_session_token(req.headers()) {
        Some(token) => token.to_string(),
        None => return ApiError::Unauthorized("Authentication required".into()).into_response(),
    };

    let auth = AuthService::new(state.pool.clone(), state.config.session.ttl_secs);
    match auth.resolve_session(&token).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        Ok(None) => {
            tracing::debug!("Session cookie did not match an active session");
            ApiError::Unauthorized("Session expired or invalid".into()).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<CurrentUser>() {
        Some(CurrentUser(user)) if user.is_admin => next.run(req).await,
        Some(CurrentUser(user)) => {
            tracing::warn!(user_id = %user.id, "Non-admin attempted admin route");
            ApiError::Forbidden("Admin access required".into()).into_response()
        }
        None => ApiError::Unauthorized("Authentication required".into()).into_response(),
    }
}
