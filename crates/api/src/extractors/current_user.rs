//! Session user extractors.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::User;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::AuthService;

/// The signed-in account.
///
/// Uses the user inserted by `require_session` when present, otherwise
/// resolves the session cookie itself.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let token = state
            .cookies
            .extract_session_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;

        let auth = AuthService::new(state.pool.clone(), state.config.session.ttl_secs);
        let user = auth
            .resolve_session(token)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Session expired or invalid".into()))?;

        parts.extensions.insert(CurrentUser(user.clone()));
        Ok(CurrentUser(user))
    }
}

/// A signed-in account with the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(user))
    }
}
