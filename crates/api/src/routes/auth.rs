//! Signup, login, logout and whoami.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use domain::models::user::{LoginRequest, SignupRequest};
use domain::models::ApiResponse;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::services::{AuthService, IssuedSession};

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.pool.clone(), state.config.session.ttl_secs)
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    session: IssuedSession,
) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    state
        .cookies
        .add_session_cookies(&mut headers, &session.session_token, &session.csrf_token);
    (status, headers, Json(ApiResponse::new(session.user)))
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    let session = auth_service(&state).signup(&request).await?;
    Ok(session_response(&state, StatusCode::CREATED, session))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    let session = auth_service(&state)
        .login(&request.email, &request.password)
        .await?;
    tracing::info!(user_id = %session.user.id, "User logged in");
    Ok(session_response(&state, StatusCode::OK, session))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = state.cookies.extract_session_token(&headers) {
        auth_service(&state).logout(token).await?;
    }
    tracing::info!(user_id = %user.id, "User logged out");

    let mut response_headers = HeaderMap::new();
    state.cookies.add_clear_cookies(&mut response_headers);
    Ok((
        response_headers,
        Json(ApiResponse::new(serde_json::json!({ "logged_out": true }))),
    ))
}

/// GET /api/auth/whoami
pub async fn whoami(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(ApiResponse::new(user))
}
