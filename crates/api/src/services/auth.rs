//! Account signup, password login and cookie sessions.
//!
//! Session tokens are opaque random strings. Only their SHA-256 digest is
//! stored, so a leaked `sessions` table cannot be replayed.

use chrono::{Duration, Utc};
use domain::models::user::{SignupRequest, User};
use persistence::entities::UserEntity;
use persistence::repositories::{NewUser, SessionRepository, UserRepository};
use shared::crypto::{generate_token, sha256_hex};
use shared::password::{hash_password, verify_password, PasswordError};
use sqlx::PgPool;
use thiserror::Error;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::EmailAlreadyExists => {
                ApiError::Conflict("An account with this email already exists".into())
            }
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid email or password".into())
            }
            AuthError::PasswordError(e) => ApiError::Internal(e.to_string()),
            AuthError::DatabaseError(e) => e.into(),
        }
    }
}

/// A freshly opened session. The raw tokens only exist here and in the
/// cookies sent back to the browser.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user: User,
    pub session_token: String,
    pub csrf_token: String,
}

pub struct AuthService {
    users: UserRepository,
    sessions: SessionRepository,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(pool: PgPool, session_ttl_secs: i64) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool),
            session_ttl: Duration::seconds(session_ttl_secs),
        }
    }

    /// Creates the account and signs it in. The request must already be
    /// validated.
    pub async fn signup(&self, request: &SignupRequest) -> Result<IssuedSession, AuthError> {
        let password_hash = hash_password(&request.password)?;
        let email = request.email.trim().to_lowercase();

        let created = self
            .users
            .create(NewUser {
                email: &email,
                password_hash: &password_hash,
                first_name: request.first_name.trim(),
                last_name: request.last_name.trim(),
                company_name: request
                    .company_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty()),
            })
            .await;

        let user = match created {
            Ok(user) => user,
            // Concurrent signups for the same address race on the unique index.
            Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23505") => {
                return Err(AuthError::EmailAlreadyExists)
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = %user.id, "Account created");
        self.open_session(user).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(user).await
    }

    /// Ends the session behind `session_token`. Unknown tokens are ignored.
    pub async fn logout(&self, session_token: &str) -> Result<(), AuthError> {
        self.sessions
            .delete_by_token_hash(&sha256_hex(session_token))
            .await?;
        Ok(())
    }

    /// Account owning an unexpired session.
    pub async fn resolve_session(&self, session_token: &str) -> Result<Option<User>, AuthError> {
        let user = self
            .sessions
            .find_active_user(&sha256_hex(session_token))
            .await?;
        Ok(user.map(User::from))
    }

    async fn open_session(&self, user: UserEntity) -> Result<IssuedSession, AuthError> {
        let session_token = generate_token();
        let csrf_token = generate_token();
        let expires_at = Utc::now() + self.session_ttl;

        self.sessions
            .create(user.id, &sha256_hex(&session_token), expires_at)
            .await?;

        Ok(IssuedSession {
            user: user.into(),
            session_token,
            csrf_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_auth_error_mapping() {
        let err: ApiError = AuthError::EmailAlreadyExists.into();
        assert_eq!(err.status_and_code().0, StatusCode::CONFLICT);

        let err: ApiError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status_and_code().0, StatusCode::UNAUTHORIZED);

        let err: ApiError = AuthError::DatabaseError(sqlx::Error::RowNotFound).into();
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
    }
}
