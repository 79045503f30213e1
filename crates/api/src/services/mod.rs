//! Application services used by route handlers and middleware.

pub mod auth;
pub mod cookies;
pub mod webhook_signature;

pub use auth::{AuthError, AuthService, IssuedSession};
pub use cookies::CookieHelper;
