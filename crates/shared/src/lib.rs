//! Shared utilities for the Virtual Address Hub backend.
//!
//! - Hashing, HMAC signatures and session token generation
//! - Password hashing with Argon2id
//! - Cursor pagination helpers
//! - Field validators reused by request models

pub mod crypto;
pub mod pagination;
pub mod password;
pub mod validation;
