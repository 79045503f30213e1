//! HTTP route handlers.

pub mod account;
pub mod admin_users;
pub mod auth;
pub mod destruction;
pub mod forwarding;
pub mod health;
pub mod mail_items;
pub mod webhooks;
