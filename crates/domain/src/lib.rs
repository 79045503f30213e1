//! Domain layer for the Virtual Address Hub backend.
//!
//! This crate contains:
//! - Domain models and request/response shapes (mail items, forwarding
//!   requests, billing, KYC, webhooks)
//! - The forwarding status transition table
//! - Pure business rules (destruction attribution, registered office gate,
//!   provider status mapping)

pub mod models;
pub mod services;
