//! Mail destruction records and the staff attribution guard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// Why a destruction record was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributionError {
    #[error("invalid attribution: {0}")]
    InvalidAttribution(&'static str),
}

/// Refuses staff attribution that would be recorded as "Unknown" / "UN".
///
/// Every destruction must name the person who did it.
pub fn validate_staff_attribution(
    staff_name: &str,
    staff_initials: &str,
) -> Result<(), AttributionError> {
    let name = staff_name.trim();
    let initials = staff_initials.trim();

    if name.is_empty() {
        return Err(AttributionError::InvalidAttribution(
            "staff name is required",
        ));
    }
    if name.to_lowercase().contains("unknown") {
        return Err(AttributionError::InvalidAttribution(
            "staff name cannot be 'Unknown'",
        ));
    }
    if initials.is_empty() {
        return Err(AttributionError::InvalidAttribution(
            "staff initials are required",
        ));
    }
    if initials.eq_ignore_ascii_case("UN") {
        return Err(AttributionError::InvalidAttribution(
            "staff initials cannot be 'UN'",
        ));
    }
    Ok(())
}

/// Admin request to record that a mail item was destroyed.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct DestroyMailItemRequest {
    #[validate(length(max = 120, message = "Staff name must be at most 120 characters"))]
    pub staff_name: String,

    #[validate(length(max = 8, message = "Staff initials must be at most 8 characters"))]
    pub staff_initials: String,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

/// A destruction log row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DestructionLog {
    pub id: Uuid,
    pub mail_item_id: Uuid,
    pub user_id: Uuid,
    pub staff_name: String,
    pub staff_initials: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub destroyed_at: DateTime<Utc>,
}
