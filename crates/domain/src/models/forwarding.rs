//! Forwarding request domain models and the status workflow.
//!
//! A forwarding request moves through
//! `Requested -> Reviewed -> Processing -> Dispatched -> Delivered`,
//! and may be cancelled while it is still `Requested`, `Reviewed` or
//! `Processing`. [`ForwardingStatus::apply`] is the only place the legal
//! moves are defined.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of a forwarding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForwardingStatus {
    Requested,
    Reviewed,
    Processing,
    Dispatched,
    Delivered,
    Cancelled,
}

impl ForwardingStatus {
    pub const ALL: [ForwardingStatus; 6] = [
        ForwardingStatus::Requested,
        ForwardingStatus::Reviewed,
        ForwardingStatus::Processing,
        ForwardingStatus::Dispatched,
        ForwardingStatus::Delivered,
        ForwardingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardingStatus::Requested => "Requested",
            ForwardingStatus::Reviewed => "Reviewed",
            ForwardingStatus::Processing => "Processing",
            ForwardingStatus::Dispatched => "Dispatched",
            ForwardingStatus::Delivered => "Delivered",
            ForwardingStatus::Cancelled => "Cancelled",
        }
    }

    /// Open requests still block another request for the same mail item.
    pub fn is_open(&self) -> bool {
        !matches!(
            self,
            ForwardingStatus::Delivered | ForwardingStatus::Cancelled
        )
    }

    /// Returns the status reached by applying `action`, or an
    /// [`TransitionError::IllegalTransition`] when the move is not allowed.
    pub fn apply(self, action: ForwardingAction) -> Result<ForwardingStatus, TransitionError> {
        use ForwardingAction::*;
        use ForwardingStatus::*;

        match (self, action) {
            (Requested, MarkReviewed) => Ok(Reviewed),
            (Requested, StartProcessing) => Ok(Processing),
            (Requested, Cancel) => Ok(Cancelled),
            (Reviewed, StartProcessing) => Ok(Processing),
            (Reviewed, Cancel) => Ok(Cancelled),
            (Processing, MarkDispatched) => Ok(Dispatched),
            (Processing, Cancel) => Ok(Cancelled),
            (Dispatched, MarkDelivered) => Ok(Delivered),
            (from, action) => Err(TransitionError::IllegalTransition {
                from,
                action: action.as_str().to_string(),
            }),
        }
    }

    /// Actions an admin may take from this status, in table order.
    pub fn allowed_actions(self) -> Vec<ForwardingAction> {
        ForwardingAction::ALL
            .into_iter()
            .filter(|action| self.apply(*action).is_ok())
            .collect()
    }
}

impl fmt::Display for ForwardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForwardingStatus {
    type Err = String;

    /// Case-insensitive, so `?status=dispatched` works in list filters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ForwardingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown forwarding status '{}'", s))
    }
}

/// Admin action against a forwarding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardingAction {
    MarkReviewed,
    StartProcessing,
    MarkDispatched,
    MarkDelivered,
    Cancel,
}

impl ForwardingAction {
    pub const ALL: [ForwardingAction; 5] = [
        ForwardingAction::MarkReviewed,
        ForwardingAction::StartProcessing,
        ForwardingAction::MarkDispatched,
        ForwardingAction::MarkDelivered,
        ForwardingAction::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ForwardingAction::MarkReviewed => "mark_reviewed",
            ForwardingAction::StartProcessing => "start_processing",
            ForwardingAction::MarkDispatched => "mark_dispatched",
            ForwardingAction::MarkDelivered => "mark_delivered",
            ForwardingAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for ForwardingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForwardingAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ForwardingAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("unknown forwarding action '{}'", s))
    }
}

/// Rejection of a forwarding status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} a forwarding request that is {from}")]
    IllegalTransition {
        from: ForwardingStatus,
        action: String,
    },
}

/// Resolves a raw action string against the current status.
///
/// Unrecognised action strings are rejected the same way as recognised
/// actions that are not legal from `from`.
pub fn resolve_transition(
    from: ForwardingStatus,
    action: &str,
) -> Result<(ForwardingAction, ForwardingStatus), TransitionError> {
    let parsed = action
        .parse::<ForwardingAction>()
        .map_err(|_| TransitionError::IllegalTransition {
            from,
            action: action.to_string(),
        })?;
    let to = from.apply(parsed)?;
    Ok((parsed, to))
}

lazy_static::lazy_static! {
    pub static ref TRACKING_NUMBER_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z0-9-]{4,64}$").unwrap();
}

/// A forwarding request as returned to customers and staff.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ForwardingRequest {
    pub id: Uuid,
    pub mail_item_id: Uuid,
    pub user_id: Uuid,
    pub status: ForwardingStatus,
    pub to_name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatched_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl ForwardingRequest {
    /// Customer-facing copy: staff notes stay internal.
    pub fn for_customer(mut self) -> Self {
        self.admin_notes = None;
        self
    }
}

/// Customer request to forward a mail item.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateForwardingRequest {
    pub mail_item_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Recipient name must be 1-200 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub to_name: String,

    #[validate(length(min = 1, max = 1000, message = "Address must be 1-1000 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub address: String,
}

/// Admin PATCH body: `{ action, courier?, tracking_number?, admin_notes? }`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ForwardingActionRequest {
    pub action: String,

    #[validate(length(min = 1, max = 100, message = "Courier must be 1-100 characters"))]
    pub courier: Option<String>,

    #[validate(regex(
        path = *TRACKING_NUMBER_REGEX,
        message = "Tracking number must be 4-64 letters, digits or dashes"
    ))]
    pub tracking_number: Option<String>,

    #[validate(length(max = 2000, message = "Admin notes must be at most 2000 characters"))]
    pub admin_notes: Option<String>,
}

impl ForwardingActionRequest {
    /// Dispatch details carried by this request, if the action uses them.
    pub fn dispatch_details(&self, action: ForwardingAction) -> Option<DispatchDetails> {
        if action != ForwardingAction::MarkDispatched {
            return None;
        }
        Some(DispatchDetails {
            courier: self.courier.clone(),
            tracking_number: self.tracking_number.clone(),
            admin_notes: self.admin_notes.clone(),
        })
    }
}

/// Optional fields persisted alongside `mark_dispatched`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchDetails {
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub admin_notes: Option<String>,
}

/// Query parameters for the admin forwarding queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminListForwardingQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Result of an admin action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ForwardingActionResponse {
    pub previous_status: ForwardingStatus,
    pub request: ForwardingRequest,
    pub allowed_actions: Vec<ForwardingAction>,
}
