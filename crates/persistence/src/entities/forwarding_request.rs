//! Forwarding request entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::forwarding::{ForwardingRequest, ForwardingStatus};

/// Database enum for `forwarding_requests.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "forwarding_status", rename_all = "lowercase")]
pub enum ForwardingStatusDb {
    Requested,
    Reviewed,
    Processing,
    Dispatched,
    Delivered,
    Cancelled,
}

impl From<ForwardingStatusDb> for ForwardingStatus {
    fn from(db: ForwardingStatusDb) -> Self {
        match db {
            ForwardingStatusDb::Requested => ForwardingStatus::Requested,
            ForwardingStatusDb::Reviewed => ForwardingStatus::Reviewed,
            ForwardingStatusDb::Processing => ForwardingStatus::Processing,
            ForwardingStatusDb::Dispatched => ForwardingStatus::Dispatched,
            ForwardingStatusDb::Delivered => ForwardingStatus::Delivered,
            ForwardingStatusDb::Cancelled => ForwardingStatus::Cancelled,
        }
    }
}

impl From<ForwardingStatus> for ForwardingStatusDb {
    fn from(status: ForwardingStatus) -> Self {
        match status {
            ForwardingStatus::Requested => ForwardingStatusDb::Requested,
            ForwardingStatus::Reviewed => ForwardingStatusDb::Reviewed,
            ForwardingStatus::Processing => ForwardingStatusDb::Processing,
            ForwardingStatus::Dispatched => ForwardingStatusDb::Dispatched,
            ForwardingStatus::Delivered => ForwardingStatusDb::Delivered,
            ForwardingStatus::Cancelled => ForwardingStatusDb::Cancelled,
        }
    }
}

impl ForwardingStatusDb {
    /// Timestamp column stamped when a request enters this status.
    pub fn timestamp_column(&self) -> Option<&'static str> {
        match self {
            ForwardingStatusDb::Requested => None,
            ForwardingStatusDb::Reviewed => Some("reviewed_at"),
            ForwardingStatusDb::Processing => Some("processing_at"),
            ForwardingStatusDb::Dispatched => Some("dispatched_at"),
            ForwardingStatusDb::Delivered => Some("delivered_at"),
            ForwardingStatusDb::Cancelled => Some("cancelled_at"),
        }
    }
}

/// Database row mapping for the forwarding_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct ForwardingRequestEntity {
    pub id: Uuid,
    pub mail_item_id: Uuid,
    pub user_id: Uuid,
    pub status: ForwardingStatusDb,
    pub to_name: String,
    pub address: String,
    pub courier: Option<String>,
    pub tracking_number: Option<String>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub processing_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<ForwardingRequestEntity> for ForwardingRequest {
    fn from(entity: ForwardingRequestEntity) -> Self {
        Self {
            id: entity.id,
            mail_item_id: entity.mail_item_id,
            user_id: entity.user_id,
            status: entity.status.into(),
            to_name: entity.to_name,
            address: entity.address,
            courier: entity.courier,
            tracking_number: entity.tracking_number,
            admin_notes: entity.admin_notes,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            reviewed_at: entity.reviewed_at,
            processing_at: entity.processing_at,
            dispatched_at: entity.dispatched_at,
            delivered_at: entity.delivered_at,
            cancelled_at: entity.cancelled_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in ForwardingStatus::ALL {
            assert_eq!(ForwardingStatus::from(ForwardingStatusDb::from(status)), status);
        }
    }

    #[test]
    fn test_every_reachable_status_has_timestamp_column() {
        for status in ForwardingStatus::ALL {
            let db = ForwardingStatusDb::from(status);
            assert_eq!(
                db.timestamp_column().is_some(),
                status != ForwardingStatus::Requested
            );
        }
        assert_eq!(
            ForwardingStatusDb::Dispatched.timestamp_column(),
            Some("dispatched_at")
        );
    }
}
