//! Mail item entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::mail_item::{MailItem, MailItemStatus};

/// Database enum for `mail_items.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "mail_item_status", rename_all = "lowercase")]
pub enum MailItemStatusDb {
    Received,
    Forwarded,
    Destroyed,
}

impl From<MailItemStatusDb> for MailItemStatus {
    fn from(db: MailItemStatusDb) -> Self {
        match db {
            MailItemStatusDb::Received => MailItemStatus::Received,
            MailItemStatusDb::Forwarded => MailItemStatus::Forwarded,
            MailItemStatusDb::Destroyed => MailItemStatus::Destroyed,
        }
    }
}

/// Database row mapping for the mail_items table.
#[derive(Debug, Clone, FromRow)]
pub struct MailItemEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sender_name: String,
    pub subject: Option<String>,
    pub tag: Option<String>,
    pub scan_url: Option<String>,
    pub status: MailItemStatusDb,
    pub is_read: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MailItemEntity> for MailItem {
    fn from(entity: MailItemEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            sender_name: entity.sender_name,
            subject: entity.subject,
            tag: entity.tag,
            scan_url: entity.scan_url,
            status: entity.status.into(),
            is_read: entity.is_read,
            archived: entity.archived_at.is_some(),
            received_at: entity.received_at,
            updated_at: entity.updated_at,
        }
    }
}
