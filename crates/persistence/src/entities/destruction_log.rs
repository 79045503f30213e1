//! Destruction log entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::destruction::DestructionLog;

/// Database row mapping for the destruction_logs table.
#[derive(Debug, Clone, FromRow)]
pub struct DestructionLogEntity {
    pub id: Uuid,
    pub mail_item_id: Uuid,
    pub user_id: Uuid,
    pub staff_name: String,
    pub staff_initials: String,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub destroyed_at: DateTime<Utc>,
}

impl From<DestructionLogEntity> for DestructionLog {
    fn from(entity: DestructionLogEntity) -> Self {
        Self {
            id: entity.id,
            mail_item_id: entity.mail_item_id,
            user_id: entity.user_id,
            staff_name: entity.staff_name,
            staff_initials: entity.staff_initials,
            notes: entity.notes,
            recorded_by: entity.recorded_by,
            destroyed_at: entity.destroyed_at,
        }
    }
}
