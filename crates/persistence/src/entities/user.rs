//! User and session entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::user::{KycStatus, PlanStatus, User};

/// Database enum for `users.plan_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "plan_status", rename_all = "snake_case")]
pub enum PlanStatusDb {
    None,
    Active,
    PastDue,
    Cancelled,
}

impl From<PlanStatusDb> for PlanStatus {
    fn from(db: PlanStatusDb) -> Self {
        match db {
            PlanStatusDb::None => PlanStatus::None,
            PlanStatusDb::Active => PlanStatus::Active,
            PlanStatusDb::PastDue => PlanStatus::PastDue,
            PlanStatusDb::Cancelled => PlanStatus::Cancelled,
        }
    }
}

impl From<PlanStatus> for PlanStatusDb {
    fn from(status: PlanStatus) -> Self {
        match status {
            PlanStatus::None => PlanStatusDb::None,
            PlanStatus::Active => PlanStatusDb::Active,
            PlanStatus::PastDue => PlanStatusDb::PastDue,
            PlanStatus::Cancelled => PlanStatusDb::Cancelled,
        }
    }
}

/// Database enum for `users.kyc_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "kyc_status", rename_all = "snake_case")]
pub enum KycStatusDb {
    NotStarted,
    Pending,
    Verified,
    Rejected,
}

impl From<KycStatusDb> for KycStatus {
    fn from(db: KycStatusDb) -> Self {
        match db {
            KycStatusDb::NotStarted => KycStatus::NotStarted,
            KycStatusDb::Pending => KycStatus::Pending,
            KycStatusDb::Verified => KycStatus::Verified,
            KycStatusDb::Rejected => KycStatus::Rejected,
        }
    }
}

impl From<KycStatus> for KycStatusDb {
    fn from(status: KycStatus) -> Self {
        match status {
            KycStatus::NotStarted => KycStatusDb::NotStarted,
            KycStatus::Pending => KycStatusDb::Pending,
            KycStatus::Verified => KycStatusDb::Verified,
            KycStatus::Rejected => KycStatusDb::Rejected,
        }
    }
}

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub is_admin: bool,
    pub plan_status: PlanStatusDb,
    pub kyc_status: KycStatusDb,
    pub stripe_customer_id: Option<String>,
    pub gocardless_mandate_id: Option<String>,
    pub sumsub_applicant_id: Option<String>,
    pub email_bounced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            first_name: entity.first_name,
            last_name: entity.last_name,
            company_name: entity.company_name,
            is_admin: entity.is_admin,
            plan_status: entity.plan_status.into(),
            kyc_status: entity.kyc_status.into(),
            email_bounced_at: entity.email_bounced_at,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl SessionEntity {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user_entity() -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            email: "jane@example.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            company_name: None,
            is_admin: false,
            plan_status: PlanStatusDb::PastDue,
            kyc_status: KycStatusDb::Verified,
            stripe_customer_id: Some("cus_123".to_string()),
            gocardless_mandate_id: None,
            sumsub_applicant_id: None,
            email_bounced_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_entity_to_domain() {
        let entity = user_entity();
        let id = entity.id;
        let user: User = entity.into();
        assert_eq!(user.id, id);
        assert_eq!(user.plan_status, PlanStatus::PastDue);
        assert_eq!(user.kyc_status, KycStatus::Verified);
        assert_eq!(user.display_name(), "Jane Doe");
    }

    #[test]
    fn test_status_conversions_roundtrip() {
        for status in [
            PlanStatus::None,
            PlanStatus::Active,
            PlanStatus::PastDue,
            PlanStatus::Cancelled,
        ] {
            assert_eq!(PlanStatus::from(PlanStatusDb::from(status)), status);
        }
        for status in [
            KycStatus::NotStarted,
            KycStatus::Pending,
            KycStatus::Verified,
            KycStatus::Rejected,
        ] {
            assert_eq!(KycStatus::from(KycStatusDb::from(status)), status);
        }
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = SessionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "ab".repeat(32),
            expires_at: now + Duration::hours(1),
            created_at: now,
            last_seen_at: now,
        };
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(2)));
    }
}
