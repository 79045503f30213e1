//! Customer and staff account models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Subscription state as last reported by the billing providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    None,
    Active,
    PastDue,
    Cancelled,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::None => "none",
            PlanStatus::Active => "active",
            PlanStatus::PastDue => "past_due",
            PlanStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PlanStatus::None),
            "active" => Ok(PlanStatus::Active),
            "past_due" => Ok(PlanStatus::PastDue),
            "cancelled" => Ok(PlanStatus::Cancelled),
            other => Err(format!("unknown plan status '{}'", other)),
        }
    }
}

/// Identity verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotStarted,
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::NotStarted => "not_started",
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account. The password hash never leaves the persistence layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub is_admin: bool,
    pub plan_status: PlanStatus,
    pub kyc_status: KycStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_bounced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Signup request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email too long"))]
    pub email: String,

    #[validate(custom(function = "shared::validation::validate_password_strength"))]
    #[validate(length(max = 128, message = "Password too long"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,

    #[validate(length(max = 200, message = "Company name too long"))]
    pub company_name: Option<String>,
}

/// Login request body.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

/// Admin update of account flags. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminUpdateUserRequest {
    pub plan_status: Option<PlanStatus>,
    pub kyc_status: Option<KycStatus>,
    pub is_admin: Option<bool>,
}

impl AdminUpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.plan_status.is_none() && self.kyc_status.is_none() && self.is_admin.is_none()
    }
}

/// Query parameters for the admin user list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdminListUsersQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// KYC status as shown to the customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct KycStatusResponse {
    pub status: KycStatus,
    pub verified: bool,
}

impl From<KycStatus> for KycStatusResponse {
    fn from(status: KycStatus) -> Self {
        Self {
            status,
            verified: status == KycStatus::Verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::{FirstName, LastName};
    use fake::Fake;

    fn signup() -> SignupRequest {
        SignupRequest {
            email: SafeEmail().fake(),
            password: "correcthorse42".to_string(),
            first_name: FirstName().fake(),
            last_name: LastName().fake(),
            company_name: Some("Acme Ltd".to_string()),
        }
    }

    #[test]
    fn test_signup_valid() {
        assert!(signup().validate().is_ok());
    }

    #[test]
    fn test_signup_rejects_bad_email() {
        let req = SignupRequest {
            email: "not-an-email".to_string(),
            ..signup()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_signup_rejects_weak_password() {
        let req = SignupRequest {
            password: "password".to_string(),
            ..signup()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_plan_status_roundtrip_str() {
        for status in [
            PlanStatus::None,
            PlanStatus::Active,
            PlanStatus::PastDue,
            PlanStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<PlanStatus>(), Ok(status));
        }
        assert!("trialing".parse::<PlanStatus>().is_err());
    }

    #[test]
    fn test_kyc_serde() {
        assert_eq!(
            serde_json::to_string(&KycStatus::NotStarted).unwrap(),
            "\"not_started\""
        );
    }

    #[test]
    fn test_kyc_status_response() {
        assert!(KycStatusResponse::from(KycStatus::Verified).verified);
        assert!(!KycStatusResponse::from(KycStatus::Pending).verified);
    }

    #[test]
    fn test_admin_update_is_empty() {
        assert!(AdminUpdateUserRequest::default().is_empty());
        let req = AdminUpdateUserRequest {
            is_admin: Some(true),
            ..Default::default()
        };
        assert!(!req.is_empty());
    }
}
