//! Registered office access gate.
//!
//! A customer may only publish the registered office address once their
//! identity is verified and their plan is paid up. KYC is checked first so a
//! customer who is neither verified nor paying is told to verify.

use thiserror::Error;

use crate::models::user::{KycStatus, PlanStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ComplianceError {
    #[error("identity verification must be completed first")]
    KycRequired,
    #[error("an active subscription is required")]
    BillingRequired,
}

pub fn check_registered_office_access(
    kyc_status: KycStatus,
    plan_status: PlanStatus,
) -> Result<(), ComplianceError> {
    if kyc_status != KycStatus::Verified {
        return Err(ComplianceError::KycRequired);
    }
    if plan_status != PlanStatus::Active {
        return Err(ComplianceError::BillingRequired);
    }
    Ok(())
}
