//! Domain services for Virtual Address Hub.
//!
//! Pure business rules that operate on domain models; no I/O.

pub mod billing_sync;
pub mod compliance;
pub mod kyc_sync;

pub use billing_sync::{
    classify_gocardless_event, classify_stripe_event, plan_status_for_subscription,
    GoCardlessAction, StripeAction,
};
pub use compliance::{check_registered_office_access, ComplianceError};
pub use kyc_sync::kyc_status_for_sumsub;
