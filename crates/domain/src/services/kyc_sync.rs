//! Maps Sumsub applicant events onto KYC status.

use crate::models::user::KycStatus;
use crate::models::webhook::{sumsub_event_type, SumsubWebhook};

/// New KYC status for the event, or `None` when the event carries no status
/// change we act on.
pub fn kyc_status_for_sumsub(hook: &SumsubWebhook) -> Option<KycStatus> {
    match hook.event_type.as_str() {
        sumsub_event_type::APPLICANT_REVIEWED => {
            match hook.review_result.as_ref()?.review_answer.as_str() {
                "GREEN" => Some(KycStatus::Verified),
                "RED" => Some(KycStatus::Rejected),
                _ => None,
            }
        }
        sumsub_event_type::APPLICANT_PENDING | sumsub_event_type::APPLICANT_CREATED => {
            Some(KycStatus::Pending)
        }
        _ => None,
    }
}
