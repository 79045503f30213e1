//! Customer account views: billing, KYC and the registered office address.

use axum::{extract::State, response::IntoResponse, Json};
use domain::models::billing::{BillingOverview, Invoice};
use domain::models::user::KycStatusResponse;
use domain::models::ApiResponse;
use domain::services::check_registered_office_access;
use persistence::repositories::InvoiceRepository;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

/// GET /api/billing/overview
pub async fn billing_overview(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let latest = InvoiceRepository::new(state.pool.clone())
        .latest_for_user(user.id)
        .await?
        .map(Invoice::from);

    Ok(Json(ApiResponse::new(BillingOverview::new(
        user.plan_status,
        latest,
    ))))
}

/// GET /api/billing/invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let invoices: Vec<Invoice> = InvoiceRepository::new(state.pool.clone())
        .list_for_user(user.id)
        .await?
        .into_iter()
        .map(Invoice::from)
        .collect();

    Ok(Json(ApiResponse::new(invoices)))
}

/// GET /api/kyc/status
pub async fn kyc_status(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(ApiResponse::new(KycStatusResponse::from(user.kyc_status)))
}

/// GET /api/profile/registered-office-address
///
/// KYC is checked before billing, so an unverified customer always sees
/// `KYC_REQUIRED` first.
pub async fn registered_office_address(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(denied) = check_registered_office_access(user.kyc_status, user.plan_status) {
        tracing::info!(
            user_id = %user.id,
            reason = %denied,
            "Registered office address withheld"
        );
        return Err(denied.into());
    }

    Ok(Json(ApiResponse::new(
        state.config.registered_office.clone(),
    )))
}
