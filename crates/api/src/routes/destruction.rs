//! Recording destroyed mail and the destruction log.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::models::destruction::{
    validate_staff_attribution, DestroyMailItemRequest, DestructionLog,
};
use domain::models::mail_item::MailItemStatus;
use domain::models::{ApiResponse, PagedList};
use persistence::repositories::{DestroyOutcome, DestructionLogRepository, NewDestruction};
use serde::Deserialize;
use shared::pagination::clamp_limit;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminUser;
use crate::middleware::metrics::record_mail_item_destroyed;

#[derive(Debug, Default, Deserialize)]
pub struct DestructionLogQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// POST /api/admin/mail-items/:id/destroy
///
/// Attribution is checked before the database is touched.
pub async fn destroy_mail_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(mail_item_id): Path<Uuid>,
    Json(request): Json<DestroyMailItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_staff_attribution(&request.staff_name, &request.staff_initials)?;
    request.validate()?;

    let outcome = DestructionLogRepository::new(state.pool.clone())
        .destroy(NewDestruction {
            mail_item_id,
            staff_name: request.staff_name.trim(),
            staff_initials: request.staff_initials.trim(),
            notes: request.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            recorded_by: admin.id,
        })
        .await?;

    match outcome {
        DestroyOutcome::Destroyed(entry) => {
            record_mail_item_destroyed();
            tracing::info!(
                mail_item_id = %mail_item_id,
                staff_initials = %entry.staff_initials,
                admin_id = %admin.id,
                "Mail item destroyed"
            );
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::new(DestructionLog::from(entry))),
            ))
        }
        DestroyOutcome::MailItemNotFound => Err(ApiError::NotFound("Mail item not found".into())),
        DestroyOutcome::NotOnHand(status) => Err(ApiError::Conflict(format!(
            "Mail item has already been {}",
            MailItemStatus::from(status).as_str()
        ))),
        DestroyOutcome::ForwardingOpen => Err(ApiError::Conflict(
            "Mail item has an open forwarding request; cancel it first".into(),
        )),
    }
}

/// GET /api/admin/destruction-logs?limit&offset
pub async fn list_destruction_logs(
    State(state): State<AppState>,
    Query(query): Query<DestructionLogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);

    let repo = DestructionLogRepository::new(state.pool.clone());
    let items: Vec<DestructionLog> = repo
        .list(limit, offset)
        .await?
        .into_iter()
        .map(DestructionLog::from)
        .collect();
    let total = repo.count().await?;

    Ok(Json(ApiResponse::new(PagedList {
        items,
        total,
        limit,
        offset,
    })))
}
