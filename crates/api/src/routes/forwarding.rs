//! Forwarding requests: customer creation and listing, admin queue and
//! status actions.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::models::forwarding::{
    resolve_transition, AdminListForwardingQuery, CreateForwardingRequest, ForwardingAction,
    ForwardingActionRequest, ForwardingActionResponse, ForwardingRequest, ForwardingStatus,
};
use domain::models::mail_item::MailItemStatus;
use domain::models::{ApiResponse, PagedList};
use persistence::entities::ForwardingStatusDb;
use persistence::repositories::{
    CreateForwardingOutcome, ForwardingRequestRepository, TransitionOutcome,
};
use shared::pagination::clamp_limit;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};
use crate::middleware::metrics::record_forwarding_transition;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

/// POST /api/forwarding/requests
pub async fn create_forwarding_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateForwardingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    let repo = ForwardingRequestRepository::new(state.pool.clone());
    let outcome = repo
        .create(user.id, request.mail_item_id, &request.to_name, &request.address)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict(
                    "An open forwarding request already exists for this mail item".into(),
                )
            } else {
                e.into()
            }
        })?;

    match outcome {
        CreateForwardingOutcome::Created(entity) => {
            tracing::info!(
                forwarding_request_id = %entity.id,
                mail_item_id = %entity.mail_item_id,
                user_id = %user.id,
                "Forwarding requested"
            );
            let body = ForwardingRequest::from(entity).for_customer();
            Ok((StatusCode::CREATED, Json(ApiResponse::new(body))))
        }
        CreateForwardingOutcome::MailItemNotFound => {
            Err(ApiError::NotFound("Mail item not found".into()))
        }
        CreateForwardingOutcome::MailItemUnavailable(status) => Err(ApiError::Conflict(format!(
            "Mail item has already been {}",
            MailItemStatus::from(status).as_str()
        ))),
    }
}

/// GET /api/forwarding/requests
pub async fn list_forwarding_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests: Vec<ForwardingRequest> = ForwardingRequestRepository::new(state.pool.clone())
        .list_for_user(user.id)
        .await?
        .into_iter()
        .map(|entity| ForwardingRequest::from(entity).for_customer())
        .collect();

    Ok(Json(ApiResponse::new(requests)))
}

/// GET /api/forwarding/requests/:id
pub async fn get_forwarding_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entity = ForwardingRequestRepository::new(state.pool.clone())
        .find_for_user(id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Forwarding request not found".into()))?;

    Ok(Json(ApiResponse::new(
        ForwardingRequest::from(entity).for_customer(),
    )))
}

/// GET /api/admin/forwarding/requests?status&limit&offset
///
/// Oldest first, so the queue is worked in arrival order.
pub async fn admin_list_forwarding_requests(
    State(state): State<AppState>,
    Query(query): Query<AdminListForwardingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status: Option<ForwardingStatusDb> = query
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<ForwardingStatus>())
        .transpose()
        .map_err(ApiError::Validation)?
        .map(ForwardingStatusDb::from);
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);

    let repo = ForwardingRequestRepository::new(state.pool.clone());
    let items: Vec<ForwardingRequest> = repo
        .list(status, limit, offset)
        .await?
        .into_iter()
        .map(ForwardingRequest::from)
        .collect();
    let total = repo.count(status).await?;

    Ok(Json(ApiResponse::new(PagedList {
        items,
        total,
        limit,
        offset,
    })))
}

/// GET /api/admin/forwarding/requests/:id
pub async fn admin_get_forwarding_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entity = ForwardingRequestRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Forwarding request not found".into()))?;

    Ok(Json(ApiResponse::new(ForwardingRequest::from(entity))))
}

/// PATCH /api/admin/forwarding/requests/:id
///
/// Illegal or unknown actions are rejected before any write. The update only
/// lands if the row is still in the status we read; otherwise 409.
pub async fn admin_update_forwarding_request(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ForwardingActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = ForwardingRequestRepository::new(state.pool.clone());
    let current = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Forwarding request not found".into()))?;

    let from = ForwardingStatus::from(current.status);
    let (action, to) = resolve_transition(from, &request.action).map_err(|e| {
        tracing::info!(
            forwarding_request_id = %id,
            from = %from,
            action = %request.action,
            "Rejected forwarding transition"
        );
        ApiError::from(e)
    })?;

    // Dispatch fields only matter, and are only checked, on mark_dispatched.
    if action == ForwardingAction::MarkDispatched {
        request.validate()?;
    }

    let details = request.dispatch_details(action);
    let outcome = repo
        .apply_transition(id, current.status, to.into(), details.as_ref())
        .await?;

    let updated = match outcome {
        TransitionOutcome::Applied(entity) => entity,
        TransitionOutcome::Stale => {
            tracing::warn!(
                forwarding_request_id = %id,
                expected = %from,
                action = %action,
                "Forwarding request changed concurrently"
            );
            return Err(ApiError::Conflict(
                "Forwarding request was updated by someone else; reload and retry".into(),
            ));
        }
    };

    record_forwarding_transition(action.as_str());
    tracing::info!(
        forwarding_request_id = %id,
        from = %from,
        to = %to,
        admin_id = %admin.id,
        "Forwarding request transitioned"
    );

    Ok(Json(ApiResponse::new(ForwardingActionResponse {
        previous_status: from,
        request: ForwardingRequest::from(updated),
        allowed_actions: to.allowed_actions(),
    })))
}
