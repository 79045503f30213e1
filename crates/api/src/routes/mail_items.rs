//! Customer inbox and admin intake of scanned mail.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use domain::models::mail_item::{
    CreateMailItemRequest, ListMailItemsQuery, MailItem, MailItemPage, UpdateMailItemRequest,
};
use domain::models::ApiResponse;
use persistence::repositories::{MailItemRepository, NewMailItem, UserRepository};
use shared::pagination::{clamp_limit, decode_cursor, encode_cursor};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{AdminUser, CurrentUser};

/// GET /api/mail-items?cursor&limit&include_archived
///
/// Newest first. `next_cursor` is present while more items remain.
pub async fn list_mail_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListMailItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = query
        .cursor
        .as_deref()
        .map(decode_cursor)
        .transpose()
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let limit = clamp_limit(query.limit);

    let repo = MailItemRepository::new(state.pool.clone());
    // One extra row tells us whether another page exists.
    let mut rows = repo
        .list_for_user(user.id, cursor, limit + 1, query.include_archived)
        .await?;

    let has_more = rows.len() as i64 > limit;
    rows.truncate(limit as usize);

    let items: Vec<MailItem> = rows.into_iter().map(MailItem::from).collect();
    let next_cursor = if has_more {
        items.last().map(|last| encode_cursor(last.received_at, last.id))
    } else {
        None
    };

    Ok(Json(ApiResponse::new(MailItemPage { items, next_cursor })))
}

/// GET /api/mail-items/:id
pub async fn get_mail_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = MailItemRepository::new(state.pool.clone())
        .find_for_user(id, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Mail item not found".into()))?;

    Ok(Json(ApiResponse::new(MailItem::from(item))))
}

/// PATCH /api/mail-items/:id
pub async fn update_mail_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMailItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;
    if request.is_empty() {
        return Err(ApiError::Validation(
            "At least one of tag, is_read or archived is required".into(),
        ));
    }

    let item = MailItemRepository::new(state.pool.clone())
        .update_for_user(
            id,
            user.id,
            request.tag.as_deref(),
            request.is_read,
            request.archived,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Mail item not found".into()))?;

    Ok(Json(ApiResponse::new(MailItem::from(item))))
}

/// POST /api/admin/mail-items
pub async fn create_mail_item(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateMailItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate()?;

    UserRepository::new(state.pool.clone())
        .find_by_id(request.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let item = MailItemRepository::new(state.pool.clone())
        .create(NewMailItem {
            user_id: request.user_id,
            sender_name: request.sender_name.trim(),
            subject: request.subject.as_deref(),
            tag: request.tag.as_deref().filter(|t| !t.trim().is_empty()),
            scan_url: request.scan_url.as_deref(),
            received_at: request.received_at,
        })
        .await?;

    tracing::info!(
        mail_item_id = %item.id,
        user_id = %item.user_id,
        admin_id = %admin.id,
        "Mail item received"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(MailItem::from(item))),
    ))
}
