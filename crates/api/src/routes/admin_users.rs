//! Admin account management.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use domain::models::user::{AdminListUsersQuery, AdminUpdateUserRequest, User};
use domain::models::{ApiResponse, PagedList};
use persistence::repositories::UserRepository;
use shared::pagination::clamp_limit;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::AdminUser;

/// GET /api/admin/users?search&limit&offset
///
/// `search` matches email, first name, last name or company name.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<AdminListUsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let limit = clamp_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);

    let repo = UserRepository::new(state.pool.clone());
    let items: Vec<User> = repo
        .list(search, limit, offset)
        .await?
        .into_iter()
        .map(User::from)
        .collect();
    let total = repo.count(search).await?;

    Ok(Json(ApiResponse::new(PagedList {
        items,
        total,
        limit,
        offset,
    })))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = UserRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(ApiResponse::new(User::from(user))))
}

/// PATCH /api/admin/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.is_empty() {
        return Err(ApiError::Validation(
            "At least one of plan_status, kyc_status or is_admin is required".into(),
        ));
    }
    if id == admin.id && request.is_admin == Some(false) {
        return Err(ApiError::Validation(
            "Admins cannot remove their own admin access".into(),
        ));
    }

    let user = UserRepository::new(state.pool.clone())
        .admin_update(
            id,
            request.plan_status.map(Into::into),
            request.kyc_status.map(Into::into),
            request.is_admin,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    tracing::info!(
        user_id = %id,
        admin_id = %admin.id,
        plan_status = ?request.plan_status,
        kyc_status = ?request.kyc_status,
        is_admin = ?request.is_admin,
        "User updated by admin"
    );

    Ok(Json(ApiResponse::new(User::from(user))))
}
