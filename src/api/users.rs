use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentTeacher, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::api::validation::{validate_password_len, validate_username};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user::{AdminUserCreate, ProfileUpdate, UserResponse};

#[derive(Debug, Deserialize)]
pub(crate) struct ParticipantListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
    #[serde(default, alias = "q")]
    search: Option<String>,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/me", get(me).patch(update_me))
        .route("/participants", get(list_participants))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn update_me(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if let Some(email) = payload.email.as_deref() {
        let taken = repositories::users::find_taken_identity(
            state.db(),
            &user.username,
            Some(email),
            Some(&user.id),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check email"))?;
        if taken.is_some() {
            return Err(ApiError::Conflict("A user with this email already exists".to_string()));
        }
    }

    let trimmed = |value: Option<String>| value.map(|value| value.trim().to_string());
    let updated = repositories::users::update_profile(
        state.db(),
        &user.id,
        repositories::users::UpdateProfile {
            nama: trimmed(payload.nama),
            email: trimmed(payload.email),
            alamat: trimmed(payload.alamat),
            no_hp: trimmed(payload.no_hp),
            prodi: trimmed(payload.prodi),
            fakultas: trimmed(payload.fakultas),
            universitas: trimmed(payload.universitas),
            npm: trimmed(payload.npm),
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update profile"))?;

    tracing::info!(user_id = %updated.id, action = "profile_update", "Profile updated");

    Ok(Json(UserResponse::from_db(updated)))
}

async fn list_participants(
    Query(params): Query<ParticipantListQuery>,
    CurrentTeacher(_teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);
    let search = params.search.as_deref().map(str::trim).filter(|value| !value.is_empty());

    let (users, total_count) = repositories::users::list_participants(
        state.db(),
        repositories::users::ListParticipants { search, skip, limit },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list participants"))?;

    Ok(Json(PaginatedResponse {
        items: users.into_iter().map(UserResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}

async fn create_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<AdminUserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_username(&payload.username)?;
    validate_password_len(&payload.password)?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let taken = repositories::users::find_taken_identity(
        state.db(),
        &payload.username,
        payload.email.as_deref(),
        None,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if let Some(field) = taken {
        return Err(ApiError::Conflict(format!("A user with this {field} already exists")));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &payload.username,
            hashed_password,
            role: payload.role,
            nama: payload.nama.trim(),
            email: payload.email.as_deref(),
            is_active: payload.is_active,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    tracing::info!(
        admin_id = %admin.id,
        user_id = %user.id,
        role = ?user.role,
        action = "user_create",
        "User created by admin"
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from_db(user))))
}

#[cfg(test)]
mod tests;
