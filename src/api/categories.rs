use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentTeacher, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Category, User};
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::category::{CategoryResponse, CategoryWrite};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:kategori_id", patch(rename_category).delete(delete_category))
}

async fn list_categories(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryResponse>>, ApiError> {
    let owner = match user.role {
        UserRole::Teacher => Some(user.id.as_str()),
        UserRole::Admin | UserRole::Peserta => None,
    };

    let categories = repositories::categories::list_active(state.db(), owner)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list categories"))?;

    Ok(Json(categories.into_iter().map(CategoryResponse::from_db).collect()))
}

async fn create_category(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<CategoryWrite>,
) -> Result<(StatusCode, Json<CategoryResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let nama = payload.nama.trim();

    ensure_name_free(&state, &teacher.id, nama, None).await?;

    let category = repositories::categories::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        nama,
        &teacher.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create category"))?;

    tracing::info!(
        user_id = %teacher.id,
        kategori_id = %category.id,
        action = "kategori_create",
        "Category created"
    );

    Ok((StatusCode::CREATED, Json(CategoryResponse::from_db(category))))
}

async fn rename_category(
    Path(kategori_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<CategoryWrite>,
) -> Result<Json<CategoryResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let category = require_category_owner(&state, &teacher, &kategori_id).await?;
    let nama = payload.nama.trim();

    ensure_name_free(&state, &category.user_id, nama, Some(&category.id)).await?;

    let renamed =
        repositories::categories::rename(state.db(), &category.id, nama, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to rename category"))?;

    Ok(Json(CategoryResponse::from_db(renamed)))
}

/// Soft delete; schedules keep resolving the category by id.
async fn delete_category(
    Path(kategori_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let category = require_category_owner(&state, &teacher, &kategori_id).await?;

    let deleted =
        repositories::categories::soft_delete(state.db(), &category.id, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to delete category"))?;
    if !deleted {
        return Err(ApiError::NotFound("Kategori tidak ditemukan".to_string()));
    }

    tracing::info!(
        user_id = %teacher.id,
        kategori_id = %category.id,
        action = "kategori_delete",
        "Category soft-deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn require_category_owner(
    state: &AppState,
    user: &User,
    kategori_id: &str,
) -> Result<Category, ApiError> {
    let category = repositories::categories::find_by_id(state.db(), kategori_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch category"))?
        .filter(|category| category.deleted_at.is_none())
        .ok_or_else(|| ApiError::NotFound("Kategori tidak ditemukan".to_string()))?;

    if !user.is_admin() && category.user_id != user.id {
        return Err(ApiError::Forbidden("Anda tidak memiliki akses ke kategori ini"));
    }
    Ok(category)
}

async fn ensure_name_free(
    state: &AppState,
    owner_id: &str,
    nama: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken = repositories::categories::name_taken(state.db(), owner_id, nama, exclude_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check category name"))?;
    if taken {
        return Err(ApiError::Conflict(format!("Kategori '{nama}' sudah ada")));
    }
    Ok(())
}
