use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{can_manage_jadwal, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::jadwal::ListScope;
use crate::schemas::jadwal::{JadwalResponse, JadwalSummaryResponse};
use crate::services::jadwal_lifecycle;

use super::super::queries::ListJadwalQuery;

pub(in crate::api::jadwal) async fn list_jadwal(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<ListJadwalQuery>,
) -> Result<Json<PaginatedResponse<JadwalSummaryResponse>>, ApiError> {
    jadwal_lifecycle::sweep_before_read(&state).await;

    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);
    let scope = match user.role {
        UserRole::Admin => ListScope::All,
        UserRole::Teacher => ListScope::Owner(&user.id),
        UserRole::Peserta => ListScope::Participant(&user.id),
    };
    let search = params.search.as_deref().map(str::trim).filter(|value| !value.is_empty());

    let rows = repositories::jadwal::list_summaries(
        state.db(),
        repositories::jadwal::ListJadwalParams {
            scope,
            status: params.status,
            kategori_tes_id: params.kategori_tes_id.as_deref(),
            search,
            skip,
            limit,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list jadwal"))?;

    let total_count = rows.first().map(|row| row.total_count).unwrap_or(0);
    let items = rows.into_iter().map(JadwalSummaryResponse::from_row).collect();

    Ok(Json(PaginatedResponse { items, total_count, skip, limit }))
}

pub(in crate::api::jadwal) async fn get_jadwal(
    Path(jadwal_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<JadwalResponse>, ApiError> {
    jadwal_lifecycle::sweep_before_read(&state).await;

    let jadwal = repositories::jadwal::find_by_id(state.db(), &jadwal_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch jadwal"))?
        .ok_or_else(|| ApiError::NotFound("Jadwal tidak ditemukan".to_string()))?;

    if user.role == UserRole::Teacher && !can_manage_jadwal(&user, &jadwal) {
        return Err(ApiError::Forbidden("Anda tidak memiliki akses ke jadwal ini"));
    }

    Ok(Json(JadwalResponse::from_db(jadwal)))
}
