use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require_jadwal_owner, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::JadwalStatus;
use crate::repositories;
use crate::schemas::jadwal::JadwalResponse;
use crate::services::jadwal_lifecycle;

pub(in crate::api::jadwal) async fn close_jadwal(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<JadwalResponse>, ApiError> {
    change_status(&state, &teacher, &jadwal_id, JadwalStatus::Tutup).await.map(Json)
}

pub(in crate::api::jadwal) async fn reopen_jadwal(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<JadwalResponse>, ApiError> {
    change_status(&state, &teacher, &jadwal_id, JadwalStatus::Buka).await.map(Json)
}

async fn change_status(
    state: &AppState,
    teacher: &User,
    jadwal_id: &str,
    target: JadwalStatus,
) -> Result<JadwalResponse, ApiError> {
    jadwal_lifecycle::sweep_before_read(state).await;
    let jadwal = require_jadwal_owner(state, teacher, jadwal_id).await?;
    let now = primitive_now_utc();

    jadwal_lifecycle::check_status_change(&jadwal, target, now)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let updated = repositories::jadwal::set_status(state.db(), &jadwal.id, target, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update jadwal status"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %updated.id,
        from = ?jadwal.status,
        to = ?updated.status,
        action = "jadwal_status_change",
        "Jadwal status changed manually"
    );

    Ok(JadwalResponse::from_db(updated))
}
