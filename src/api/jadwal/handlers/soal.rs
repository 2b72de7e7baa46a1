use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_jadwal_owner, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::soal::{SoalCreate, SoalResponse};

pub(in crate::api::jadwal) async fn list_soal(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<SoalResponse>>, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let soal = repositories::soal::list_by_jadwal(state.db(), &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list soal"))?;

    Ok(Json(soal.into_iter().map(SoalResponse::from_db).collect()))
}

pub(in crate::api::jadwal) async fn create_soal(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<SoalCreate>,
) -> Result<(StatusCode, Json<SoalResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    payload.check_answer_key().map_err(ApiError::BadRequest)?;
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let urutan = match payload.urutan {
        Some(urutan) => urutan,
        None => repositories::soal::next_order(state.db(), &jadwal.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to compute soal order"))?,
    };

    let SoalCreate { jenis_soal, pertanyaan, opsi, jawaban_benar, skor, .. } = payload;
    let soal = repositories::soal::create(
        state.db(),
        repositories::soal::CreateSoal {
            id: &Uuid::new_v4().to_string(),
            jadwal_id: &jadwal.id,
            urutan,
            jenis_soal,
            pertanyaan: pertanyaan.trim(),
            opsi: opsi.into_iter().map(|option| option.trim().to_string()).collect(),
            jawaban_benar: jawaban_benar.as_deref().map(str::trim),
            skor,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create soal"))?;

    Ok((StatusCode::CREATED, Json(SoalResponse::from_db(soal))))
}

pub(in crate::api::jadwal) async fn delete_soal(
    Path((jadwal_id, soal_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let deleted = repositories::soal::delete(state.db(), &jadwal.id, &soal_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete soal"))?;
    if !deleted {
        return Err(ApiError::NotFound("Soal tidak ditemukan".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
