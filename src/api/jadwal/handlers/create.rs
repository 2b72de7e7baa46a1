use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::repositories;
use crate::schemas::jadwal::{JadwalCreate, JadwalResponse};
use crate::services::schedule_conflicts::Window;

use super::super::helpers;

pub(in crate::api::jadwal) async fn create_jadwal(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<JadwalCreate>,
) -> Result<(StatusCode, Json<JadwalResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let window = Window::new(
        to_primitive_utc(payload.tanggal_mulai),
        to_primitive_utc(payload.tanggal_berakhir),
    )
    .map_err(helpers::window_error)?;
    let waktu_mulai_tes = payload.waktu_mulai_tes.map(to_primitive_utc);
    window.check_test_start(waktu_mulai_tes).map_err(helpers::window_error)?;

    let nama_jadwal = payload.nama_jadwal.trim();
    if nama_jadwal.is_empty() {
        return Err(ApiError::BadRequest("nama_jadwal must not be empty".to_string()));
    }

    if let Some(kategori_id) = payload.kategori_tes_id.as_deref() {
        helpers::ensure_category(&state, &teacher.id, kategori_id).await?;
    }

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    helpers::lock_owner(&mut tx, &teacher.id).await?;
    helpers::ensure_name_free(&mut tx, &teacher.id, nama_jadwal, None).await?;
    if let Some(predecessor_id) = payload.id_jadwal_sebelumnya.as_deref() {
        helpers::ensure_predecessor(&mut tx, &teacher.id, predecessor_id, None).await?;
    }
    helpers::ensure_no_overlap(&mut tx, &teacher.id, &window, None).await?;

    let kode_jadwal = helpers::generate_kode(&mut tx, nama_jadwal, window.start()).await?;

    let jadwal = repositories::jadwal::create(
        &mut *tx,
        repositories::jadwal::CreateJadwal {
            id: &Uuid::new_v4().to_string(),
            kode_jadwal: &kode_jadwal,
            nama_jadwal,
            tanggal_mulai: window.start(),
            tanggal_berakhir: window.end(),
            waktu_mulai_tes,
            auto_close: payload.auto_close,
            durasi: payload.durasi,
            user_id: &teacher.id,
            id_jadwal_sebelumnya: payload.id_jadwal_sebelumnya.as_deref(),
            kategori_tes_id: payload.kategori_tes_id.as_deref(),
            access_mode: payload.access_mode,
            is_shuffled: payload.is_shuffled,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create jadwal"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        kode_jadwal = %jadwal.kode_jadwal,
        action = "jadwal_create",
        "Jadwal created"
    );

    Ok((StatusCode::CREATED, Json(JadwalResponse::from_db(jadwal))))
}
