use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_bulk_quota, require_jadwal_owner, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::repositories;
use crate::schemas::jadwal::{JadwalBulkDestroy, JadwalResponse, JadwalUpdate};
use crate::schemas::registration::dedupe_ids;
use crate::schemas::AffectedResponse;
use crate::services::schedule_conflicts::Window;

use super::super::helpers;

pub(in crate::api::jadwal) async fn update_jadwal(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<JadwalUpdate>,
) -> Result<Json<JadwalResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;
    let now = primitive_now_utc();

    let tanggal_mulai = payload.tanggal_mulai.map(to_primitive_utc).unwrap_or(jadwal.tanggal_mulai);
    let tanggal_berakhir =
        payload.tanggal_berakhir.map(to_primitive_utc).unwrap_or(jadwal.tanggal_berakhir);
    let dates_changed =
        tanggal_mulai != jadwal.tanggal_mulai || tanggal_berakhir != jadwal.tanggal_berakhir;
    if dates_changed && Window::of(&jadwal).contains(now) {
        return Err(ApiError::BadRequest(
            "Tanggal jadwal yang sedang berlangsung tidak dapat diubah".to_string(),
        ));
    }

    let window = Window::new(tanggal_mulai, tanggal_berakhir).map_err(helpers::window_error)?;
    let waktu_mulai_tes = match payload.waktu_mulai_tes {
        Some(value) => value.map(to_primitive_utc),
        None => jadwal.waktu_mulai_tes,
    };
    window.check_test_start(waktu_mulai_tes).map_err(helpers::window_error)?;

    let nama_jadwal = payload
        .nama_jadwal
        .as_deref()
        .map(str::trim)
        .unwrap_or(jadwal.nama_jadwal.as_str())
        .to_string();
    if nama_jadwal.is_empty() {
        return Err(ApiError::BadRequest("nama_jadwal must not be empty".to_string()));
    }
    let id_jadwal_sebelumnya =
        payload.id_jadwal_sebelumnya.clone().unwrap_or_else(|| jadwal.id_jadwal_sebelumnya.clone());
    let kategori_tes_id =
        payload.kategori_tes_id.clone().unwrap_or_else(|| jadwal.kategori_tes_id.clone());

    if let Some(Some(kategori_id)) = payload.kategori_tes_id.as_ref() {
        helpers::ensure_category(&state, &jadwal.user_id, kategori_id).await?;
    }

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    helpers::lock_owner(&mut tx, &jadwal.user_id).await?;
    helpers::ensure_name_free(&mut tx, &jadwal.user_id, &nama_jadwal, Some(&jadwal.id)).await?;
    if let Some(predecessor_id) = id_jadwal_sebelumnya.as_deref() {
        helpers::ensure_predecessor(&mut tx, &jadwal.user_id, predecessor_id, Some(&jadwal.id))
            .await?;
    }
    helpers::ensure_no_overlap(&mut tx, &jadwal.user_id, &window, Some(&jadwal.id)).await?;

    let updated = repositories::jadwal::update(
        &mut *tx,
        &jadwal.id,
        repositories::jadwal::UpdateJadwal {
            nama_jadwal: &nama_jadwal,
            tanggal_mulai: window.start(),
            tanggal_berakhir: window.end(),
            waktu_mulai_tes,
            auto_close: payload.auto_close.unwrap_or(jadwal.auto_close),
            durasi: payload.durasi.unwrap_or(jadwal.durasi),
            id_jadwal_sebelumnya: id_jadwal_sebelumnya.as_deref(),
            kategori_tes_id: kategori_tes_id.as_deref(),
            access_mode: payload.access_mode.unwrap_or(jadwal.access_mode),
            is_shuffled: payload.is_shuffled.unwrap_or(jadwal.is_shuffled),
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update jadwal"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %updated.id,
        dates_changed,
        action = "jadwal_update",
        "Jadwal updated"
    );

    Ok(Json(JadwalResponse::from_db(updated)))
}

pub(in crate::api::jadwal) async fn delete_jadwal(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;
    let ids = vec![jadwal.id.clone()];

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    ensure_not_referenced(&mut tx, &ids).await?;
    repositories::jadwal::delete_many(&mut *tx, &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete jadwal"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        action = "jadwal_delete",
        "Jadwal deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// All-or-nothing: every id must exist and be manageable by the caller.
pub(in crate::api::jadwal) async fn bulk_destroy_jadwal(
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<JadwalBulkDestroy>,
) -> Result<Json<AffectedResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let ids = dedupe_ids(payload.ids);
    if ids.is_empty() {
        return Err(ApiError::BadRequest("ids must not be empty".to_string()));
    }
    require_bulk_quota(&state, &teacher).await?;

    let owner_filter = if teacher.is_admin() { None } else { Some(teacher.id.as_str()) };

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let found = repositories::jadwal::find_many_for_owner(&mut *tx, &ids, owner_filter)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch jadwal"))?;
    if found.len() != ids.len() {
        return Err(ApiError::NotFound(
            "Sebagian jadwal tidak ditemukan atau bukan milik Anda".to_string(),
        ));
    }

    ensure_not_referenced(&mut tx, &ids).await?;
    let deleted = repositories::jadwal::delete_many(&mut *tx, &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete jadwal"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        deleted,
        action = "jadwal_bulk_delete",
        "Jadwal bulk deleted"
    );

    Ok(Json(AffectedResponse { affected: deleted, message: format!("{deleted} jadwal dihapus") }))
}

async fn ensure_not_referenced(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ids: &[String],
) -> Result<(), ApiError> {
    let successor = repositories::jadwal::find_external_successor(&mut **tx, ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check dependent jadwal"))?;

    match successor {
        Some((successor, predecessor)) => Err(ApiError::Conflict(format!(
            "Jadwal '{predecessor}' masih digunakan sebagai jadwal sebelumnya oleh '{successor}'"
        ))),
        None => Ok(()),
    }
}
