use sqlx::{Postgres, Transaction};
use time::PrimitiveDateTime;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db;
use crate::repositories;
use crate::services::kode_jadwal;
use crate::services::schedule_conflicts::{self, Window, WindowError};

pub(super) fn window_error(err: WindowError) -> ApiError {
    ApiError::BadRequest(err.to_string())
}

/// Serialises schedule writes of one owner for the rest of the transaction.
pub(super) async fn lock_owner(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: &str,
) -> Result<(), ApiError> {
    db::advisory_xact_lock(&mut **tx, &format!("jadwal-owner:{owner_id}"))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock schedule owner"))
}

pub(super) async fn ensure_name_free(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: &str,
    nama_jadwal: &str,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let taken = repositories::jadwal::name_taken(&mut **tx, owner_id, nama_jadwal, exclude_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check jadwal name"))?;
    if taken {
        return Err(ApiError::Conflict(format!("Nama jadwal '{nama_jadwal}' sudah digunakan")));
    }
    Ok(())
}

pub(super) async fn ensure_no_overlap(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: &str,
    window: &Window,
    exclude_id: Option<&str>,
) -> Result<(), ApiError> {
    let candidates = repositories::jadwal::list_overlap_candidates(
        &mut **tx,
        owner_id,
        window.start(),
        window.end(),
        exclude_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check schedule conflicts"))?;

    match schedule_conflicts::first_conflict(window, &candidates, exclude_id) {
        Some(existing) => Err(ApiError::Conflict(format!(
            "Jadwal bentrok dengan jadwal '{}'",
            existing.nama_jadwal
        ))),
        None => Ok(()),
    }
}

pub(super) async fn ensure_predecessor(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: &str,
    predecessor_id: &str,
    self_id: Option<&str>,
) -> Result<(), ApiError> {
    if Some(predecessor_id) == self_id {
        return Err(ApiError::BadRequest(
            "Jadwal tidak dapat menjadi jadwal sebelumnya untuk dirinya sendiri".to_string(),
        ));
    }

    let predecessor = repositories::jadwal::find_by_id(&mut **tx, predecessor_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch predecessor jadwal"))?
        .ok_or_else(|| ApiError::BadRequest("Jadwal sebelumnya tidak ditemukan".to_string()))?;

    if predecessor.user_id != owner_id {
        return Err(ApiError::BadRequest(
            "Jadwal sebelumnya harus milik pengajar yang sama".to_string(),
        ));
    }
    Ok(())
}

pub(super) async fn ensure_category(
    state: &AppState,
    owner_id: &str,
    kategori_id: &str,
) -> Result<(), ApiError> {
    let category =
        repositories::categories::find_active_for_owner(state.db(), kategori_id, owner_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch category"))?;
    if category.is_none() {
        return Err(ApiError::BadRequest("Kategori tes tidak ditemukan".to_string()));
    }
    Ok(())
}

/// Next free `kode_jadwal` for the name/year stem, under a per-stem lock.
pub(super) async fn generate_kode(
    tx: &mut Transaction<'_, Postgres>,
    nama_jadwal: &str,
    tanggal_mulai: PrimitiveDateTime,
) -> Result<String, ApiError> {
    let stem = kode_jadwal::kode_stem(nama_jadwal, tanggal_mulai);
    db::advisory_xact_lock(&mut **tx, &format!("jadwal-kode:{stem}"))
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock kode sequence"))?;

    let latest = repositories::jadwal::latest_kode_with_stem(&mut **tx, &stem)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to read kode sequence"))?;

    kode_jadwal::next_kode(&stem, latest.as_deref()).ok_or_else(|| {
        ApiError::Conflict(format!("Nomor urut kode jadwal {stem} sudah habis"))
    })
}
