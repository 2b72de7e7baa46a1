use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_bulk_quota, require_jadwal_owner, CurrentPeserta, CurrentTeacher};
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{Registration, User};
use crate::db::types::{JadwalStatus, RegistrationMethod, RegistrationStatus, UserRole};
use crate::repositories;
use crate::repositories::registrations::{Decision, InsertRegistration};
use crate::schemas::registration::{
    dedupe_ids, BulkRegisterEntry, BulkRegisterResponse, BulkRegistrationAction,
    RegistrationListItem, RegistrationResponse, RejectRequest, ResumePermission, TeacherRegister,
};
use crate::schemas::AffectedResponse;
use crate::services::{jadwal_lifecycle, profile};

#[derive(Debug, Default, Deserialize)]
pub(super) struct ListRegistrationsQuery {
    status: Option<RegistrationStatus>,
}

pub(super) async fn list_registrations(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Query(params): Query<ListRegistrationsQuery>,
) -> Result<Json<Vec<RegistrationListItem>>, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let rows = repositories::registrations::list_for_jadwal(state.db(), &jadwal.id, params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list registrations"))?;

    Ok(Json(rows.into_iter().map(RegistrationListItem::from_row).collect()))
}

pub(super) async fn register_self(
    Path(jadwal_id): Path<String>,
    CurrentPeserta(peserta): CurrentPeserta,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RegistrationResponse>), ApiError> {
    let missing = profile::missing_fields(&peserta);
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Lengkapi profil Anda sebelum mendaftar. Data yang belum diisi: {}",
            missing.join(", ")
        )));
    }

    jadwal_lifecycle::sweep_before_read(&state).await;

    let jadwal = repositories::jadwal::find_by_id(state.db(), &jadwal_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch jadwal"))?
        .ok_or_else(|| ApiError::NotFound("Jadwal tidak ditemukan".to_string()))?;

    if jadwal.status != JadwalStatus::Buka {
        return Err(ApiError::BadRequest("Jadwal tidak dibuka untuk pendaftaran".to_string()));
    }

    let registration = repositories::registrations::insert_if_absent(
        state.db(),
        InsertRegistration {
            id: &Uuid::new_v4().to_string(),
            jadwal_id: &jadwal.id,
            peserta_id: &peserta.id,
            status: RegistrationStatus::Menunggu,
            method: RegistrationMethod::Mandiri,
            registered_at: primitive_now_utc(),
            approved_by: None,
            approved_at: None,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create registration"))?
    .ok_or_else(|| ApiError::Conflict("Anda sudah terdaftar pada jadwal ini".to_string()))?;

    metrics::record_registrations(1, RegistrationMethod::Mandiri.as_str());
    tracing::info!(
        user_id = %peserta.id,
        jadwal_id = %jadwal.id,
        registration_id = %registration.id,
        action = "registration_self",
        "Peserta registered for jadwal"
    );

    Ok((StatusCode::CREATED, Json(RegistrationResponse::from_db(registration))))
}

/// Best effort: each id is handled on its own and reported in one of the buckets.
pub(super) async fn register_by_teacher(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<TeacherRegister>,
) -> Result<Json<BulkRegisterResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;
    require_bulk_quota(&state, &teacher).await?;

    let ids = dedupe_ids(payload.peserta_ids);
    let roles: HashMap<String, UserRole> = repositories::users::roles_by_ids(state.db(), &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resolve participants"))?
        .into_iter()
        .collect();
    let existing: HashMap<String, RegistrationStatus> =
        repositories::registrations::registered_peserta_ids(state.db(), &jadwal.id, &ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to read registrations"))?
            .into_iter()
            .collect();

    let now = primitive_now_utc();
    let mut summary = BulkRegisterResponse::default();

    for peserta_id in ids {
        if let Some(status) = existing.get(&peserta_id) {
            summary.skipped.push(BulkRegisterEntry {
                reason: format!("Sudah terdaftar dengan status {}", status.as_str()),
                peserta_id,
            });
            continue;
        }

        match roles.get(&peserta_id) {
            None => {
                summary.failed.push(BulkRegisterEntry {
                    peserta_id,
                    reason: "Pengguna tidak ditemukan".to_string(),
                });
                continue;
            }
            Some(role) if *role != UserRole::Peserta => {
                summary.failed.push(BulkRegisterEntry {
                    peserta_id,
                    reason: "Pengguna bukan peserta".to_string(),
                });
                continue;
            }
            Some(_) => {}
        }

        let inserted = repositories::registrations::insert_if_absent(
            state.db(),
            InsertRegistration {
                id: &Uuid::new_v4().to_string(),
                jadwal_id: &jadwal.id,
                peserta_id: &peserta_id,
                status: RegistrationStatus::Disetujui,
                method: RegistrationMethod::Teacher,
                registered_at: now,
                approved_by: Some(&teacher.id),
                approved_at: Some(now),
            },
        )
        .await;

        match inserted {
            Ok(Some(_)) => summary.success_count += 1,
            Ok(None) => summary.skipped.push(BulkRegisterEntry {
                peserta_id,
                reason: "Sudah terdaftar".to_string(),
            }),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    jadwal_id = %jadwal.id,
                    peserta_id = %peserta_id,
                    "Teacher registration insert failed"
                );
                summary.failed.push(BulkRegisterEntry {
                    peserta_id,
                    reason: "Gagal menyimpan pendaftaran".to_string(),
                });
            }
        }
    }

    metrics::record_registrations(summary.success_count, RegistrationMethod::Teacher.as_str());
    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        success = summary.success_count,
        skipped = summary.skipped.len(),
        failed = summary.failed.len(),
        action = "registration_teacher",
        "Teacher registered peserta"
    );

    Ok(Json(summary.summarize()))
}

pub(super) async fn approve(
    Path((jadwal_id, registration_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    decide_one(&state, &teacher, &jadwal_id, &registration_id, RegistrationStatus::Disetujui, None)
        .await
        .map(Json)
}

pub(super) async fn reject(
    Path((jadwal_id, registration_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    payload: Option<Json<RejectRequest>>,
) -> Result<Json<RegistrationResponse>, ApiError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    decide_one(
        &state,
        &teacher,
        &jadwal_id,
        &registration_id,
        RegistrationStatus::Ditolak,
        payload.keterangan.as_deref(),
    )
    .await
    .map(Json)
}

async fn find_registration(
    state: &AppState,
    jadwal_id: &str,
    registration_id: &str,
) -> Result<Registration, ApiError> {
    repositories::registrations::find_in_jadwal(state.db(), jadwal_id, registration_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch registration"))?
        .ok_or_else(|| ApiError::NotFound("Pendaftaran tidak ditemukan".to_string()))
}

async fn decide_one(
    state: &AppState,
    teacher: &User,
    jadwal_id: &str,
    registration_id: &str,
    status: RegistrationStatus,
    note: Option<&str>,
) -> Result<RegistrationResponse, ApiError> {
    let jadwal = require_jadwal_owner(state, teacher, jadwal_id).await?;
    let current = find_registration(state, &jadwal.id, registration_id).await?;

    let registration = repositories::registrations::decide(
        state.db(),
        &jadwal.id,
        &current.id,
        Decision { status, decided_by: &teacher.id, decided_at: primitive_now_utc(), note },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update registration"))?
    .ok_or_else(|| ApiError::NotFound("Pendaftaran tidak ditemukan".to_string()))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        registration_id = %registration.id,
        previous = current.status.as_str(),
        status = status.as_str(),
        action = "registration_decide",
        "Registration decided"
    );

    Ok(RegistrationResponse::from_db(registration))
}

pub(super) async fn bulk_approve(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<BulkRegistrationAction>,
) -> Result<Json<AffectedResponse>, ApiError> {
    bulk_decide(&state, &teacher, &jadwal_id, payload, RegistrationStatus::Disetujui)
        .await
        .map(Json)
}

pub(super) async fn bulk_reject(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<BulkRegistrationAction>,
) -> Result<Json<AffectedResponse>, ApiError> {
    bulk_decide(&state, &teacher, &jadwal_id, payload, RegistrationStatus::Ditolak)
        .await
        .map(Json)
}

/// Only registrations still waiting for a decision move.
async fn bulk_decide(
    state: &AppState,
    teacher: &User,
    jadwal_id: &str,
    payload: BulkRegistrationAction,
    status: RegistrationStatus,
) -> Result<AffectedResponse, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let jadwal = require_jadwal_owner(state, teacher, jadwal_id).await?;
    require_bulk_quota(state, teacher).await?;

    let ids = dedupe_ids(payload.ids);
    let note = match status {
        RegistrationStatus::Ditolak => payload.keterangan.as_deref(),
        _ => None,
    };
    let affected = repositories::registrations::decide_pending(
        state.db(),
        &jadwal.id,
        &ids,
        Decision {
            status,
            decided_by: &teacher.id,
            decided_at: primitive_now_utc(),
            note,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update registrations"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        status = status.as_str(),
        affected,
        action = "registration_bulk_decide",
        "Registrations decided in bulk"
    );

    Ok(AffectedResponse {
        affected,
        message: format!("{affected} pendaftaran diubah menjadi {}", status.as_str()),
    })
}

/// Lets a participant whose attempt was cut off by a proctoring event enter
/// again; the remaining time is restored on the next entry.
pub(super) async fn allow_resume(
    Path((jadwal_id, registration_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<ResumePermission>, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;
    let registration = find_registration(&state, &jadwal.id, &registration_id).await?;

    let now = primitive_now_utc();
    let allowed = repositories::results::allow_resume(
        state.db(),
        &registration.id_peserta,
        &jadwal.id,
        &teacher.id,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to allow resume"))?;
    if !allowed {
        return Err(ApiError::BadRequest(
            "Tidak ada tes yang terputus untuk peserta ini".to_string(),
        ));
    }

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        peserta_id = %registration.id_peserta,
        action = "attempt_allow_resume",
        "Disconnected attempt may resume"
    );

    Ok(Json(ResumePermission {
        id_peserta: registration.id_peserta,
        diizinkan_lanjut_pada: format_primitive(now),
        message: "Peserta diizinkan melanjutkan tes".to_string(),
    }))
}

pub(super) async fn unregister(
    Path((jadwal_id, registration_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let deleted =
        repositories::registrations::delete_many(state.db(), &jadwal.id, &[registration_id])
            .await
            .map_err(|e| ApiError::internal(e, "Failed to delete registration"))?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Pendaftaran tidak ditemukan".to_string()));
    }

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        action = "registration_delete",
        "Registration deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn bulk_unregister(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<BulkRegistrationAction>,
) -> Result<Json<AffectedResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;
    require_bulk_quota(&state, &teacher).await?;

    let ids = dedupe_ids(payload.ids);
    let affected = repositories::registrations::delete_many(state.db(), &jadwal.id, &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete registrations"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        affected,
        action = "registration_bulk_delete",
        "Registrations deleted in bulk"
    );

    Ok(Json(AffectedResponse { affected, message: format!("{affected} pendaftaran dihapus") }))
}
