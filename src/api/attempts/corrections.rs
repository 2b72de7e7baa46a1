use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_bulk_quota, require_jadwal_owner, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::{format_optional, primitive_now_utc};
use crate::db::models::TestResult;
use crate::db::types::{AttemptStatus, CorrectionStatus};
use crate::repositories;
use crate::repositories::results::AnswerDetail;
use crate::schemas::registration::dedupe_ids;
use crate::schemas::submission::{
    BulkDeleteResponse, BulkDeleteResults, CorrectionAction, CorrectionAnswer, CorrectionDetail,
    CorrectionRequest,
};
use crate::services::attempts;

fn detail(result: TestResult, answers: Vec<AnswerDetail>) -> CorrectionDetail {
    let skor_maksimal: f64 = answers.iter().map(|answer| answer.skor_maksimal).sum();
    CorrectionDetail {
        nilai: attempts::nilai(result.total_skor, skor_maksimal),
        id: result.id,
        id_user: result.id_user,
        status_tes: result.status_tes,
        status_koreksi: result.status_koreksi,
        total_skor: result.total_skor,
        skor_maksimal,
        dikoreksi_oleh: result.dikoreksi_oleh,
        dikoreksi_pada: format_optional(result.dikoreksi_pada),
        answers: answers.into_iter().map(CorrectionAnswer::from_row).collect(),
    }
}

pub(super) async fn show_correction(
    Path((jadwal_id, peserta_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<CorrectionDetail>, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let result = repositories::results::find_for_pair(state.db(), &peserta_id, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?
        .ok_or_else(|| ApiError::NotFound("Hasil tes tidak ditemukan".to_string()))?;
    let answers = repositories::results::answers_for_pair(state.db(), &peserta_id, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    Ok(Json(detail(result, answers)))
}

/// Applies manual scores. `save` keeps the correction editable, `submit`
/// finalises it; a finalised correction is never changed again.
pub(super) async fn update_correction(
    Path((jadwal_id, peserta_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<CorrectionRequest>,
) -> Result<Json<CorrectionDetail>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let result = repositories::results::lock_for_pair(&mut *tx, &peserta_id, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch result"))?
        .ok_or_else(|| ApiError::NotFound("Hasil tes tidak ditemukan".to_string()))?;
    if result.status_tes != AttemptStatus::Selesai {
        return Err(ApiError::BadRequest("Tes peserta belum selesai".to_string()));
    }
    if result.status_koreksi == CorrectionStatus::Submitted {
        return Err(ApiError::Conflict(
            "Koreksi sudah final dan tidak dapat diubah lagi".to_string(),
        ));
    }

    let answers = repositories::results::answers_for_pair(&mut *tx, &peserta_id, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;
    let limits: HashMap<&str, f64> =
        answers.iter().map(|answer| (answer.id.as_str(), answer.skor_maksimal)).collect();
    let scores: Vec<(&str, f64)> =
        payload.scores.iter().map(|entry| (entry.id.as_str(), entry.skor)).collect();
    attempts::check_scores(&limits, &scores).map_err(ApiError::BadRequest)?;

    let now = primitive_now_utc();
    repositories::results::update_answer_scores(&mut *tx, &peserta_id, &jadwal.id, &scores, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update scores"))?;

    let status = match payload.action {
        CorrectionAction::Save => CorrectionStatus::Draft,
        CorrectionAction::Submit => CorrectionStatus::Submitted,
    };
    let corrected =
        repositories::results::record_correction(&mut *tx, &result.id, status, &teacher.id, now)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to record correction"))?;
    let answers = repositories::results::answers_for_pair(&mut *tx, &peserta_id, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load answers"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        peserta_id = %peserta_id,
        scored = scores.len(),
        total_skor = corrected.total_skor,
        final_correction = status == CorrectionStatus::Submitted,
        action = "correction_update",
        "Correction recorded"
    );

    Ok(Json(detail(corrected, answers)))
}

/// Removes the attempt with its answers so the participant can sit again.
pub(super) async fn delete_result(
    Path((jadwal_id, peserta_id)): Path<(String, String)>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let deleted = repositories::results::delete_for_pairs(&mut *tx, &jadwal.id, &[peserta_id])
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete result"))?;
    if deleted == 0 {
        return Err(ApiError::NotFound("Hasil tes tidak ditemukan".to_string()));
    }
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        action = "result_delete",
        "Result deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn bulk_delete_results(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<BulkDeleteResults>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;
    require_bulk_quota(&state, &teacher).await?;

    let ids = dedupe_ids(payload.peserta_ids);
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;
    let deleted_count = repositories::results::delete_for_pairs(&mut *tx, &jadwal.id, &ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete results"))?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::info!(
        user_id = %teacher.id,
        jadwal_id = %jadwal.id,
        deleted_count,
        action = "result_bulk_delete",
        "Results deleted in bulk"
    );

    Ok(Json(BulkDeleteResponse {
        deleted_count,
        message: format!("{deleted_count} hasil tes dihapus"),
    }))
}
