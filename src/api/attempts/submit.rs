use std::collections::{HashMap, HashSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentPeserta;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::format_optional;
use crate::db::models::Soal;
use crate::repositories;
use crate::repositories::results::{AnswerRow, Finish};
use crate::schemas::submission::{AutosaveRequest, SubmitRequest, SubmitResponse};
use crate::services::access_gate::Denial;
use crate::services::{attempts, scoring};

use super::gate;

fn reject_unknown_soal<'a>(
    soal: &[Soal],
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), ApiError> {
    let known: HashSet<&str> = soal.iter().map(|item| item.id.as_str()).collect();
    let mut unknown: Vec<&str> = ids.filter(|id| !known.contains(id)).collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort_unstable();
    Err(ApiError::BadRequest(format!(
        "Jawaban merujuk soal yang tidak ada pada jadwal ini: {}",
        unknown.join(", ")
    )))
}

/// Records the whole answer sheet and closes the attempt in one transaction.
///
/// Schedule status and window are not rechecked here: an attempt opened in
/// time may still be handed in once the sweep closes the schedule.
pub(super) async fn submit_test(
    Path(jadwal_id): Path<String>,
    CurrentPeserta(peserta): CurrentPeserta,
    State(state): State<AppState>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let gate::OpenAttempt { jadwal, attempt, now } =
        match gate::lock_open_attempt(&mut *tx, &state, &peserta, &jadwal_id).await {
            Ok(open) => open,
            Err(err) => {
                if matches!(err, ApiError::AlreadySubmitted(_)) {
                    metrics::record_submission("already_submitted");
                }
                return Err(err);
            }
        };

    let soal = repositories::soal::list_by_jadwal(&mut *tx, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load soal"))?;
    reject_unknown_soal(&soal, payload.answers.keys().map(String::as_str))?;

    let mut saved: HashMap<String, Option<String>> =
        repositories::results::saved_answers(&mut *tx, &peserta.id, &jadwal.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load saved answers"))?
            .into_iter()
            .map(|row| (row.id_soal, row.jawaban))
            .collect();

    let mut answers = payload.answers;
    let mut rows = Vec::with_capacity(soal.len());
    let mut total_skor = 0.0;
    for item in &soal {
        let jawaban = match answers.remove(&item.id) {
            Some(value) => value.into_stored(),
            None => saved.remove(&item.id).flatten(),
        };
        let skor = scoring::score_answer(item, jawaban.as_deref());
        total_skor += skor;
        rows.push(AnswerRow { id: Uuid::new_v4().to_string(), soal_id: &item.id, jawaban, skor });
    }
    let answered_count = rows.iter().filter(|row| row.jawaban.is_some()).count();

    repositories::results::upsert_answers(&mut *tx, &peserta.id, &jadwal.id, &rows, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record answers"))?;

    let outcome = attempts::outcome(payload.reason, attempt.deadline_at, now);
    let finished = repositories::results::finish(
        &mut *tx,
        &attempt.id,
        Finish {
            status: outcome.status,
            reason: payload.reason.code(),
            alasan_terputus: outcome.alasan,
            sisa_waktu_detik: outcome.sisa_waktu_detik,
            total_skor,
            submitted_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record submission"))?;

    let Some(result) = finished else {
        metrics::record_submission("already_submitted");
        return Err(ApiError::AlreadySubmitted(Denial::AlreadySubmitted.message().to_string()));
    };

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    metrics::record_submission(result.status_tes.as_str());
    tracing::info!(
        user_id = %peserta.id,
        jadwal_id = %jadwal.id,
        result_id = %result.id,
        reason = payload.reason.code(),
        status_tes = result.status_tes.as_str(),
        total_skor,
        answered_count,
        action = "test_submit",
        "Submission recorded"
    );

    Ok(Json(SubmitResponse {
        id: result.id,
        id_jadwal: result.id_jadwal,
        status_tes: result.status_tes,
        reason: result.reason,
        alasan_terputus: result.alasan_terputus,
        sisa_waktu_detik: result.sisa_waktu_detik,
        total_skor: result.total_skor,
        answered_count,
        submitted_at: format_optional(result.submitted_at),
        message: outcome.message().to_string(),
    }))
}

/// Stores one answer while the attempt is running. Scoring happens at submit.
pub(super) async fn autosave_answer(
    Path(jadwal_id): Path<String>,
    CurrentPeserta(peserta): CurrentPeserta,
    State(state): State<AppState>,
    Json(payload): Json<AutosaveRequest>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let gate::OpenAttempt { jadwal, now, .. } =
        gate::lock_open_attempt(&mut *tx, &state, &peserta, &jadwal_id).await?;

    let soal = repositories::soal::list_by_jadwal(&mut *tx, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load soal"))?;
    reject_unknown_soal(&soal, std::iter::once(payload.id_soal.as_str()))?;

    let row = AnswerRow {
        id: Uuid::new_v4().to_string(),
        soal_id: &payload.id_soal,
        jawaban: payload.jawaban.and_then(|value| value.into_stored()),
        skor: 0.0,
    };
    repositories::results::upsert_answers(&mut *tx, &peserta.id, &jadwal.id, &[row], now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save answer"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    tracing::debug!(
        user_id = %peserta.id,
        jadwal_id = %jadwal.id,
        soal_id = %payload.id_soal,
        action = "answer_autosave",
        "Answer autosaved"
    );
    Ok(StatusCode::NO_CONTENT)
}
