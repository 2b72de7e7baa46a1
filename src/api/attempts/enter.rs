use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::api::client_ip::ClientIp;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentPeserta;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::db::models::TestResult;
use crate::repositories;
use crate::schemas::jadwal::JadwalResponse;
use crate::schemas::soal::SoalPublic;
use crate::schemas::submission::EnterResponse;
use crate::services::access_gate::{self, Denial, Entry};
use crate::services::attempts;

use super::gate;

/// Opens, continues or resumes the participant's attempt and hands out the
/// question set together with any autosaved answers.
pub(super) async fn enter_test(
    Path(jadwal_id): Path<String>,
    CurrentPeserta(peserta): CurrentPeserta,
    ClientIp(client_ip): ClientIp,
    State(state): State<AppState>,
) -> Result<Json<EnterResponse>, ApiError> {
    let gate::Admission { jadwal, attempt, entry, now } =
        gate::admit(&state, &peserta, &jadwal_id, client_ip).await?;

    let attempt: TestResult = match (entry, attempt) {
        (Entry::Continue, Some(attempt)) => attempt,
        (Entry::Resume, Some(attempt)) => {
            let deadline = attempts::resume_deadline(&jadwal, now, attempt.sisa_waktu_detik);
            repositories::results::resume(state.db(), &attempt.id, deadline)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to resume attempt"))?
                .ok_or_else(|| gate::denial_error(Denial::Disconnected))?
        }
        _ => {
            let deadline = access_gate::attempt_deadline(&jadwal, now);
            let started = repositories::results::start(
                state.db(),
                &Uuid::new_v4().to_string(),
                &peserta.id,
                &jadwal.id,
                now,
                deadline,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to start attempt"))?;
            match started {
                Some(attempt) => attempt,
                // A parallel request opened it first; reuse that attempt.
                None => repositories::results::find_for_pair(state.db(), &peserta.id, &jadwal.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
                    .ok_or_else(|| ApiError::Internal("Attempt vanished".to_string()))?,
            }
        }
    };

    let mut soal = repositories::soal::list_by_jadwal(state.db(), &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load soal"))?;
    if jadwal.is_shuffled {
        soal.shuffle(&mut rand::thread_rng());
    }

    let saved: HashMap<String, String> =
        repositories::results::saved_answers(state.db(), &peserta.id, &jadwal.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load saved answers"))?
            .into_iter()
            .filter_map(|row| row.jawaban.map(|jawaban| (row.id_soal, jawaban)))
            .collect();

    tracing::info!(
        user_id = %peserta.id,
        jadwal_id = %jadwal.id,
        entry = ?entry,
        soal_count = soal.len(),
        action = "test_enter",
        "Peserta entered test"
    );

    Ok(Json(EnterResponse {
        jadwal: JadwalResponse::from_db(jadwal),
        status_tes: attempt.status_tes,
        started_at: format_primitive(attempt.started_at),
        deadline: format_primitive(attempt.deadline_at),
        sisa_waktu_detik: attempts::remaining_seconds(attempt.deadline_at, now),
        soal: soal.into_iter().map(SoalPublic::from_db).collect(),
        saved_answers: saved,
    }))
}
