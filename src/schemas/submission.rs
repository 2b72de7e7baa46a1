use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::{format_optional, format_primitive};
use crate::db::types::{AttemptStatus, CorrectionStatus, QuestionKind};
use crate::repositories::results::{AnswerDetail, HistoryRow, ResultRow};
use crate::schemas::jadwal::JadwalResponse;
use crate::schemas::soal::SoalPublic;
use crate::services::attempts::{self, SubmitReason};
use crate::services::scoring::AnswerValue;

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    /// Keyed by soal id. Soal missing here keep their autosaved answer.
    #[serde(default)]
    pub(crate) answers: HashMap<String, AnswerValue>,
    #[serde(default)]
    pub(crate) reason: SubmitReason,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AutosaveRequest {
    #[validate(length(min = 1, message = "id_soal must not be empty"))]
    pub(crate) id_soal: String,
    #[serde(default)]
    pub(crate) jawaban: Option<AnswerValue>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnterResponse {
    pub(crate) jadwal: JadwalResponse,
    pub(crate) status_tes: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) deadline: String,
    pub(crate) sisa_waktu_detik: i32,
    pub(crate) soal: Vec<SoalPublic>,
    /// Autosaved answers keyed by soal id.
    pub(crate) saved_answers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) id: String,
    pub(crate) id_jadwal: String,
    pub(crate) status_tes: AttemptStatus,
    pub(crate) reason: Option<String>,
    pub(crate) alasan_terputus: Option<String>,
    pub(crate) sisa_waktu_detik: Option<i32>,
    pub(crate) total_skor: f64,
    pub(crate) answered_count: usize,
    pub(crate) submitted_at: Option<String>,
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) id_user: String,
    pub(crate) peserta_nama: String,
    pub(crate) peserta_npm: Option<String>,
    pub(crate) status_tes: AttemptStatus,
    pub(crate) alasan_terputus: Option<String>,
    pub(crate) boleh_dilanjutkan: bool,
    pub(crate) total_skor: f64,
    pub(crate) skor_maksimal: f64,
    pub(crate) nilai: f64,
    pub(crate) answered_count: i64,
    pub(crate) reason: Option<String>,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) status_koreksi: CorrectionStatus,
    pub(crate) dikoreksi_pada: Option<String>,
}

impl ResultResponse {
    pub(crate) fn from_row(row: ResultRow) -> Self {
        let result = row.result;
        Self {
            nilai: attempts::nilai(result.total_skor, row.skor_maksimal),
            id: result.id,
            id_user: result.id_user,
            peserta_nama: row.peserta_nama,
            peserta_npm: row.peserta_npm,
            status_tes: result.status_tes,
            alasan_terputus: result.alasan_terputus,
            boleh_dilanjutkan: result.boleh_dilanjutkan,
            total_skor: result.total_skor,
            skor_maksimal: row.skor_maksimal,
            answered_count: row.answered_count,
            reason: result.reason,
            started_at: format_primitive(result.started_at),
            submitted_at: format_optional(result.submitted_at),
            status_koreksi: result.status_koreksi,
            dikoreksi_pada: format_optional(result.dikoreksi_pada),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CorrectionAnswer {
    pub(crate) id: String,
    pub(crate) id_soal: String,
    pub(crate) urutan: i32,
    pub(crate) pertanyaan: String,
    pub(crate) jenis_soal: QuestionKind,
    pub(crate) jawaban_benar: Option<String>,
    pub(crate) skor_maksimal: f64,
    pub(crate) jawaban: Option<String>,
    pub(crate) skor: f64,
}

impl CorrectionAnswer {
    pub(crate) fn from_row(row: AnswerDetail) -> Self {
        Self {
            id: row.id,
            id_soal: row.id_soal,
            urutan: row.urutan,
            pertanyaan: row.pertanyaan,
            jenis_soal: row.jenis_soal,
            jawaban_benar: row.jawaban_benar,
            skor_maksimal: row.skor_maksimal,
            jawaban: row.jawaban,
            skor: row.skor,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CorrectionDetail {
    pub(crate) id: String,
    pub(crate) id_user: String,
    pub(crate) status_tes: AttemptStatus,
    pub(crate) status_koreksi: CorrectionStatus,
    pub(crate) total_skor: f64,
    pub(crate) skor_maksimal: f64,
    pub(crate) nilai: f64,
    pub(crate) dikoreksi_oleh: Option<String>,
    pub(crate) dikoreksi_pada: Option<String>,
    pub(crate) answers: Vec<CorrectionAnswer>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum CorrectionAction {
    #[default]
    Save,
    Submit,
}

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ScoreEntry {
    /// Answer (jawaban) id.
    pub(crate) id: String,
    pub(crate) skor: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CorrectionRequest {
    #[validate(length(max = 1000, message = "scores must contain at most 1000 entries"))]
    pub(crate) scores: Vec<ScoreEntry>,
    #[serde(default)]
    pub(crate) action: CorrectionAction,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct BulkDeleteResults {
    #[validate(length(min = 1, max = 500, message = "peserta_ids must contain 1-500 entries"))]
    pub(crate) peserta_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkDeleteResponse {
    pub(crate) deleted_count: u64,
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryItem {
    pub(crate) id: String,
    pub(crate) id_jadwal: String,
    pub(crate) nama_jadwal: String,
    pub(crate) kode_jadwal: String,
    pub(crate) total_skor: f64,
    pub(crate) status_koreksi: CorrectionStatus,
    pub(crate) submitted_at: Option<String>,
}

impl HistoryItem {
    pub(crate) fn from_row(row: HistoryRow) -> Self {
        Self {
            id: row.result.id,
            id_jadwal: row.result.id_jadwal,
            nama_jadwal: row.nama_jadwal,
            kode_jadwal: row.kode_jadwal,
            total_skor: row.result.total_skor,
            status_koreksi: row.result.status_koreksi,
            submitted_at: format_optional(row.result.submitted_at),
        }
    }
}
