use sqlx::{PgConnection, PgExecutor, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::TestResult;
use crate::db::types::{AttemptStatus, CorrectionStatus, QuestionKind};

const COLUMNS: &str = "\
    id, id_user, id_jadwal, status_tes, started_at, deadline_at, sisa_waktu_detik, \
    alasan_terputus, boleh_dilanjutkan, diizinkan_oleh, diizinkan_lanjut_pada, total_skor, \
    reason, submitted_at, status_koreksi, dikoreksi_oleh, dikoreksi_pada";

pub(crate) async fn find_for_pair(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    jadwal_id: &str,
) -> Result<Option<TestResult>, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "SELECT {COLUMNS} FROM hasil_test_peserta WHERE id_user = $1 AND id_jadwal = $2"
    ))
    .bind(user_id)
    .bind(jadwal_id)
    .fetch_optional(executor)
    .await
}

/// Row-locked read; answer writes for the pair serialise on it.
pub(crate) async fn lock_for_pair(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    jadwal_id: &str,
) -> Result<Option<TestResult>, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "SELECT {COLUMNS} FROM hasil_test_peserta
         WHERE id_user = $1 AND id_jadwal = $2
         FOR UPDATE"
    ))
    .bind(user_id)
    .bind(jadwal_id)
    .fetch_optional(executor)
    .await
}

/// Opens the attempt; `None` when a concurrent entry already opened it.
pub(crate) async fn start(
    executor: impl PgExecutor<'_>,
    id: &str,
    user_id: &str,
    jadwal_id: &str,
    started_at: PrimitiveDateTime,
    deadline_at: PrimitiveDateTime,
) -> Result<Option<TestResult>, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "INSERT INTO hasil_test_peserta (id, id_user, id_jadwal, status_tes, started_at, deadline_at)
         VALUES ($1, $2, $3, 'sedang_mengerjakan', $4, $5)
         ON CONFLICT (id_user, id_jadwal) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(jadwal_id)
    .bind(started_at)
    .bind(deadline_at)
    .fetch_optional(executor)
    .await
}

/// Reopens a disconnected attempt the owner allowed to continue.
pub(crate) async fn resume(
    executor: impl PgExecutor<'_>,
    id: &str,
    deadline_at: PrimitiveDateTime,
) -> Result<Option<TestResult>, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "UPDATE hasil_test_peserta
         SET status_tes = 'sedang_mengerjakan',
             boleh_dilanjutkan = FALSE,
             deadline_at = $2,
             sisa_waktu_detik = NULL,
             alasan_terputus = NULL
         WHERE id = $1 AND status_tes = 'terputus' AND boleh_dilanjutkan
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(deadline_at)
    .fetch_optional(executor)
    .await
}

pub(crate) struct Finish<'a> {
    pub status: AttemptStatus,
    pub reason: &'a str,
    pub alasan_terputus: Option<&'a str>,
    pub sisa_waktu_detik: Option<i32>,
    pub total_skor: f64,
    pub submitted_at: PrimitiveDateTime,
}

/// Moves an in-progress attempt to its submitted state; `None` when it was
/// not in progress anymore.
pub(crate) async fn finish(
    executor: impl PgExecutor<'_>,
    id: &str,
    params: Finish<'_>,
) -> Result<Option<TestResult>, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "UPDATE hasil_test_peserta
         SET status_tes = $2,
             reason = $3,
             alasan_terputus = $4,
             sisa_waktu_detik = $5,
             total_skor = $6,
             submitted_at = $7,
             boleh_dilanjutkan = FALSE
         WHERE id = $1 AND status_tes = 'sedang_mengerjakan'
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(params.status)
    .bind(params.reason)
    .bind(params.alasan_terputus)
    .bind(params.sisa_waktu_detik)
    .bind(params.total_skor)
    .bind(params.submitted_at)
    .fetch_optional(executor)
    .await
}

/// Flags a disconnected attempt as resumable; `false` when the pair has no
/// disconnected attempt.
pub(crate) async fn allow_resume(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    jadwal_id: &str,
    allowed_by: &str,
    allowed_at: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE hasil_test_peserta
         SET boleh_dilanjutkan = TRUE, diizinkan_oleh = $3, diizinkan_lanjut_pada = $4
         WHERE id_user = $1 AND id_jadwal = $2 AND status_tes = 'terputus'",
    )
    .bind(user_id)
    .bind(jadwal_id)
    .bind(allowed_by)
    .bind(allowed_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) struct AnswerRow<'a> {
    pub id: String,
    pub soal_id: &'a str,
    pub jawaban: Option<String>,
    pub skor: f64,
}

/// Writes one row per soal; an existing row for the same soal is overwritten.
pub(crate) async fn upsert_answers(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    jadwal_id: &str,
    answers: &[AnswerRow<'_>],
    written_at: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    if answers.is_empty() {
        return Ok(0);
    }

    let ids: Vec<&str> = answers.iter().map(|row| row.id.as_str()).collect();
    let soal_ids: Vec<&str> = answers.iter().map(|row| row.soal_id).collect();
    let values: Vec<Option<&str>> = answers.iter().map(|row| row.jawaban.as_deref()).collect();
    let scores: Vec<f64> = answers.iter().map(|row| row.skor).collect();

    let result = sqlx::query(
        "INSERT INTO jawaban (id, id_user, id_jadwal, id_soal, jawaban, skor, created_at, updated_at)
         SELECT item.id, $1, $2, item.id_soal, item.jawaban, item.skor, $3, $3
         FROM UNNEST($4::text[], $5::text[], $6::text[], $7::float8[])
              AS item(id, id_soal, jawaban, skor)
         ON CONFLICT (id_user, id_jadwal, id_soal)
         DO UPDATE SET jawaban = EXCLUDED.jawaban, skor = EXCLUDED.skor,
                       updated_at = EXCLUDED.updated_at",
    )
    .bind(user_id)
    .bind(jadwal_id)
    .bind(written_at)
    .bind(&ids)
    .bind(&soal_ids)
    .bind(&values)
    .bind(&scores)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SavedAnswer {
    pub(crate) id_soal: String,
    pub(crate) jawaban: Option<String>,
}

pub(crate) async fn saved_answers(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    jadwal_id: &str,
) -> Result<Vec<SavedAnswer>, sqlx::Error> {
    sqlx::query_as::<_, SavedAnswer>(
        "SELECT id_soal, jawaban FROM jawaban WHERE id_user = $1 AND id_jadwal = $2",
    )
    .bind(user_id)
    .bind(jadwal_id)
    .fetch_all(executor)
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ResultRow {
    #[sqlx(flatten)]
    pub(crate) result: TestResult,
    pub(crate) peserta_nama: String,
    pub(crate) peserta_npm: Option<String>,
    pub(crate) answered_count: i64,
    pub(crate) skor_maksimal: f64,
}

pub(crate) async fn list_for_jadwal(
    pool: &PgPool,
    jadwal_id: &str,
) -> Result<Vec<ResultRow>, sqlx::Error> {
    sqlx::query_as::<_, ResultRow>(
        "SELECT h.id, h.id_user, h.id_jadwal, h.status_tes, h.started_at, h.deadline_at,
                h.sisa_waktu_detik, h.alasan_terputus, h.boleh_dilanjutkan, h.diizinkan_oleh,
                h.diizinkan_lanjut_pada, h.total_skor, h.reason, h.submitted_at,
                h.status_koreksi, h.dikoreksi_oleh, h.dikoreksi_pada,
                u.nama AS peserta_nama,
                u.npm AS peserta_npm,
                (SELECT COUNT(*) FROM jawaban a
                  WHERE a.id_user = h.id_user AND a.id_jadwal = h.id_jadwal
                    AND a.jawaban IS NOT NULL) AS answered_count,
                (SELECT COALESCE(SUM(s.skor), 0) FROM soal s
                  WHERE s.id_jadwal = h.id_jadwal) AS skor_maksimal
         FROM hasil_test_peserta h
         JOIN users u ON u.id = h.id_user
         WHERE h.id_jadwal = $1
         ORDER BY h.total_skor DESC, h.submitted_at ASC NULLS LAST, u.nama ASC",
    )
    .bind(jadwal_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AnswerDetail {
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

pub(crate) async fn answers_for_pair(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    jadwal_id: &str,
) -> Result<Vec<AnswerDetail>, sqlx::Error> {
    sqlx::query_as::<_, AnswerDetail>(
        "SELECT a.id, a.id_soal, s.urutan, s.pertanyaan, s.jenis_soal, s.jawaban_benar,
                s.skor AS skor_maksimal, a.jawaban, a.skor
         FROM jawaban a
         JOIN soal s ON s.id = a.id_soal
         WHERE a.id_user = $1 AND a.id_jadwal = $2
         ORDER BY s.urutan ASC, s.created_at ASC",
    )
    .bind(user_id)
    .bind(jadwal_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn update_answer_scores(
    executor: impl PgExecutor<'_>,
    user_id: &str,
    jadwal_id: &str,
    scores: &[(&str, f64)],
    updated_at: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    if scores.is_empty() {
        return Ok(0);
    }

    let ids: Vec<&str> = scores.iter().map(|(id, _)| *id).collect();
    let values: Vec<f64> = scores.iter().map(|(_, skor)| *skor).collect();

    let result = sqlx::query(
        "UPDATE jawaban a
         SET skor = item.skor, updated_at = $3
         FROM UNNEST($4::text[], $5::float8[]) AS item(id, skor)
         WHERE a.id = item.id AND a.id_user = $1 AND a.id_jadwal = $2",
    )
    .bind(user_id)
    .bind(jadwal_id)
    .bind(updated_at)
    .bind(&ids)
    .bind(&values)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Recomputes the total from the stored answer scores and records the corrector.
pub(crate) async fn record_correction(
    executor: impl PgExecutor<'_>,
    id: &str,
    status: CorrectionStatus,
    corrected_by: &str,
    corrected_at: PrimitiveDateTime,
) -> Result<TestResult, sqlx::Error> {
    sqlx::query_as::<_, TestResult>(&format!(
        "UPDATE hasil_test_peserta h
         SET total_skor = (SELECT COALESCE(SUM(a.skor), 0) FROM jawaban a
                            WHERE a.id_user = h.id_user AND a.id_jadwal = h.id_jadwal),
             status_koreksi = $2,
             dikoreksi_oleh = $3,
             dikoreksi_pada = $4
         WHERE h.id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(status)
    .bind(corrected_by)
    .bind(corrected_at)
    .fetch_one(executor)
    .await
}

/// Drops the attempts and answers of the given participants; returns how many
/// attempts were removed.
pub(crate) async fn delete_for_pairs(
    conn: &mut PgConnection,
    jadwal_id: &str,
    user_ids: &[String],
) -> Result<u64, sqlx::Error> {
    sqlx::query("DELETE FROM jawaban WHERE id_jadwal = $1 AND id_user = ANY($2)")
        .bind(jadwal_id)
        .bind(user_ids)
        .execute(&mut *conn)
        .await?;
    let result =
        sqlx::query("DELETE FROM hasil_test_peserta WHERE id_jadwal = $1 AND id_user = ANY($2)")
            .bind(jadwal_id)
            .bind(user_ids)
            .execute(&mut *conn)
            .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct HistoryRow {
    #[sqlx(flatten)]
    pub(crate) result: TestResult,
    pub(crate) nama_jadwal: String,
    pub(crate) kode_jadwal: String,
}

/// Finished attempts only.
pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<HistoryRow>, sqlx::Error> {
    sqlx::query_as::<_, HistoryRow>(
        "SELECT h.id, h.id_user, h.id_jadwal, h.status_tes, h.started_at, h.deadline_at,
                h.sisa_waktu_detik, h.alasan_terputus, h.boleh_dilanjutkan, h.diizinkan_oleh,
                h.diizinkan_lanjut_pada, h.total_skor, h.reason, h.submitted_at,
                h.status_koreksi, h.dikoreksi_oleh, h.dikoreksi_pada,
                j.nama_jadwal, j.kode_jadwal
         FROM hasil_test_peserta h
         JOIN jadwal j ON j.id = h.id_jadwal
         WHERE h.id_user = $1 AND h.status_tes = 'selesai'
         ORDER BY h.submitted_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
