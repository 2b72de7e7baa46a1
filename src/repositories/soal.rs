use sqlx::types::Json;
use sqlx::PgExecutor;
use time::PrimitiveDateTime;

use crate::db::models::Soal;
use crate::db::types::QuestionKind;

const COLUMNS: &str = "\
    id, id_jadwal, urutan, jenis_soal, pertanyaan, opsi, jawaban_benar, skor, \
    created_at, updated_at";

pub(crate) async fn list_by_jadwal(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
) -> Result<Vec<Soal>, sqlx::Error> {
    sqlx::query_as::<_, Soal>(&format!(
        "SELECT {COLUMNS} FROM soal WHERE id_jadwal = $1 ORDER BY urutan ASC, created_at ASC"
    ))
    .bind(jadwal_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn next_order(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar("SELECT COALESCE(MAX(urutan), 0) + 1 FROM soal WHERE id_jadwal = $1")
        .bind(jadwal_id)
        .fetch_one(executor)
        .await
}

pub(crate) struct CreateSoal<'a> {
    pub id: &'a str,
    pub jadwal_id: &'a str,
    pub urutan: i32,
    pub jenis_soal: QuestionKind,
    pub pertanyaan: &'a str,
    pub opsi: Vec<String>,
    pub jawaban_benar: Option<&'a str>,
    pub skor: f64,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateSoal<'_>,
) -> Result<Soal, sqlx::Error> {
    sqlx::query_as::<_, Soal>(&format!(
        "INSERT INTO soal (
            id, id_jadwal, urutan, jenis_soal, pertanyaan, opsi, jawaban_benar, skor,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$9)
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.jadwal_id)
    .bind(params.urutan)
    .bind(params.jenis_soal)
    .bind(params.pertanyaan)
    .bind(Json(params.opsi))
    .bind(params.jawaban_benar)
    .bind(params.skor)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
    soal_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM soal WHERE id = $1 AND id_jadwal = $2")
        .bind(soal_id)
        .bind(jadwal_id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
