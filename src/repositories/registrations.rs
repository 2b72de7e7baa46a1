use sqlx::{PgExecutor, PgPool};
use time::PrimitiveDateTime;

use crate::db::models::Registration;
use crate::db::types::{AttemptStatus, RegistrationMethod, RegistrationStatus};

const COLUMNS: &str = "\
    id, id_jadwal, id_peserta, status, cara_daftar, tanggal_daftar, \
    tanggal_approval, approved_by, keterangan";

pub(crate) async fn find_for_pair(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
    peserta_id: &str,
) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>(&format!(
        "SELECT {COLUMNS} FROM jadwal_peserta WHERE id_jadwal = $1 AND id_peserta = $2"
    ))
    .bind(jadwal_id)
    .bind(peserta_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_in_jadwal(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
    registration_id: &str,
) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>(&format!(
        "SELECT {COLUMNS} FROM jadwal_peserta WHERE id = $1 AND id_jadwal = $2"
    ))
    .bind(registration_id)
    .bind(jadwal_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn registered_peserta_ids(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
    peserta_ids: &[String],
) -> Result<Vec<(String, RegistrationStatus)>, sqlx::Error> {
    sqlx::query_as::<_, (String, RegistrationStatus)>(
        "SELECT id_peserta, status FROM jadwal_peserta
         WHERE id_jadwal = $1 AND id_peserta = ANY($2)",
    )
    .bind(jadwal_id)
    .bind(peserta_ids)
    .fetch_all(executor)
    .await
}

pub(crate) struct InsertRegistration<'a> {
    pub id: &'a str,
    pub jadwal_id: &'a str,
    pub peserta_id: &'a str,
    pub status: RegistrationStatus,
    pub method: RegistrationMethod,
    pub registered_at: PrimitiveDateTime,
    pub approved_by: Option<&'a str>,
    pub approved_at: Option<PrimitiveDateTime>,
}

/// Returns `None` when the pair is already registered.
pub(crate) async fn insert_if_absent(
    executor: impl PgExecutor<'_>,
    params: InsertRegistration<'_>,
) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>(&format!(
        "INSERT INTO jadwal_peserta (
            id, id_jadwal, id_peserta, status, cara_daftar, tanggal_daftar,
            tanggal_approval, approved_by
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT (id_jadwal, id_peserta) DO NOTHING
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.jadwal_id)
    .bind(params.peserta_id)
    .bind(params.status)
    .bind(params.method)
    .bind(params.registered_at)
    .bind(params.approved_at)
    .bind(params.approved_by)
    .fetch_optional(executor)
    .await
}

pub(crate) struct Decision<'a> {
    pub status: RegistrationStatus,
    pub decided_by: &'a str,
    pub decided_at: PrimitiveDateTime,
    pub note: Option<&'a str>,
}

/// Single-row decision; applies whatever the current state is. The note is
/// written as given, so a later approval clears an earlier rejection note.
pub(crate) async fn decide(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
    registration_id: &str,
    decision: Decision<'_>,
) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>(&format!(
        "UPDATE jadwal_peserta SET
            status = $1,
            approved_by = $2,
            tanggal_approval = $3,
            keterangan = $4
         WHERE id = $5 AND id_jadwal = $6
         RETURNING {COLUMNS}"
    ))
    .bind(decision.status)
    .bind(decision.decided_by)
    .bind(decision.decided_at)
    .bind(decision.note)
    .bind(registration_id)
    .bind(jadwal_id)
    .fetch_optional(executor)
    .await
}

/// Bulk decision; only rows still `menunggu` move.
pub(crate) async fn decide_pending(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
    registration_ids: &[String],
    decision: Decision<'_>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE jadwal_peserta SET
            status = $1,
            approved_by = $2,
            tanggal_approval = $3,
            keterangan = $4
         WHERE id_jadwal = $5 AND id = ANY($6) AND status = $7",
    )
    .bind(decision.status)
    .bind(decision.decided_by)
    .bind(decision.decided_at)
    .bind(decision.note)
    .bind(jadwal_id)
    .bind(registration_ids)
    .bind(RegistrationStatus::Menunggu)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_many(
    executor: impl PgExecutor<'_>,
    jadwal_id: &str,
    registration_ids: &[String],
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jadwal_peserta WHERE id_jadwal = $1 AND id = ANY($2)")
        .bind(jadwal_id)
        .bind(registration_ids)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RegistrationRow {
    #[sqlx(flatten)]
    pub(crate) registration: Registration,
    pub(crate) peserta_nama: String,
    pub(crate) peserta_username: String,
    pub(crate) peserta_npm: Option<String>,
    pub(crate) status_tes: Option<AttemptStatus>,
}

pub(crate) async fn list_for_jadwal(
    pool: &PgPool,
    jadwal_id: &str,
    status: Option<RegistrationStatus>,
) -> Result<Vec<RegistrationRow>, sqlx::Error> {
    sqlx::query_as::<_, RegistrationRow>(
        "SELECT jp.id, jp.id_jadwal, jp.id_peserta, jp.status, jp.cara_daftar,
                jp.tanggal_daftar, jp.tanggal_approval, jp.approved_by, jp.keterangan,
                u.nama AS peserta_nama,
                u.username AS peserta_username,
                u.npm AS peserta_npm,
                h.status_tes
         FROM jadwal_peserta jp
         JOIN users u ON u.id = jp.id_peserta
         LEFT JOIN hasil_test_peserta h
                ON h.id_jadwal = jp.id_jadwal AND h.id_user = jp.id_peserta
         WHERE jp.id_jadwal = $1 AND ($2::registrationstatus IS NULL OR jp.status = $2)
         ORDER BY jp.tanggal_daftar ASC, jp.id ASC",
    )
    .bind(jadwal_id)
    .bind(status)
    .fetch_all(pool)
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PesertaRegistrationRow {
    #[sqlx(flatten)]
    pub(crate) registration: Registration,
    pub(crate) nama_jadwal: String,
    pub(crate) kode_jadwal: String,
    pub(crate) tanggal_mulai: PrimitiveDateTime,
    pub(crate) tanggal_berakhir: PrimitiveDateTime,
}

pub(crate) async fn list_for_peserta(
    pool: &PgPool,
    peserta_id: &str,
) -> Result<Vec<PesertaRegistrationRow>, sqlx::Error> {
    sqlx::query_as::<_, PesertaRegistrationRow>(
        "SELECT jp.id, jp.id_jadwal, jp.id_peserta, jp.status, jp.cara_daftar,
                jp.tanggal_daftar, jp.tanggal_approval, jp.approved_by, jp.keterangan,
                j.nama_jadwal, j.kode_jadwal, j.tanggal_mulai, j.tanggal_berakhir
         FROM jadwal_peserta jp
         JOIN jadwal j ON j.id = jp.id_jadwal
         WHERE jp.id_peserta = $1
         ORDER BY j.tanggal_mulai DESC, jp.id ASC",
    )
    .bind(peserta_id)
    .fetch_all(pool)
    .await
}
