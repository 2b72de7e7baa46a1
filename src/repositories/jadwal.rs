use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Jadwal;
use crate::db::types::{AccessMode, JadwalStatus, RegistrationStatus};

pub(crate) const COLUMNS: &str = "\
    id, kode_jadwal, nama_jadwal, tanggal_mulai, tanggal_berakhir, waktu_mulai_tes, \
    status, auto_close, durasi, user_id, id_jadwal_sebelumnya, kategori_tes_id, \
    access_mode, is_shuffled, created_at, updated_at";

pub(crate) async fn find_by_id(
    executor: impl PgExecutor<'_>,
    id: &str,
) -> Result<Option<Jadwal>, sqlx::Error> {
    sqlx::query_as::<_, Jadwal>(&format!("SELECT {COLUMNS} FROM jadwal WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub(crate) async fn find_many_for_owner(
    executor: impl PgExecutor<'_>,
    ids: &[String],
    owner_id: Option<&str>,
) -> Result<Vec<Jadwal>, sqlx::Error> {
    sqlx::query_as::<_, Jadwal>(&format!(
        "SELECT {COLUMNS} FROM jadwal
         WHERE id = ANY($1) AND ($2::text IS NULL OR user_id = $2)"
    ))
    .bind(ids)
    .bind(owner_id)
    .fetch_all(executor)
    .await
}

/// Same-owner schedules whose window touches `[start, end]`, earliest first.
///
/// For well-formed windows this is exactly the three-way overlap rule; the
/// caller still confirms each candidate with the in-memory check.
pub(crate) async fn list_overlap_candidates(
    executor: impl PgExecutor<'_>,
    owner_id: &str,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
    exclude_id: Option<&str>,
) -> Result<Vec<Jadwal>, sqlx::Error> {
    sqlx::query_as::<_, Jadwal>(&format!(
        "SELECT {COLUMNS} FROM jadwal
         WHERE user_id = $1
           AND tanggal_mulai <= $3
           AND tanggal_berakhir >= $2
           AND ($4::text IS NULL OR id <> $4)
         ORDER BY tanggal_mulai ASC, id ASC"
    ))
    .bind(owner_id)
    .bind(start)
    .bind(end)
    .bind(exclude_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn name_taken(
    executor: impl PgExecutor<'_>,
    owner_id: &str,
    nama_jadwal: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM jadwal
            WHERE user_id = $1 AND lower(nama_jadwal) = lower($2)
              AND ($3::text IS NULL OR id <> $3)
        )",
    )
    .bind(owner_id)
    .bind(nama_jadwal)
    .bind(exclude_id)
    .fetch_one(executor)
    .await
}

/// Highest kode made of exactly `stem` and a three-digit sequence. Kodes of a
/// longer stem that merely starts with `stem` never match.
pub(crate) async fn latest_kode_with_stem(
    executor: impl PgExecutor<'_>,
    stem: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT kode_jadwal FROM jadwal
         WHERE char_length(kode_jadwal) = char_length($1) + 3
           AND left(kode_jadwal, char_length($1)) = $1
           AND right(kode_jadwal, 3) ~ '^[0-9]{3}$'
         ORDER BY kode_jadwal DESC
         LIMIT 1",
    )
    .bind(stem)
    .fetch_optional(executor)
    .await
}

pub(crate) struct CreateJadwal<'a> {
    pub id: &'a str,
    pub kode_jadwal: &'a str,
    pub nama_jadwal: &'a str,
    pub tanggal_mulai: PrimitiveDateTime,
    pub tanggal_berakhir: PrimitiveDateTime,
    pub waktu_mulai_tes: Option<PrimitiveDateTime>,
    pub auto_close: bool,
    pub durasi: i32,
    pub user_id: &'a str,
    pub id_jadwal_sebelumnya: Option<&'a str>,
    pub kategori_tes_id: Option<&'a str>,
    pub access_mode: AccessMode,
    pub is_shuffled: bool,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl PgExecutor<'_>,
    params: CreateJadwal<'_>,
) -> Result<Jadwal, sqlx::Error> {
    sqlx::query_as::<_, Jadwal>(&format!(
        "INSERT INTO jadwal (
            id, kode_jadwal, nama_jadwal, tanggal_mulai, tanggal_berakhir, waktu_mulai_tes,
            status, auto_close, durasi, user_id, id_jadwal_sebelumnya, kategori_tes_id,
            access_mode, is_shuffled, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$15)
        RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.kode_jadwal)
    .bind(params.nama_jadwal)
    .bind(params.tanggal_mulai)
    .bind(params.tanggal_berakhir)
    .bind(params.waktu_mulai_tes)
    .bind(JadwalStatus::Buka)
    .bind(params.auto_close)
    .bind(params.durasi)
    .bind(params.user_id)
    .bind(params.id_jadwal_sebelumnya)
    .bind(params.kategori_tes_id)
    .bind(params.access_mode)
    .bind(params.is_shuffled)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Fully resolved values; the handler merges the patch with the stored row.
pub(crate) struct UpdateJadwal<'a> {
    pub nama_jadwal: &'a str,
    pub tanggal_mulai: PrimitiveDateTime,
    pub tanggal_berakhir: PrimitiveDateTime,
    pub waktu_mulai_tes: Option<PrimitiveDateTime>,
    pub auto_close: bool,
    pub durasi: i32,
    pub id_jadwal_sebelumnya: Option<&'a str>,
    pub kategori_tes_id: Option<&'a str>,
    pub access_mode: AccessMode,
    pub is_shuffled: bool,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl PgExecutor<'_>,
    id: &str,
    params: UpdateJadwal<'_>,
) -> Result<Jadwal, sqlx::Error> {
    sqlx::query_as::<_, Jadwal>(&format!(
        "UPDATE jadwal SET
            nama_jadwal = $1,
            tanggal_mulai = $2,
            tanggal_berakhir = $3,
            waktu_mulai_tes = $4,
            auto_close = $5,
            durasi = $6,
            id_jadwal_sebelumnya = $7,
            kategori_tes_id = $8,
            access_mode = $9,
            is_shuffled = $10,
            updated_at = $11
         WHERE id = $12
         RETURNING {COLUMNS}"
    ))
    .bind(params.nama_jadwal)
    .bind(params.tanggal_mulai)
    .bind(params.tanggal_berakhir)
    .bind(params.waktu_mulai_tes)
    .bind(params.auto_close)
    .bind(params.durasi)
    .bind(params.id_jadwal_sebelumnya)
    .bind(params.kategori_tes_id)
    .bind(params.access_mode)
    .bind(params.is_shuffled)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn set_status(
    executor: impl PgExecutor<'_>,
    id: &str,
    status: JadwalStatus,
    now: PrimitiveDateTime,
) -> Result<Jadwal, sqlx::Error> {
    sqlx::query_as::<_, Jadwal>(&format!(
        "UPDATE jadwal SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// The auto-expiry transition. Idempotent: rows already `Tutup` never match.
pub(crate) async fn close_expired(
    executor: impl PgExecutor<'_>,
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE jadwal SET status = $1, updated_at = $2
         WHERE status = $3 AND auto_close AND tanggal_berakhir < $2",
    )
    .bind(JadwalStatus::Tutup)
    .bind(now)
    .bind(JadwalStatus::Buka)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// First schedule outside `ids` that names one of `ids` as predecessor.
pub(crate) async fn find_external_successor(
    executor: impl PgExecutor<'_>,
    ids: &[String],
) -> Result<Option<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>(
        "SELECT successor.nama_jadwal, predecessor.nama_jadwal
         FROM jadwal successor
         JOIN jadwal predecessor ON predecessor.id = successor.id_jadwal_sebelumnya
         WHERE successor.id_jadwal_sebelumnya = ANY($1)
           AND NOT (successor.id = ANY($1))
         ORDER BY successor.nama_jadwal ASC
         LIMIT 1",
    )
    .bind(ids)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn delete_many(
    executor: impl PgExecutor<'_>,
    ids: &[String],
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM jadwal WHERE id = ANY($1)").bind(ids).execute(executor).await?;
    Ok(result.rows_affected())
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum ListScope<'a> {
    All,
    Owner(&'a str),
    Participant(&'a str),
}

pub(crate) struct ListJadwalParams<'a> {
    pub scope: ListScope<'a>,
    pub status: Option<JadwalStatus>,
    pub kategori_tes_id: Option<&'a str>,
    pub search: Option<&'a str>,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct JadwalSummaryRow {
    #[sqlx(flatten)]
    pub(crate) jadwal: Jadwal,
    pub(crate) kategori_nama: Option<String>,
    pub(crate) soal_count: i64,
    pub(crate) peserta_count: i64,
    pub(crate) pending_count: i64,
    pub(crate) my_registration_status: Option<RegistrationStatus>,
    pub(crate) total_count: i64,
}

pub(crate) async fn list_summaries(
    pool: &PgPool,
    params: ListJadwalParams<'_>,
) -> Result<Vec<JadwalSummaryRow>, sqlx::Error> {
    let viewer = match params.scope {
        ListScope::Participant(id) => Some(id),
        _ => None,
    };

    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT j.id, j.kode_jadwal, j.nama_jadwal, j.tanggal_mulai, j.tanggal_berakhir,
                j.waktu_mulai_tes, j.status, j.auto_close, j.durasi, j.user_id,
                j.id_jadwal_sebelumnya, j.kategori_tes_id, j.access_mode, j.is_shuffled,
                j.created_at, j.updated_at,
                k.nama AS kategori_nama,
                (SELECT COUNT(*) FROM soal s WHERE s.id_jadwal = j.id) AS soal_count,
                (SELECT COUNT(*) FROM jadwal_peserta jp WHERE jp.id_jadwal = j.id) AS peserta_count,
                (SELECT COUNT(*) FROM jadwal_peserta jp
                  WHERE jp.id_jadwal = j.id AND jp.status = 'menunggu') AS pending_count,
                (SELECT jp.status FROM jadwal_peserta jp
                  WHERE jp.id_jadwal = j.id AND jp.id_peserta = ",
    );
    builder.push_bind(viewer);
    builder.push(
        ") AS my_registration_status,
                COUNT(*) OVER() AS total_count
         FROM jadwal j
         LEFT JOIN kategori_tes k ON k.id = j.kategori_tes_id
         WHERE TRUE",
    );

    match params.scope {
        ListScope::All => {}
        ListScope::Owner(owner_id) => {
            builder.push(" AND j.user_id = ");
            builder.push_bind(owner_id);
        }
        ListScope::Participant(peserta_id) => {
            builder.push(" AND (j.status = ");
            builder.push_bind(JadwalStatus::Buka);
            builder.push(
                " OR EXISTS (SELECT 1 FROM jadwal_peserta jp
                    WHERE jp.id_jadwal = j.id AND jp.id_peserta = ",
            );
            builder.push_bind(peserta_id);
            builder.push("))");
        }
    }

    if let Some(status) = params.status {
        builder.push(" AND j.status = ");
        builder.push_bind(status);
    }

    if let Some(kategori_tes_id) = params.kategori_tes_id {
        builder.push(" AND j.kategori_tes_id = ");
        builder.push_bind(kategori_tes_id);
    }

    if let Some(search) = params.search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        builder.push(" AND (lower(j.nama_jadwal) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR lower(j.kode_jadwal) LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    builder.push(" ORDER BY j.tanggal_mulai DESC, j.id ASC OFFSET ");
    builder.push_bind(params.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(params.limit.clamp(1, 1000));

    builder.build_query_as::<JadwalSummaryRow>().fetch_all(pool).await
}
