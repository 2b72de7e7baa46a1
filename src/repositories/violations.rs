use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Violation;

const COLUMNS: &str = "\
    id, jadwal_id, peserta_id, violation_type, detection_method, context, \
    ip_address, user_agent, violation_time, created_at";

pub(crate) struct CreateViolation<'a> {
    pub id: &'a str,
    pub jadwal_id: &'a str,
    pub peserta_id: &'a str,
    pub violation_type: &'a str,
    pub detection_method: Option<&'a str>,
    pub context: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub violation_time: PrimitiveDateTime,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateViolation<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO screenshot_violations (
            id, jadwal_id, peserta_id, violation_type, detection_method, context,
            ip_address, user_agent, violation_time, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
    )
    .bind(params.id)
    .bind(params.jadwal_id)
    .bind(params.peserta_id)
    .bind(params.violation_type)
    .bind(params.detection_method)
    .bind(Json(params.context))
    .bind(params.ip_address)
    .bind(params.user_agent)
    .bind(params.violation_time)
    .bind(params.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn list_for_jadwal(
    pool: &PgPool,
    jadwal_id: &str,
    peserta_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<(Vec<Violation>, i64), sqlx::Error> {
    let items = sqlx::query_as::<_, Violation>(&format!(
        "SELECT {COLUMNS} FROM screenshot_violations
         WHERE jadwal_id = $1 AND ($2::text IS NULL OR peserta_id = $2)
         ORDER BY violation_time DESC, id ASC
         OFFSET $3 LIMIT $4"
    ))
    .bind(jadwal_id)
    .bind(peserta_id)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar(
        "SELECT COUNT(*) FROM screenshot_violations
         WHERE jadwal_id = $1 AND ($2::text IS NULL OR peserta_id = $2)",
    )
    .bind(jadwal_id)
    .bind(peserta_id)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}
