use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Category;

const COLUMNS: &str = "id, nama, user_id, created_at, updated_at, deleted_at";

/// Soft-deleted rows stay resolvable so schedules keep their category label.
pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!("SELECT {COLUMNS} FROM kategori_tes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_active_for_owner(
    pool: &PgPool,
    id: &str,
    user_id: &str,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM kategori_tes
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_active(
    pool: &PgPool,
    user_id: Option<&str>,
) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "SELECT {COLUMNS} FROM kategori_tes
         WHERE deleted_at IS NULL AND ($1::text IS NULL OR user_id = $1)
         ORDER BY lower(nama) ASC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn name_taken(
    pool: &PgPool,
    user_id: &str,
    nama: &str,
    exclude_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM kategori_tes
            WHERE user_id = $1 AND lower(nama) = lower($2) AND deleted_at IS NULL
              AND ($3::text IS NULL OR id <> $3)
        )",
    )
    .bind(user_id)
    .bind(nama)
    .bind(exclude_id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    nama: &str,
    user_id: &str,
    now: PrimitiveDateTime,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "INSERT INTO kategori_tes (id, nama, user_id, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(nama)
    .bind(user_id)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub(crate) async fn rename(
    pool: &PgPool,
    id: &str,
    nama: &str,
    now: PrimitiveDateTime,
) -> Result<Category, sqlx::Error> {
    sqlx::query_as::<_, Category>(&format!(
        "UPDATE kategori_tes SET nama = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(nama)
    .bind(now)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn soft_delete(
    pool: &PgPool,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE kategori_tes SET deleted_at = $1, updated_at = $1
         WHERE id = $2 AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
