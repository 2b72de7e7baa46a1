use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str = "\
    id, username, hashed_password, role, nama, email, alamat, no_hp, \
    prodi, fakultas, universitas, npm, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub(crate) async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE lower(username) = lower($1)"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await
}

/// Returns which identity (`username` or `email`) is already taken, if any.
pub(crate) async fn find_taken_identity(
    pool: &PgPool,
    username: &str,
    email: Option<&str>,
    exclude_id: Option<&str>,
) -> Result<Option<&'static str>, sqlx::Error> {
    let taken: Option<bool> = sqlx::query_scalar(
        "SELECT lower(username) = lower($1)
         FROM users
         WHERE (lower(username) = lower($1) OR ($2::text IS NOT NULL AND lower(email) = lower($2)))
           AND ($3::text IS NULL OR id <> $3)
         ORDER BY 1 DESC
         LIMIT 1",
    )
    .bind(username)
    .bind(email)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;

    Ok(taken.map(|username_clash| if username_clash { "username" } else { "email" }))
}

pub(crate) struct CreateUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub hashed_password: String,
    pub role: UserRole,
    pub nama: &'a str,
    pub email: Option<&'a str>,
    pub is_active: bool,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, username, hashed_password, role, nama, email, is_active, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.username)
    .bind(params.hashed_password)
    .bind(params.role)
    .bind(params.nama)
    .bind(params.email)
    .bind(params.is_active)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

#[derive(Default)]
pub(crate) struct UpdateProfile {
    pub nama: Option<String>,
    pub email: Option<String>,
    pub alamat: Option<String>,
    pub no_hp: Option<String>,
    pub prodi: Option<String>,
    pub fakultas: Option<String>,
    pub universitas: Option<String>,
    pub npm: Option<String>,
}

pub(crate) async fn update_profile(
    pool: &PgPool,
    id: &str,
    params: UpdateProfile,
    updated_at: PrimitiveDateTime,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            nama = COALESCE($1, nama),
            email = COALESCE($2, email),
            alamat = COALESCE($3, alamat),
            no_hp = COALESCE($4, no_hp),
            prodi = COALESCE($5, prodi),
            fakultas = COALESCE($6, fakultas),
            universitas = COALESCE($7, universitas),
            npm = COALESCE($8, npm),
            updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}"
    ))
    .bind(params.nama)
    .bind(params.email)
    .bind(params.alamat)
    .bind(params.no_hp)
    .bind(params.prodi)
    .bind(params.fakultas)
    .bind(params.universitas)
    .bind(params.npm)
    .bind(updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn reset_admin(
    pool: &PgPool,
    id: &str,
    hashed_password: Option<String>,
    updated_at: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET
            hashed_password = COALESCE($1, hashed_password),
            role = $2,
            is_active = TRUE,
            updated_at = $3
         WHERE id = $4",
    )
    .bind(hashed_password)
    .bind(UserRole::Admin)
    .bind(updated_at)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn roles_by_ids(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<(String, UserRole)>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, (String, UserRole)>(
        "SELECT id, role FROM users WHERE id = ANY($1) AND is_active",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) struct ListParticipants<'a> {
    pub search: Option<&'a str>,
    pub skip: i64,
    pub limit: i64,
}

fn push_participant_filters<'a>(
    builder: &mut QueryBuilder<'a, Postgres>,
    search: Option<&'a str>,
) {
    builder.push(" WHERE role = ");
    builder.push_bind(UserRole::Peserta);
    if let Some(search) = search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{}%", search.to_lowercase());
        builder.push(" AND (lower(nama) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR lower(username) LIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR lower(COALESCE(npm, '')) LIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

pub(crate) async fn list_participants(
    pool: &PgPool,
    params: ListParticipants<'_>,
) -> Result<(Vec<User>, i64), sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM users"));
    push_participant_filters(&mut builder, params.search);
    builder.push(" ORDER BY nama ASC, id ASC OFFSET ");
    builder.push_bind(params.skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(params.limit.clamp(1, 1000));
    let users = builder.build_query_as::<User>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
    push_participant_filters(&mut count, params.search);
    let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

    Ok((users, total))
}
