use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Makes sure the configured first admin exists, is active and can log in
/// with the configured password.
pub(crate) async fn ensure_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin creation");
        return Ok(());
    }

    let username = &admin.first_admin_username;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_username(state.db(), username).await? {
        let password_matches =
            security::verify_password(&admin.first_admin_password, &user.hashed_password)
                .unwrap_or(false);

        if password_matches && user.role == UserRole::Admin && user.is_active {
            tracing::info!("Default admin already up to date");
            return Ok(());
        }

        let hashed_password = if password_matches {
            None
        } else {
            Some(security::hash_password(&admin.first_admin_password)?)
        };
        repositories::users::reset_admin(state.db(), &user.id, hashed_password, now).await?;
        tracing::info!(username = %username, action = "admin_reset", "Updated default admin");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_admin_password)?;
    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            hashed_password,
            role: UserRole::Admin,
            nama: "Administrator",
            email: None,
            is_active: true,
            created_at: now,
        },
    )
    .await?;

    tracing::info!(username = %username, action = "admin_create", "Created default admin");
    Ok(())
}
