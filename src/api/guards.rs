use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::{Jadwal, User};
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);
/// Teachers and admins; admins act as platform superusers.
pub(crate) struct CurrentTeacher(pub(crate) User);
pub(crate) struct CurrentPeserta(pub(crate) User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.is_admin() {
            Ok(CurrentAdmin(user))
        } else {
            Err(ApiError::Forbidden("Admin access required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        match user.role {
            UserRole::Teacher | UserRole::Admin => Ok(CurrentTeacher(user)),
            UserRole::Peserta => Err(ApiError::Forbidden("Teacher access required")),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentPeserta {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role == UserRole::Peserta {
            Ok(CurrentPeserta(user))
        } else {
            Err(ApiError::Forbidden("Only peserta can perform this action"))
        }
    }
}

pub(crate) fn can_manage_jadwal(user: &User, jadwal: &Jadwal) -> bool {
    user.is_admin() || jadwal.user_id == user.id
}

/// Loads the jadwal and checks that `user` owns it (or is an admin).
pub(crate) async fn require_jadwal_owner(
    state: &AppState,
    user: &User,
    jadwal_id: &str,
) -> Result<Jadwal, ApiError> {
    let jadwal = repositories::jadwal::find_by_id(state.db(), jadwal_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch jadwal"))?
        .ok_or_else(|| ApiError::NotFound("Jadwal tidak ditemukan".to_string()))?;

    if !can_manage_jadwal(user, &jadwal) {
        return Err(ApiError::Forbidden("Anda tidak memiliki akses ke jadwal ini"));
    }

    Ok(jadwal)
}

/// Fixed-window quota on bulk mutations, keyed per user.
pub(crate) async fn require_bulk_quota(state: &AppState, user: &User) -> Result<(), ApiError> {
    let schedule = state.settings().schedule();
    let rate_key = format!("rl:bulk:{}", user.id);
    let allowed = state
        .redis()
        .rate_limit(&rate_key, schedule.bulk_action_limit, schedule.bulk_action_window_seconds)
        .await
        .map(|decision| decision.allowed)
        .unwrap_or(true);

    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests("Terlalu banyak aksi massal, coba lagi nanti"))
    }
}
