use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::validation::{validate_password_len, validate_username};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::TokenResponse;
use crate::schemas::user::{UserLogin, UserRegister, UserResponse};

/// Max attempts per window for auth endpoints (register/login).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserRegister>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    validate_username(&payload.username)?;
    validate_password_len(&payload.password)?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let rate_key = format!("rl:register:{}", payload.username.to_lowercase());
    if !within_auth_limit(&state, &rate_key).await {
        return Err(ApiError::TooManyRequests("Too many registration attempts, try again later"));
    }

    let taken = repositories::users::find_taken_identity(
        state.db(),
        &payload.username,
        payload.email.as_deref(),
        None,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if let Some(field) = taken {
        return Err(ApiError::Conflict(format!("A user with this {field} already exists")));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &payload.username,
            hashed_password,
            role: UserRole::Peserta,
            nama: payload.nama.trim(),
            email: payload.email.as_deref(),
            is_active: true,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    tracing::info!(user_id = %user.id, action = "user_register", "Peserta registered");

    let token = issue_token(&state, &user)?;
    Ok((StatusCode::CREATED, Json(TokenResponse::bearer(token, UserResponse::from_db(user)))))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<UserLogin>,
) -> Result<Json<TokenResponse>, ApiError> {
    let rate_key = format!("rl:login:{}", payload.username.to_lowercase());
    if !within_auth_limit(&state, &rate_key).await {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let token = issue_token(&state, &user)?;
    Ok(Json(TokenResponse::bearer(token, UserResponse::from_db(user))))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from_db(user))
}

async fn within_auth_limit(state: &AppState, rate_key: &str) -> bool {
    state
        .redis()
        .rate_limit(rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .map(|decision| decision.allowed)
        .unwrap_or(true)
}

fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    security::create_access_token(&user.id, user.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::test_support;

    #[tokio::test]
    async fn register_creates_peserta_and_returns_token() {
        let ctx = test_support::setup_test_context().await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "username": "siti.aminah",
                    "password": "rahasia-123",
                    "nama": "Siti Aminah",
                    "email": "siti@student.unsika.ac.id"
                })),
            ))
            .await
            .expect("register");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {body}");
        assert_eq!(body["user"]["role"], "peserta");
        assert_eq!(body["user"]["profile_complete"], false);
        let token = body["access_token"].as_str().expect("token").to_string();

        let response = ctx
            .app
            .oneshot(test_support::json_request(Method::GET, "/api/v1/auth/me", Some(&token), None))
            .await
            .expect("me");
        let status = response.status();
        let me = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {me}");
        assert_eq!(me["username"], "siti.aminah");
    }

    #[tokio::test]
    async fn register_rejects_taken_username() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_user(ctx.state.db(), "budi", UserRole::Peserta).await;

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({ "username": "BUDI", "password": "rahasia-123", "nama": "Budi" })),
            ))
            .await
            .expect("register");

        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CONFLICT, "response: {body}");
        assert!(body["detail"].as_str().unwrap_or("").contains("username"));
    }

    #[tokio::test]
    async fn login_checks_password() {
        let ctx = test_support::setup_test_context().await;
        test_support::insert_user(ctx.state.db(), "dosen01", UserRole::Teacher).await;

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "username": "dosen01", "password": "wrong-password" })),
            ))
            .await
            .expect("login");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = ctx
            .app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "username": "dosen01", "password": test_support::TEST_PASSWORD })),
            ))
            .await
            .expect("login");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["user"]["role"], "teacher");
        assert_eq!(body["token_type"], "bearer");
    }
}
