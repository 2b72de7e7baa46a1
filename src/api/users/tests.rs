use crate::api::pagination::default_limit;
use crate::db::types::UserRole;
use crate::test_support;
use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn admin_can_create_teacher() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_user(ctx.state.db(), "admin01", UserRole::Admin).await;
    let token = test_support::bearer_token(&admin, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({
                "username": "dosen.budi",
                "password": "dosen-pass-1",
                "nama": "Budi Santoso",
                "role": "teacher"
            })),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["username"], "dosen.budi");
    assert_eq!(created["role"], "teacher");
    assert_eq!(created["is_active"], true);
}

#[tokio::test]
async fn admin_create_user_rejects_short_password() {
    let ctx = test_support::setup_test_context().await;

    let admin = test_support::insert_user(ctx.state.db(), "admin02", UserRole::Admin).await;
    let token = test_support::bearer_token(&admin, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({ "username": "dosen.two", "nama": "Short", "password": "short" })),
        ))
        .await
        .expect("create user");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert!(body["detail"].as_str().unwrap_or("").contains("Password must be at least"));
}

#[tokio::test]
async fn teacher_cannot_create_users() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_user(ctx.state.db(), "dosen03", UserRole::Teacher).await;
    let token = test_support::bearer_token(&teacher, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/users",
            Some(&token),
            Some(json!({ "username": "x.y.z", "nama": "X", "password": "long-enough" })),
        ))
        .await
        .expect("create user");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn profile_update_reports_completeness() {
    let ctx = test_support::setup_test_context().await;

    let peserta = test_support::insert_user_without_profile(ctx.state.db(), "peserta01").await;
    let token = test_support::bearer_token(&peserta, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::GET, "/api/v1/users/me", Some(&token), None))
        .await
        .expect("get me");
    let body = test_support::read_json(response).await;
    assert_eq!(body["profile_complete"], false);
    assert!(body["missing_fields"].as_array().expect("missing").contains(&json!("NPM")));

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            "/api/v1/users/me",
            Some(&token),
            Some(json!({
                "email": "peserta01@student.unsika.ac.id",
                "alamat": "Jl. HS. Ronggo Waluyo, Karawang",
                "no_hp": "081234567890",
                "prodi": "Teknik Informatika",
                "fakultas": "Ilmu Komputer",
                "universitas": "Universitas Singaperbangsa Karawang",
                "npm": "2010631170101"
            })),
        ))
        .await
        .expect("update me");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["profile_complete"], true);
    assert_eq!(body["missing_fields"], json!([]));
}

#[tokio::test]
async fn participants_listing_is_for_teachers() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_user(ctx.state.db(), "dosen04", UserRole::Teacher).await;
    let peserta = test_support::insert_user(ctx.state.db(), "peserta02", UserRole::Peserta).await;
    test_support::insert_user(ctx.state.db(), "peserta03", UserRole::Peserta).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/users/participants?search=peserta02",
            Some(&test_support::bearer_token(&teacher, ctx.state.settings())),
            None,
        ))
        .await
        .expect("list participants");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["id"], peserta.id.as_str());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/users/participants",
            Some(&test_support::bearer_token(&peserta, ctx.state.settings())),
            None,
        ))
        .await
        .expect("list participants");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inactive_user_token_is_rejected_by_guard() {
    let ctx = test_support::setup_test_context().await;

    let user = test_support::insert_user(ctx.state.db(), "peserta04", UserRole::Peserta).await;
    let token = test_support::bearer_token(&user, ctx.state.settings());

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(&user.id)
        .execute(ctx.state.db())
        .await
        .expect("deactivate user");

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/users/me", Some(&token), None))
        .await
        .expect("get me");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "response: {body}");
}

#[test]
fn default_limit_is_positive() {
    assert!(default_limit() > 0);
}
