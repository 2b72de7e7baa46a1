use axum::http::{Method, StatusCode};
use serde_json::json;
use time::macros::datetime;
use tower::ServiceExt;

use crate::db::types::{JadwalStatus, RegistrationStatus, UserRole};
use crate::repositories;
use crate::test_support;

#[tokio::test]
async fn self_registration_creates_pending_row_once() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_user(ctx.state.db(), "dosen20", UserRole::Teacher).await;
    let peserta = test_support::insert_user(ctx.state.db(), "mhs20", UserRole::Peserta).await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &teacher.id,
        "Tes Bahasa",
        datetime!(2030-07-01 09:00),
        datetime!(2030-07-01 11:00),
    )
    .await;
    let token = test_support::bearer_token(&peserta, ctx.state.settings());
    let uri = format!("/api/v1/jadwal/{}/daftar", jadwal.id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &uri, Some(&token), None))
        .await
        .expect("register");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["status"], "menunggu");
    assert_eq!(body["cara_daftar"], "mandiri");

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::POST, &uri, Some(&token), None))
        .await
        .expect("register again");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn self_registration_on_closed_schedule_is_rejected() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_user(ctx.state.db(), "dosen21", UserRole::Teacher).await;
    let peserta = test_support::insert_user(ctx.state.db(), "mhs21", UserRole::Peserta).await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &teacher.id,
        "Tes Tertutup",
        datetime!(2030-07-02 09:00),
        datetime!(2030-07-02 11:00),
    )
    .await;
    repositories::jadwal::set_status(
        ctx.state.db(),
        &jadwal.id,
        JadwalStatus::Tutup,
        jadwal.updated_at,
    )
    .await
    .expect("close jadwal");
    let token = test_support::bearer_token(&peserta, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/jadwal/{}/daftar", jadwal.id),
            Some(&token),
            None,
        ))
        .await
        .expect("register");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let row = repositories::registrations::find_for_pair(ctx.state.db(), &jadwal.id, &peserta.id)
        .await
        .expect("lookup registration");
    assert!(row.is_none());
}

#[tokio::test]
async fn incomplete_profile_lists_missing_fields() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_user(ctx.state.db(), "dosen22", UserRole::Teacher).await;
    let peserta = test_support::insert_user_without_profile(ctx.state.db(), "mhs22").await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &teacher.id,
        "Tes Profil",
        datetime!(2030-07-03 09:00),
        datetime!(2030-07-03 11:00),
    )
    .await;
    let token = test_support::bearer_token(&peserta, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/jadwal/{}/daftar", jadwal.id),
            Some(&token),
            None,
        ))
        .await
        .expect("register");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    let detail = body["detail"].as_str().unwrap_or("");
    assert!(detail.contains("NPM"), "detail: {detail}");
    assert!(detail.contains("Program Studi"), "detail: {detail}");
}

#[tokio::test]
async fn teacher_registration_skips_existing_and_reports_unknown() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_user(ctx.state.db(), "dosen23", UserRole::Teacher).await;
    let rejected = test_support::insert_user(ctx.state.db(), "mhs23a", UserRole::Peserta).await;
    let fresh = test_support::insert_user(ctx.state.db(), "mhs23b", UserRole::Peserta).await;
    let colleague = test_support::insert_user(ctx.state.db(), "dosen23b", UserRole::Teacher).await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &teacher.id,
        "Tes Massal",
        datetime!(2030-07-04 09:00),
        datetime!(2030-07-04 11:00),
    )
    .await;
    test_support::register(ctx.state.db(), &jadwal.id, &rejected.id, RegistrationStatus::Ditolak)
        .await;
    let token = test_support::bearer_token(&teacher, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/jadwal/{}/peserta/daftarkan", jadwal.id),
            Some(&token),
            Some(json!({
                "peserta_ids": [rejected.id, fresh.id, colleague.id, "tidak-ada", fresh.id]
            })),
        ))
        .await
        .expect("teacher register");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["success_count"], 1);
    assert_eq!(body["skipped"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["skipped"][0]["peserta_id"], rejected.id);
    assert_eq!(body["failed"].as_array().map(Vec::len), Some(2));

    let registration =
        repositories::registrations::find_for_pair(ctx.state.db(), &jadwal.id, &fresh.id)
            .await
            .expect("lookup registration")
            .expect("registration");
    assert_eq!(registration.status, RegistrationStatus::Disetujui);
    assert_eq!(registration.approved_by.as_deref(), Some(teacher.id.as_str()));

    let untouched =
        repositories::registrations::find_for_pair(ctx.state.db(), &jadwal.id, &rejected.id)
            .await
            .expect("lookup registration")
            .expect("registration");
    assert_eq!(untouched.status, RegistrationStatus::Ditolak);
}

#[tokio::test]
async fn bulk_approve_moves_only_pending_rows() {
    let ctx = test_support::setup_test_context().await;

    let teacher = test_support::insert_user(ctx.state.db(), "dosen24", UserRole::Teacher).await;
    let waiting = test_support::insert_user(ctx.state.db(), "mhs24a", UserRole::Peserta).await;
    let rejected = test_support::insert_user(ctx.state.db(), "mhs24b", UserRole::Peserta).await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &teacher.id,
        "Tes Persetujuan",
        datetime!(2030-07-05 09:00),
        datetime!(2030-07-05 11:00),
    )
    .await;
    let pending_row =
        test_support::register(ctx.state.db(), &jadwal.id, &waiting.id, RegistrationStatus::Menunggu)
            .await;
    let rejected_row =
        test_support::register(ctx.state.db(), &jadwal.id, &rejected.id, RegistrationStatus::Ditolak)
            .await;
    let token = test_support::bearer_token(&teacher, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/jadwal/{}/peserta/bulk-approve", jadwal.id),
            Some(&token),
            Some(json!({ "ids": [pending_row.id, rejected_row.id] })),
        ))
        .await
        .expect("bulk approve");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["affected"], 1);

    let still_rejected =
        repositories::registrations::find_in_jadwal(ctx.state.db(), &jadwal.id, &rejected_row.id)
            .await
            .expect("lookup")
            .expect("registration");
    assert_eq!(still_rejected.status, RegistrationStatus::Ditolak);
}

#[tokio::test]
async fn single_reject_records_note_and_other_teachers_are_forbidden() {
    let ctx = test_support::setup_test_context().await;

    let owner = test_support::insert_user(ctx.state.db(), "dosen25a", UserRole::Teacher).await;
    let other = test_support::insert_user(ctx.state.db(), "dosen25b", UserRole::Teacher).await;
    let peserta = test_support::insert_user(ctx.state.db(), "mhs25", UserRole::Peserta).await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &owner.id,
        "Tes Penolakan",
        datetime!(2030-07-06 09:00),
        datetime!(2030-07-06 11:00),
    )
    .await;
    let row =
        test_support::register(ctx.state.db(), &jadwal.id, &peserta.id, RegistrationStatus::Disetujui)
            .await;
    let uri = format!("/api/v1/jadwal/{}/peserta/{}/reject", jadwal.id, row.id);

    let other_token = test_support::bearer_token(&other, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::POST, &uri, Some(&other_token), None))
        .await
        .expect("foreign reject");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let owner_token = test_support::bearer_token(&owner, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &uri,
            Some(&owner_token),
            Some(json!({ "keterangan": "Kuota penuh" })),
        ))
        .await
        .expect("reject");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "ditolak");
    assert_eq!(body["keterangan"], "Kuota penuh");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/jadwal/{}/peserta/{}", jadwal.id, row.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("unregister");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn approving_after_a_reject_clears_the_note() {
    let ctx = test_support::setup_test_context().await;

    let owner = test_support::insert_user(ctx.state.db(), "dosen26", UserRole::Teacher).await;
    let first = test_support::insert_user(ctx.state.db(), "mhs26a", UserRole::Peserta).await;
    let second = test_support::insert_user(ctx.state.db(), "mhs26b", UserRole::Peserta).await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &owner.id,
        "Tes Catatan",
        datetime!(2030-07-07 09:00),
        datetime!(2030-07-07 11:00),
    )
    .await;
    let first_row =
        test_support::register(ctx.state.db(), &jadwal.id, &first.id, RegistrationStatus::Menunggu)
            .await;
    let second_row =
        test_support::register(ctx.state.db(), &jadwal.id, &second.id, RegistrationStatus::Menunggu)
            .await;
    let token = test_support::bearer_token(&owner, ctx.state.settings());
    let decide_uri = |row_id: &str, action: &str| {
        format!("/api/v1/jadwal/{}/peserta/{}/{}", jadwal.id, row_id, action)
    };

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &decide_uri(&first_row.id, "reject"),
            Some(&token),
            Some(json!({ "keterangan": "Berkas belum lengkap" })),
        ))
        .await
        .expect("reject");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &decide_uri(&first_row.id, "approve"),
            Some(&token),
            None,
        ))
        .await
        .expect("approve");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "disetujui");
    assert!(body["keterangan"].is_null());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &decide_uri(&second_row.id, "reject"),
            Some(&token),
            None,
        ))
        .await
        .expect("reject without note");
    assert_eq!(response.status(), StatusCode::OK);

    let approved =
        repositories::registrations::find_in_jadwal(ctx.state.db(), &jadwal.id, &first_row.id)
            .await
            .expect("lookup")
            .expect("registration");
    assert_eq!(approved.status, RegistrationStatus::Disetujui);
    assert!(approved.keterangan.is_none());
    let rejected =
        repositories::registrations::find_in_jadwal(ctx.state.db(), &jadwal.id, &second_row.id)
            .await
            .expect("lookup")
            .expect("registration");
    assert_eq!(rejected.status, RegistrationStatus::Ditolak);
    assert!(rejected.keterangan.is_none());
}

#[tokio::test]
async fn bulk_reject_stores_the_note_on_pending_rows_only() {
    let ctx = test_support::setup_test_context().await;

    let owner = test_support::insert_user(ctx.state.db(), "dosen27", UserRole::Teacher).await;
    let waiting = test_support::insert_user(ctx.state.db(), "mhs27a", UserRole::Peserta).await;
    let approved = test_support::insert_user(ctx.state.db(), "mhs27b", UserRole::Peserta).await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &owner.id,
        "Tes Tolak Massal",
        datetime!(2030-07-08 09:00),
        datetime!(2030-07-08 11:00),
    )
    .await;
    let waiting_row =
        test_support::register(ctx.state.db(), &jadwal.id, &waiting.id, RegistrationStatus::Menunggu)
            .await;
    let approved_row = test_support::register(
        ctx.state.db(),
        &jadwal.id,
        &approved.id,
        RegistrationStatus::Disetujui,
    )
    .await;
    let token = test_support::bearer_token(&owner, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/jadwal/{}/peserta/bulk-reject", jadwal.id),
            Some(&token),
            Some(json!({
                "ids": [waiting_row.id, approved_row.id, waiting_row.id],
                "keterangan": "Kuota penuh"
            })),
        ))
        .await
        .expect("bulk reject");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["affected"], 1);

    let rejected =
        repositories::registrations::find_in_jadwal(ctx.state.db(), &jadwal.id, &waiting_row.id)
            .await
            .expect("lookup")
            .expect("registration");
    assert_eq!(rejected.status, RegistrationStatus::Ditolak);
    assert_eq!(rejected.keterangan.as_deref(), Some("Kuota penuh"));
    assert_eq!(rejected.approved_by.as_deref(), Some(owner.id.as_str()));

    let untouched =
        repositories::registrations::find_in_jadwal(ctx.state.db(), &jadwal.id, &approved_row.id)
            .await
            .expect("lookup")
            .expect("registration");
    assert_eq!(untouched.status, RegistrationStatus::Disetujui);
    assert!(untouched.keterangan.is_none());
}

#[tokio::test]
async fn unregister_removes_rows_once() {
    let ctx = test_support::setup_test_context().await;

    let owner = test_support::insert_user(ctx.state.db(), "dosen28", UserRole::Teacher).await;
    let jadwal = test_support::insert_jadwal(
        ctx.state.db(),
        &owner.id,
        "Tes Hapus Peserta",
        datetime!(2030-07-09 09:00),
        datetime!(2030-07-09 11:00),
    )
    .await;
    let mut rows = Vec::new();
    for username in ["mhs28a", "mhs28b", "mhs28c"] {
        let peserta = test_support::insert_user(ctx.state.db(), username, UserRole::Peserta).await;
        rows.push(
            test_support::register(
                ctx.state.db(),
                &jadwal.id,
                &peserta.id,
                RegistrationStatus::Disetujui,
            )
            .await,
        );
    }
    let token = test_support::bearer_token(&owner, ctx.state.settings());
    let single_uri = format!("/api/v1/jadwal/{}/peserta/{}", jadwal.id, rows[0].id);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::DELETE, &single_uri, Some(&token), None))
        .await
        .expect("unregister");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(Method::DELETE, &single_uri, Some(&token), None))
        .await
        .expect("unregister again");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/jadwal/{}/peserta/bulk-delete", jadwal.id),
            Some(&token),
            Some(json!({ "ids": [rows[0].id, rows[1].id, rows[2].id, "tidak-ada"] })),
        ))
        .await
        .expect("bulk unregister");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["affected"], 2);

    let remaining: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM jadwal_peserta WHERE id_jadwal = $1")
            .bind(&jadwal.id)
            .fetch_one(ctx.state.db())
            .await
            .expect("count registrations");
    assert_eq!(remaining, 0);
}
