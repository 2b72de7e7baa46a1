use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::api::client_ip::ClientIp;
use crate::api::errors::ApiError;
use crate::api::guards::{require_jadwal_owner, CurrentPeserta, CurrentTeacher};
use crate::api::pagination::{default_limit, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::repositories;
use crate::schemas::violation::{ViolationReport, ViolationResponse};

const MAX_USER_AGENT_LEN: usize = 512;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(report_violation))
}

/// Owner listing, mounted under `/jadwal`.
pub(crate) fn jadwal_router() -> Router<AppState> {
    Router::new().route("/:jadwal_id/violations", get(list_violations))
}

#[derive(Debug, Deserialize)]
struct ListViolationsQuery {
    peserta_id: Option<String>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

/// Always answers `202 Accepted`; storage problems are only logged.
async fn report_violation(
    CurrentPeserta(peserta): CurrentPeserta,
    ClientIp(client_ip): ClientIp,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ViolationReport>,
) -> Result<StatusCode, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.chars().take(MAX_USER_AGENT_LEN).collect::<String>());

    let stored = repositories::violations::create(
        state.db(),
        repositories::violations::CreateViolation {
            id: &Uuid::new_v4().to_string(),
            jadwal_id: &payload.jadwal_id,
            peserta_id: &peserta.id,
            violation_type: &payload.violation_type,
            detection_method: payload.detection_method.as_deref(),
            context: payload.context,
            ip_address: client_ip.map(|ip| ip.to_string()),
            user_agent,
            violation_time: payload.violation_time.map(to_primitive_utc).unwrap_or(now),
            created_at: now,
        },
    )
    .await;

    match stored {
        Ok(()) => tracing::info!(
            user_id = %peserta.id,
            jadwal_id = %payload.jadwal_id,
            violation_type = %payload.violation_type,
            action = "violation_report",
            "Violation reported"
        ),
        Err(err) => tracing::warn!(
            error = %err,
            user_id = %peserta.id,
            jadwal_id = %payload.jadwal_id,
            "Failed to store violation report"
        ),
    }

    Ok(StatusCode::ACCEPTED)
}

async fn list_violations(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
    Query(params): Query<ListViolationsQuery>,
) -> Result<Json<PaginatedResponse<ViolationResponse>>, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let (items, total_count) = repositories::violations::list_for_jadwal(
        state.db(),
        &jadwal.id,
        params.peserta_id.as_deref(),
        skip,
        limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list violations"))?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(ViolationResponse::from_db).collect(),
        total_count,
        skip,
        limit,
    }))
}
