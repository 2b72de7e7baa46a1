use std::net::IpAddr;

use sqlx::PgConnection;
use time::{Duration, PrimitiveDateTime};

use crate::api::errors::ApiError;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Jadwal, TestResult, User};
use crate::repositories;
use crate::services::access_gate::{self, Denial, Entry, GateInput};
use crate::services::jadwal_lifecycle;

pub(super) struct Admission {
    pub(super) jadwal: Jadwal,
    pub(super) attempt: Option<TestResult>,
    pub(super) entry: Entry,
    pub(super) now: PrimitiveDateTime,
}

async fn load_jadwal(state: &AppState, jadwal_id: &str) -> Result<Jadwal, ApiError> {
    repositories::jadwal::find_by_id(state.db(), jadwal_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch jadwal"))?
        .ok_or_else(|| ApiError::NotFound("Jadwal tidak ditemukan".to_string()))
}

/// Loads fresh schedule state and runs the access gate for `peserta`.
pub(super) async fn admit(
    state: &AppState,
    peserta: &User,
    jadwal_id: &str,
    client_ip: Option<IpAddr>,
) -> Result<Admission, ApiError> {
    jadwal_lifecycle::sweep_before_read(state).await;

    let jadwal = load_jadwal(state, jadwal_id).await?;

    let registration =
        repositories::registrations::find_for_pair(state.db(), &jadwal.id, &peserta.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch registration"))?;
    let attempt = repositories::results::find_for_pair(state.db(), &peserta.id, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    let now = primitive_now_utc();
    let verdict = access_gate::evaluate(&GateInput {
        jadwal: &jadwal,
        registration: registration.as_ref(),
        attempt: attempt.as_ref(),
        now,
        client_ip,
        allowed_ranges: &state.settings().schedule().allowed_ip_ranges,
    });

    match verdict {
        Ok(entry) => Ok(Admission { jadwal, attempt, entry, now }),
        Err(denial) => {
            tracing::info!(
                user_id = %peserta.id,
                jadwal_id = %jadwal.id,
                reason = denial.code(),
                client_ip = ?client_ip,
                "Access to jadwal denied"
            );
            Err(denial_error(denial))
        }
    }
}

pub(super) struct OpenAttempt {
    pub(super) jadwal: Jadwal,
    pub(super) attempt: TestResult,
    pub(super) now: PrimitiveDateTime,
}

/// Locks the participant's in-progress attempt for writing answers.
///
/// Only the registration and the attempt itself are consulted, so answers
/// still land after the sweep closes the schedule, up to the configured
/// grace past the attempt deadline.
pub(super) async fn lock_open_attempt(
    conn: &mut PgConnection,
    state: &AppState,
    peserta: &User,
    jadwal_id: &str,
) -> Result<OpenAttempt, ApiError> {
    let jadwal = load_jadwal(state, jadwal_id).await?;

    let registration =
        repositories::registrations::find_for_pair(&mut *conn, &jadwal.id, &peserta.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch registration"))?;
    let attempt = repositories::results::lock_for_pair(&mut *conn, &peserta.id, &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to lock attempt"))?;

    let now = primitive_now_utc();
    let grace = Duration::seconds(
        i64::try_from(state.settings().schedule().submit_grace_seconds).unwrap_or(i64::MAX),
    );

    if let Err(denial) =
        access_gate::check_answering(registration.as_ref(), attempt.as_ref(), now, grace)
    {
        tracing::info!(
            user_id = %peserta.id,
            jadwal_id = %jadwal.id,
            reason = denial.code(),
            "Answer write denied"
        );
        return Err(denial_error(denial));
    }

    let attempt = attempt.ok_or_else(|| denial_error(Denial::NotEntered))?;
    Ok(OpenAttempt { jadwal, attempt, now })
}

pub(super) fn denial_error(denial: Denial) -> ApiError {
    metrics::record_access_denied(denial.code());
    match denial {
        Denial::AlreadySubmitted => ApiError::AlreadySubmitted(denial.message().to_string()),
        other => ApiError::Forbidden(other.message()),
    }
}
