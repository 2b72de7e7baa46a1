//! `Buka -> Tutup` auto-expiry plus the manual status path.
//!
//! The automatic transition only ever closes. Reopening is an explicit owner
//! action and is refused when the sweep would close the schedule again.

use sqlx::PgExecutor;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Jadwal;
use crate::db::types::JadwalStatus;
use crate::repositories;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum StatusChangeError {
    #[error("Jadwal is already {0:?}")]
    Unchanged(JadwalStatus),
    #[error("Jadwal has ended and auto_close is enabled; extend tanggal_berakhir or disable auto_close before reopening")]
    WouldAutoClose,
}

pub(crate) fn should_auto_close(
    status: JadwalStatus,
    auto_close: bool,
    tanggal_berakhir: PrimitiveDateTime,
    now: PrimitiveDateTime,
) -> bool {
    status == JadwalStatus::Buka && auto_close && now > tanggal_berakhir
}

pub(crate) fn check_status_change(
    jadwal: &Jadwal,
    target: JadwalStatus,
    now: PrimitiveDateTime,
) -> Result<(), StatusChangeError> {
    if jadwal.status == target {
        return Err(StatusChangeError::Unchanged(target));
    }
    if should_auto_close(target, jadwal.auto_close, jadwal.tanggal_berakhir, now) {
        return Err(StatusChangeError::WouldAutoClose);
    }
    Ok(())
}

pub(crate) async fn sweep(
    executor: impl PgExecutor<'_>,
    now: PrimitiveDateTime,
    trigger: &'static str,
) -> Result<u64, sqlx::Error> {
    let closed = repositories::jadwal::close_expired(executor, now).await?;
    metrics::record_auto_closed(closed, trigger);
    if closed > 0 {
        tracing::info!(action = "jadwal_auto_close", trigger, closed, "Closed expired jadwal");
    }
    Ok(closed)
}

/// Runs the sweep ahead of a schedule read. A failure is logged and the read
/// continues with whatever status is stored.
pub(crate) async fn sweep_before_read(state: &AppState) {
    if let Err(err) = sweep(state.db(), primitive_now_utc(), "read").await {
        tracing::warn!(error = %err, "Jadwal expiry sweep failed; serving stored status");
    }
}
