mod handlers;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::core::state::AppState;

/// Mounted under `/jadwal` next to the schedule routes.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:jadwal_id/peserta", get(handlers::list_registrations))
        .route("/:jadwal_id/daftar", post(handlers::register_self))
        .route("/:jadwal_id/peserta/daftarkan", post(handlers::register_by_teacher))
        .route("/:jadwal_id/peserta/bulk-approve", post(handlers::bulk_approve))
        .route("/:jadwal_id/peserta/bulk-reject", post(handlers::bulk_reject))
        .route("/:jadwal_id/peserta/bulk-delete", post(handlers::bulk_unregister))
        .route("/:jadwal_id/peserta/:registration_id", delete(handlers::unregister))
        .route("/:jadwal_id/peserta/:registration_id/approve", post(handlers::approve))
        .route("/:jadwal_id/peserta/:registration_id/reject", post(handlers::reject))
        .route(
            "/:jadwal_id/peserta/:registration_id/izinkan-lanjut",
            post(handlers::allow_resume),
        )
}

#[cfg(test)]
mod tests;
