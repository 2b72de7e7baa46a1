mod handlers;
mod helpers;
mod queries;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_jadwal).post(handlers::create_jadwal))
        .route("/bulk-destroy", post(handlers::bulk_destroy_jadwal))
        .route(
            "/:jadwal_id",
            get(handlers::get_jadwal).put(handlers::update_jadwal).delete(handlers::delete_jadwal),
        )
        .route("/:jadwal_id/close", post(handlers::close_jadwal))
        .route("/:jadwal_id/reopen", post(handlers::reopen_jadwal))
        .route("/:jadwal_id/soal", get(handlers::list_soal).post(handlers::create_soal))
        .route("/:jadwal_id/soal/:soal_id", delete(handlers::delete_soal))
}
