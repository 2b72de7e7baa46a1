mod corrections;
mod enter;
mod gate;
mod results;
mod submit;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::core::state::AppState;

/// Mounted under `/jadwal`.
pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:jadwal_id/enter", post(enter::enter_test))
        .route("/:jadwal_id/jawaban", put(submit::autosave_answer))
        .route("/:jadwal_id/submit", post(submit::submit_test))
        .route("/:jadwal_id/hasil", get(results::list_results))
        .route("/:jadwal_id/hasil/bulk-delete", post(corrections::bulk_delete_results))
        .route(
            "/:jadwal_id/hasil/:peserta_id",
            get(corrections::show_correction)
                .put(corrections::update_correction)
                .delete(corrections::delete_result),
        )
}
