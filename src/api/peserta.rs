use axum::{extract::State, routing::get, Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentPeserta;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::registration::MyRegistrationItem;
use crate::schemas::submission::HistoryItem;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/registrations", get(my_registrations))
        .route("/riwayat", get(my_history))
}

async fn my_registrations(
    CurrentPeserta(peserta): CurrentPeserta,
    State(state): State<AppState>,
) -> Result<Json<Vec<MyRegistrationItem>>, ApiError> {
    let rows = repositories::registrations::list_for_peserta(state.db(), &peserta.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list registrations"))?;

    Ok(Json(rows.into_iter().map(MyRegistrationItem::from_row).collect()))
}

async fn my_history(
    CurrentPeserta(peserta): CurrentPeserta,
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryItem>>, ApiError> {
    let rows = repositories::results::list_for_user(state.db(), &peserta.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load test history"))?;

    Ok(Json(rows.into_iter().map(HistoryItem::from_row).collect()))
}
