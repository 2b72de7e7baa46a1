use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::errors::ApiError;
use crate::api::guards::{require_jadwal_owner, CurrentTeacher};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::submission::ResultResponse;

pub(super) async fn list_results(
    Path(jadwal_id): Path<String>,
    CurrentTeacher(teacher): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<Vec<ResultResponse>>, ApiError> {
    let jadwal = require_jadwal_owner(&state, &teacher, &jadwal_id).await?;

    let rows = repositories::results::list_for_jadwal(state.db(), &jadwal.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list results"))?;

    Ok(Json(rows.into_iter().map(ResultResponse::from_row).collect()))
}
