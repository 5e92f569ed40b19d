//! Lookup handler and JSON fallbacks.

use axum::{
    Json,
    extract::{Path, State},
};
use pokespeare_models::Subject;
use tracing::info;

use crate::http::errors::ApiError;
use crate::state::ApiState;

pub(crate) async fn describe_pokemon(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<Subject>, ApiError> {
    let subject = state.service.describe(&name).await?;
    info!(name = %subject.name, "description translated");
    Ok(Json(subject))
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::not_found("resource not found")
}

pub(crate) async fn method_not_allowed() -> ApiError {
    ApiError::method_not_allowed()
}
