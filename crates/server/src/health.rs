use axum::{extract::State, Json};
use recommender_core::engine::HealthSummary;

use crate::api::AppState;

/// Liveness plus the size and age of the published catalog generation. Always 200:
/// an empty catalog is a valid, if degraded, serving state.
pub async fn health(State(state): State<AppState>) -> Json<HealthSummary> {
    Json(state.engine.health())
}
