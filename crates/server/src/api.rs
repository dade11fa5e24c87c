//! HTTP surface of the recommendation engine.
//!
//! - `GET  /health`                          engine liveness and catalog size
//! - `GET  /recommend/{productId}`           product-anchored recommendations
//! - `GET  /recommend/personalized/{userId}` history-driven recommendations
//! - `POST /track`                           record one user interaction
//! - `POST /refresh`                         force a full engine rebuild
//! - `GET  /stats`                           catalog, cache and interaction counters

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use recommender_core::engine::{
    parse_count, parse_flag, PersonalizedRequest, PersonalizedResponse, RecommendationRequest,
    RecommendationResponse, RefreshReport, StatsResponse, TrackRequest, TrackResponse,
};
use recommender_core::{ApplicationError, DomainError, InterfaceError, Method, RecommendationEngine};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::health::health;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
}

impl AppState {
    pub fn new(engine: Arc<RecommendationEngine>) -> Self {
        Self { engine }
    }
}

pub fn router(engine: Arc<RecommendationEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/recommend/{product_id}", get(recommend))
        .route("/recommend/personalized/{user_id}", get(personalized))
        .route("/track", post(track))
        .route("/refresh", post(refresh))
        .route("/stats", get(stats))
        .with_state(AppState::new(engine))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

/// Handler failure already mapped to the interface layer.
#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl ApiError {
    fn new(error: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        let interface = error.into_interface(correlation_id);
        match &interface {
            InterfaceError::BadRequest { message, correlation_id } => warn!(
                event_name = "recommender.api.bad_request",
                correlation_id = %correlation_id,
                error = %message,
                "rejected malformed request"
            ),
            InterfaceError::ServiceUnavailable { message, correlation_id }
            | InterfaceError::Internal { message, correlation_id } => error!(
                event_name = "recommender.api.internal_error",
                correlation_id = %correlation_id,
                error = %message,
                "request failed"
            ),
        }
        Self(interface)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(DomainError::InvalidRequest(message.into()).into())
    }
}

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        Self::new(value)
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        Self::new(value.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self.0 {
            InterfaceError::BadRequest { message, .. } => {
                (StatusCode::BAD_REQUEST, message.clone())
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{} (correlation id {})", other.user_message(), other.correlation_id()),
            ),
        };
        (status, Json(ErrorBody { success: false, error })).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Query string of `GET /recommend/{productId}`. Kept as raw strings so malformed
/// values surface as a JSON 400 instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RecommendQuery {
    pub n: Option<String>,
    pub method: Option<String>,
    pub user_id: Option<String>,
    pub category_filter: Option<String>,
    pub cache: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PersonalizedQuery {
    pub n: Option<String>,
    pub category: Option<String>,
}

async fn recommend(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<RecommendQuery>,
) -> Result<Json<RecommendationResponse>, ApiError> {
    let config = state.engine.config();
    let count = parse_count(query.n.as_deref(), config.default_count, config.max_count)?;
    let method = query.method.as_deref().map(Method::parse_lenient).unwrap_or(Method::Hybrid);

    let request = RecommendationRequest::new(product_id, count)
        .method(method)
        .category_filter(parse_flag(query.category_filter.as_deref(), true))
        .use_cache(parse_flag(query.cache.as_deref(), true))
        .user_id(query.user_id);

    let response = state.engine.recommend(&request).await?;
    Ok(Json(response))
}

async fn personalized(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PersonalizedQuery>,
) -> Result<Json<PersonalizedResponse>, ApiError> {
    let config = state.engine.config();
    let count =
        parse_count(query.n.as_deref(), config.personalized_default_count, config.max_count)?;

    let request = PersonalizedRequest::new(user_id, count).category(query.category);
    let response = state.engine.personalized(&request).await?;
    Ok(Json(response))
}

async fn track(
    State(state): State<AppState>,
    payload: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<Json<TrackResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let interaction = payload.into_interaction()?;

    let response = state.engine.track(interaction).await?;
    Ok(Json(response))
}

async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshReport>, ApiError> {
    let report = state.engine.refresh().await?;
    info!(
        event_name = "recommender.api.refreshed",
        products_loaded = report.products_loaded,
        generation = report.generation,
        "manual refresh completed"
    );
    Ok(Json(report))
}

async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.engine.stats().await?;
    Ok(Json(StatsResponse { success: true, stats }))
}
