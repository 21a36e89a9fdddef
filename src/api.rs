use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shuttle_axum::axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::detection::{
    DetectionPage, DetectionQuery, DetectionRecord, DetectionStatus, ReviewRequest,
    DEFAULT_LIST_WINDOW_DAYS, DEFAULT_PAGE_SIZE,
};
use crate::engine::{AnalyzeRequest, AnalyzeResponse, Capabilities, ModerationEngine};
use crate::error::EngineError;
use crate::reporting::Statistics;

/// Request header carrying caller capabilities, set by the upstream auth layer.
pub const CAPABILITY_HEADER: &str = "x-moderation-capability";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ModerationEngine>,
}

impl AppState {
    pub fn new(engine: ModerationEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/analyze", post(analyze))
        .route("/detections", get(list_detections))
        .route(
            "/detections/{id}",
            get(get_detection).delete(delete_detection),
        )
        .route("/detections/{id}/review", post(review_detection))
        .route("/statistics", get(statistics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body: `{"error": "<code>", "message": "..."}`.
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self(EngineError::Validation(e.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self(EngineError::Validation(e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status.is_server_error() {
            tracing::warn!(target: "moderation::api", error = %self.0, "request failed");
        }
        let body = serde_json::json!({
            "error": self.0.code(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

fn capabilities(headers: &HeaderMap) -> Capabilities {
    let can_moderate = headers
        .get_all(CAPABILITY_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|c| c.trim().eq_ignore_ascii_case("moderate"));
    Capabilities { can_moderate }
}

async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(req) = body?;
    let resp = state
        .engine
        .analyze(req, capabilities(&headers), Utc::now())
        .await?;
    Ok(Json(resp))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    scope_id: Option<String>,
    status: Option<DetectionStatus>,
    since_days: Option<u32>,
    limit: Option<usize>,
    offset: Option<usize>,
}

async fn list_detections(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<DetectionPage>, ApiError> {
    let Query(p) = params?;
    let query = DetectionQuery {
        scope_id: p.scope_id,
        status: p.status,
        limit: p.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        offset: p.offset.unwrap_or(0),
        ..DetectionQuery::since_days(
            Utc::now(),
            p.since_days.unwrap_or(DEFAULT_LIST_WINDOW_DAYS),
        )
    };
    Ok(Json(state.engine.list_detections(query).await?))
}

async fn get_detection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DetectionRecord>, ApiError> {
    Ok(Json(state.engine.get_detection(&id).await?))
}

async fn review_detection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<Json<DetectionRecord>, ApiError> {
    let Json(req) = body?;
    let updated = state.engine.review_detection(&id, req, Utc::now()).await?;
    Ok(Json(updated))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteParams {
    deleted_by: Option<String>,
}

async fn delete_detection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<DeleteParams>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let Query(p) = params?;
    state
        .engine
        .delete_detection(&id, p.deleted_by.as_deref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsParams {
    scope_id: Option<String>,
    window_days: Option<u32>,
}

async fn statistics(
    State(state): State<AppState>,
    params: Result<Query<StatsParams>, QueryRejection>,
) -> Result<Json<Statistics>, ApiError> {
    let Query(p) = params?;
    let stats = state
        .engine
        .statistics(p.scope_id.as_deref(), p.window_days, Utc::now())
        .await?;
    Ok(Json(stats))
}
