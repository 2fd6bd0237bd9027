mod analyze;
mod history;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use graphlens_analyzer::{AnalyzeError, Analyzer};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{enforce_rate_limit, request_id, RateLimitState, RequestId};

/// Headroom over the encoded image size for JSON framing and multipart
/// boundaries.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub analyzer: Analyzer,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    service: &'static str,
    version: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "payload_too_large" => StatusCode::PAYLOAD_TOO_LARGE,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_unavailable" | "upstream_format_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(100).clamp(1, 500)
}

pub(super) fn map_db_error(request_id: String, error: &graphlens_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_analyze_error(request_id: String, error: &AnalyzeError) -> ApiError {
    match error {
        AnalyzeError::Validation(_) => {
            tracing::info!(error = %error, "rejected chart image");
            ApiError::new(request_id, error.code(), error.public_message())
        }
        AnalyzeError::UpstreamUnavailable(_) | AnalyzeError::UpstreamFormat(_) => {
            tracing::error!(error = %error, "analysis model call failed");
            ApiError::new(request_id, error.code(), error.public_message())
        }
        AnalyzeError::Store(_) => {
            tracing::error!(error = %error, "historical store failed");
            ApiError::new(request_id, "internal_error", error.public_message())
        }
    }
}

/// Largest request body accepted on the analyze routes: the base64 size of a
/// maximal image plus framing.
fn body_limit(max_image_bytes: usize) -> usize {
    max_image_bytes
        .div_ceil(3)
        .saturating_mul(4)
        .saturating_add(BODY_LIMIT_SLACK)
}

fn build_cors(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-request-id")])
        .expose_headers([HeaderName::from_static("x-request-id")])
}

fn analyze_router(rate_limit: RateLimitState, max_image_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/analyze/upload", post(analyze::analyze_upload))
        .route("/api/analyze/screencap", post(analyze::analyze_screencap))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(DefaultBodyLimit::max(body_limit(max_image_bytes))),
        )
}

pub fn build_app(state: AppState, rate_limit: RateLimitState, cors_origin: HeaderValue) -> Router {
    let max_image_bytes = state.analyzer.config().max_image_bytes;
    let public_routes = Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/history", get(history::list_history));

    Router::new()
        .merge(public_routes)
        .merge(analyze_router(rate_limit, max_image_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors(cors_origin))
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn root(Extension(req_id): Extension<RequestId>) -> Json<ApiResponse<ServiceInfo>> {
    Json(ApiResponse {
        data: ServiceInfo {
            service: "graphlens",
            version: env!("CARGO_PKG_VERSION"),
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match graphlens_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
