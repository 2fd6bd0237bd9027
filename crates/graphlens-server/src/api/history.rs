use axum::{
    extract::{Query, State},
    Extension, Json,
};
use graphlens_core::{normalize_metric_name, HistoricalDataPoint};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    pub metric: Option<String>,
    pub limit: Option<i64>,
}

pub(super) async fn list_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<HistoricalDataPoint>>>, ApiError> {
    let metric = query.metric.as_deref().and_then(normalize_metric_name);

    let rows = graphlens_db::list_history(
        &state.pool,
        metric.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(HistoricalDataPoint::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
