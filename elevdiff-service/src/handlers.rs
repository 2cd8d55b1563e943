//! HTTP request handlers for the elevation differential service.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use elevdiff::{project, BatchError, BatchPolicy, BatchProcessor, RowFormat, SegmentError, SegmentRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::{AppState, SharedSource};

/// Query parameters for the projection endpoint.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectQuery {
    /// Origin latitude in decimal degrees (-90 to 90).
    pub lat: f64,
    /// Origin longitude in decimal degrees (-180 to 180).
    pub lon: f64,
    /// Bearing in degrees clockwise from north (0 to 360).
    pub bearing: f64,
    /// Distance in meters (non-negative).
    pub distance: f64,
}

/// Projected destination.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectResponse {
    /// Destination latitude.
    pub lat: f64,
    /// Destination longitude (not normalized past ±180).
    pub lon: f64,
}

/// Body of a differential request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DifferentialRequest {
    /// Segment rows, e.g. `"41.2995 69.2401 45 1000"`.
    pub rows: Vec<String>,
    /// Row format: `whitespace` or `semicolon`. Defaults to the server setting.
    #[serde(default)]
    pub format: Option<String>,
    /// Batch policy: `fail-fast` or `collect-all`. Defaults to the server setting.
    #[serde(default)]
    pub policy: Option<String>,
}

/// One successful row.
#[derive(Debug, Serialize, ToSchema)]
pub struct RowDifferential {
    /// 1-based row number.
    pub row: usize,
    /// Signed differential in meters.
    pub value_m: f64,
    /// Differential rounded to two decimals.
    pub display: String,
}

/// Fail-fast result: one differential per row, in input order.
#[derive(Debug, Serialize, ToSchema)]
pub struct DifferentialResponse {
    pub differentials: Vec<RowDifferential>,
}

/// Outcome of one row under the collect-all policy.
#[derive(Debug, Serialize, ToSchema)]
pub struct RowOutcome {
    /// 1-based row number.
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// `malformed_row`, `out_of_range` or `missing_elevation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Collect-all result.
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectResponse {
    pub results: Vec<RowOutcome>,
    /// Number of rows that produced a differential.
    pub succeeded: usize,
    /// Number of rows that failed.
    pub failed: usize,
}

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// 1-based row number, for batch failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Machine-readable error kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ErrorResponse {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            row: None,
            kind: None,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Project the destination of a segment.
///
/// # Returns
///
/// - `200 OK` with the destination coordinate
/// - `400 Bad Request` if a parameter is missing or out of range
#[utoipa::path(
    get,
    path = "/project",
    tag = "differential",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Projected destination", body = ProjectResponse),
        (status = 400, description = "Parameter out of range", body = ErrorResponse)
    )
)]
pub async fn get_project(Query(query): Query<ProjectQuery>) -> Response {
    match SegmentRequest::new(query.lat, query.lon, query.bearing, query.distance) {
        Ok(request) => {
            let dest = project(request.origin(), request.bearing_deg(), request.distance_m());
            tracing::debug!(
                lat = query.lat,
                lon = query.lon,
                bearing = query.bearing,
                distance = query.distance,
                dest_lat = dest.lat,
                dest_lon = dest.lon,
                "Projected segment"
            );
            (
                StatusCode::OK,
                Json(ProjectResponse {
                    lat: dest.lat,
                    lon: dest.lon,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Projection rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                    row: None,
                    kind: Some(e.kind_name().to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Compute elevation differentials for a batch of rows.
///
/// Lookups block on the provider, so the batch runs on the blocking pool.
///
/// # Returns
///
/// - `200 OK` with differentials (fail-fast) or per-row outcomes (collect-all)
/// - `400 Bad Request` for an unknown format/policy or a malformed/out-of-range row
/// - `502 Bad Gateway` if an elevation could not be obtained
#[utoipa::path(
    post,
    path = "/differential",
    tag = "differential",
    request_body = DifferentialRequest,
    responses(
        (status = 200, description = "Fail-fast differentials", body = DifferentialResponse),
        (status = 400, description = "Invalid request or row", body = ErrorResponse),
        (status = 502, description = "Elevation provider failure", body = ErrorResponse)
    )
)]
#[axum::debug_handler]
pub async fn post_differential(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DifferentialRequest>,
) -> Response {
    let format = match request.format.as_deref().map(str::parse::<RowFormat>).transpose() {
        Ok(format) => format.unwrap_or_else(|| state.processor.format()),
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::message(message))).into_response()
        }
    };
    let policy = match request.policy.as_deref().map(str::parse::<BatchPolicy>).transpose() {
        Ok(policy) => policy.unwrap_or(state.policy),
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::message(message))).into_response()
        }
    };

    tracing::debug!(rows = request.rows.len(), ?format, ?policy, "Differential request");

    let processor = state.processor.clone().with_format(format);
    let rows = request.rows;
    match tokio::task::spawn_blocking(move || run_batch(&processor, policy, &rows)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Differential task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::message("differential task failed")),
            )
                .into_response()
        }
    }
}

fn run_batch(processor: &BatchProcessor<SharedSource>, policy: BatchPolicy, rows: &[String]) -> Response {
    match policy {
        BatchPolicy::FailFast => match processor.process_batch(rows) {
            Ok(differentials) => {
                tracing::info!(rows = differentials.len(), "Differentials computed");
                let differentials = differentials
                    .into_iter()
                    .enumerate()
                    .map(|(i, d)| RowDifferential {
                        row: i + 1,
                        value_m: d.value_m,
                        display: d.to_string(),
                    })
                    .collect();
                (StatusCode::OK, Json(DifferentialResponse { differentials })).into_response()
            }
            Err(e) => batch_error_response(e),
        },
        BatchPolicy::CollectAll => {
            let report = processor.process_batch_collect(rows);
            let succeeded = report.succeeded();
            let failed = report.failed();
            tracing::info!(succeeded, failed, "Differentials collected");

            let results = report
                .rows
                .into_iter()
                .enumerate()
                .map(|(i, result)| match result {
                    Ok(d) => RowOutcome {
                        row: i + 1,
                        value_m: Some(d.value_m),
                        display: Some(d.to_string()),
                        error: None,
                        kind: None,
                    },
                    Err(e) => RowOutcome {
                        row: e.row,
                        value_m: None,
                        display: None,
                        error: Some(e.kind.to_string()),
                        kind: Some(e.kind.kind_name().to_string()),
                    },
                })
                .collect();
            (
                StatusCode::OK,
                Json(CollectResponse {
                    results,
                    succeeded,
                    failed,
                }),
            )
                .into_response()
        }
    }
}

/// Map an aborted batch to its HTTP status and body.
fn batch_error_response(e: BatchError) -> Response {
    let status = match e.kind {
        SegmentError::MissingElevation { .. } => StatusCode::BAD_GATEWAY,
        SegmentError::MalformedRow { .. } | SegmentError::OutOfRange { .. } => {
            StatusCode::BAD_REQUEST
        }
    };

    tracing::warn!(row = e.row, error = %e.kind, "Batch aborted");

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            row: Some(e.row),
            kind: Some(e.kind.kind_name().to_string()),
        }),
    )
        .into_response()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
