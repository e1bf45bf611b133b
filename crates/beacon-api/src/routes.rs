use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use beacon_processing::{
    extract_gateway_id, BatchSummary, IngestError, IngestOutcome, IngestRequest,
};
use beacon_repository::{ErrorLogEntry, ErrorLogStore};
use serde_json::{json, Value};
use tracing::{error, info_span, Instrument};

use crate::state::AppState;

const ERROR_LOG_SOURCE: &str = "ingest";

/// Request bodies above this size are answered with 413.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// A failed request, rendered as `{ success: false, error }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<&IngestError> for ApiError {
    fn from(err: &IngestError) -> Self {
        let status = match err {
            IngestError::MissingGatewayId => StatusCode::BAD_REQUEST,
            IngestError::GatewayNotFound(_) => StatusCode::NOT_FOUND,
            IngestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            IngestError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
        };
        Self::new(status, err.to_string())
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "success": false, "error": self.message }));
        (self.status, body).into_response()
    }
}

pub async fn ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let body = body?;
    let payload = parse_body(&body)?;

    let mut request = IngestRequest::new(payload);
    for (name, value) in &headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    request.query = query;

    let gateway_mac = extract_gateway_id(&request).map(|id| id.normalized);
    let span = info_span!("ingest", gateway_mac = gateway_mac.as_deref().unwrap_or(""));

    match state.pipeline().run(request).instrument(span).await {
        Ok(outcome) => Ok(Json(render_outcome(outcome))),
        Err(err) => {
            if matches!(err, IngestError::Store(_) | IngestError::TimedOut(_)) {
                error!(gateway_mac = gateway_mac.as_deref(), error = %err, "ingestion failed");
                record_failure(&state, &err, gateway_mac.as_deref(), &body).await;
            }
            Err(ApiError::from(&err))
        }
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "method not allowed, use POST")
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, format!("invalid JSON body: {err}")))
}

fn render_outcome(outcome: IngestOutcome) -> Value {
    match outcome {
        IngestOutcome::Completed(summary) => render_summary(&summary),
        IngestOutcome::NoReports { gateway } => json!({
            "success": true,
            "gateway": gateway,
            "received": 0,
            "processed": 0,
            "message": "no beacon reports in request body",
        }),
        IngestOutcome::NoAllowedUuids { gateway, received } => json!({
            "success": true,
            "gateway": gateway,
            "received": received,
            "processed": 0,
            "message": "no allowed service UUIDs configured; reports ignored",
        }),
    }
}

fn render_summary(summary: &BatchSummary) -> Value {
    json!({
        "success": true,
        "gateway": summary.gateway,
        "received": summary.received,
        "processed": summary.processed,
        "skipped": summary.skipped,
        "filteredByUuid": summary.filtered_by_uuid,
        "errors": summary.errors,
        "processingTime": format!("{}ms", summary.elapsed.as_millis()),
        "results": summary.results,
    })
}

/// Best effort: a failing error log never changes the response.
async fn record_failure(
    state: &AppState,
    err: &IngestError,
    gateway_mac: Option<&str>,
    body: &Bytes,
) {
    let received = serde_json::from_slice::<Value>(body).unwrap_or(Value::Null);
    let entry = ErrorLogEntry::new(
        ERROR_LOG_SOURCE,
        err.to_string(),
        json!({ "gatewayMac": gateway_mac, "body": received }),
    );

    if let Err(log_err) = state.store().append_error(&entry).await {
        error!(error = %log_err, "failed to write ingestion error log");
    }
}
