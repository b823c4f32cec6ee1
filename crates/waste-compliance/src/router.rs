use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{AreaCode, IndicatorSnapshot, ReportingWindow, WindowError};
use crate::repository::ComplianceStore;
use crate::scoring::WorkPlanInput;
use crate::service::{ComplianceService, ComplianceServiceError, ImportKind, SavedSnapshot};

/// Router builder exposing uploads, indicators, scoring and alerts.
pub fn compliance_router<S>(service: Arc<ComplianceService<S>>) -> Router
where
    S: ComplianceStore + 'static,
{
    Router::new()
        .route("/api/v1/uploads/:kind", post(upload_handler::<S>))
        .route(
            "/api/v1/indicators/work-plan",
            post(work_plan_handler::<S>),
        )
        .route(
            "/api/v1/indicators/composite",
            post(composite_handler::<S>),
        )
        .route("/api/v1/indicators/:indicator", get(indicator_handler::<S>))
        .route(
            "/api/v1/service-requests/:key/evidence",
            post(evidence_handler::<S>),
        )
        .route("/api/v1/classify", get(classify_handler::<S>))
        .route("/api/v1/alerts", get(alerts_handler::<S>))
        .route(
            "/api/v1/maintenance/legacy-bulk-pickup",
            post(remediation_handler::<S>),
        )
        .with_state(service)
}

/// Indicators derived from stored events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventIndicator {
    ComplaintRate,
    ResponseRate,
    InspectionQuality,
}

fn window_between(start: NaiveDate, end: NaiveDate) -> Result<ReportingWindow, WindowError> {
    ReportingWindow::new(start.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN))
}

/// Window bounds are calendar dates; `end` is exclusive.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorParams {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub area: Option<AreaCode>,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkPlanRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub labor: Decimal,
    pub equipment: Decimal,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompositeRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub area: Option<AreaCode>,
    #[serde(default = "default_work_plan")]
    pub work_plan: WorkPlanInput,
}

fn default_work_plan() -> WorkPlanInput {
    WorkPlanInput::Saved
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceRequest {
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyParams {
    pub text: String,
}

#[derive(Debug, Serialize)]
struct IndicatorResponse {
    #[serde(flatten)]
    snapshot: IndicatorSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved: Option<SavedSnapshot>,
}

fn error_response(error: ComplianceServiceError) -> Response {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if error.is_not_found() {
        StatusCode::NOT_FOUND
    } else if error.is_timeout() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn upload_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    Path(kind): Path<ImportKind>,
    body: Bytes,
) -> Response
where
    S: ComplianceStore + 'static,
{
    match service.import(kind, &body) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn indicator_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    Path(indicator): Path<EventIndicator>,
    Query(params): Query<IndicatorParams>,
) -> Response
where
    S: ComplianceStore + 'static,
{
    let result = window_between(params.start, params.end)
        .map_err(ComplianceServiceError::from)
        .and_then(|window| {
            let scope = params.area;
            match indicator {
                EventIndicator::ComplaintRate => service.complaint_rate(&window, scope),
                EventIndicator::ResponseRate => service.response_rate(&window, scope),
                EventIndicator::InspectionQuality => service.inspection_quality(&window, scope),
            }
        })
        .and_then(|snapshot| {
            let saved = if params.save {
                Some(service.save_snapshot(snapshot.clone())?)
            } else {
                None
            };
            Ok(IndicatorResponse { snapshot, saved })
        });

    match result {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn work_plan_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    axum::Json(request): axum::Json<WorkPlanRequest>,
) -> Response
where
    S: ComplianceStore + 'static,
{
    let window = match window_between(request.start, request.end) {
        Ok(window) => window,
        Err(error) => return error_response(error.into()),
    };

    let result = service
        .work_plan(&window, request.labor, request.equipment)
        .and_then(|snapshot| {
            let saved = if request.save {
                Some(service.save_snapshot(snapshot.clone())?)
            } else {
                None
            };
            Ok(IndicatorResponse { snapshot, saved })
        });

    match result {
        Ok(response) => (StatusCode::OK, axum::Json(response)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn composite_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    axum::Json(request): axum::Json<CompositeRequest>,
) -> Response
where
    S: ComplianceStore + 'static,
{
    let result = window_between(request.start, request.end)
        .map_err(ComplianceServiceError::from)
        .and_then(|window| service.composite_score(&window, request.area, request.work_plan));

    match result {
        Ok(score) => (StatusCode::OK, axum::Json(score)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evidence_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    Path(key): Path<String>,
    axum::Json(request): axum::Json<EvidenceRequest>,
) -> Response
where
    S: ComplianceStore + 'static,
{
    match service.attach_evidence(&key, request.references) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn classify_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    Query(params): Query<ClassifyParams>,
) -> Response
where
    S: ComplianceStore + 'static,
{
    let view = service.classify(&params.text);
    (StatusCode::OK, axum::Json(view)).into_response()
}

pub(crate) async fn alerts_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
) -> Response
where
    S: ComplianceStore + 'static,
{
    match service.scan_alerts() {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn remediation_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
) -> Response
where
    S: ComplianceStore + 'static,
{
    match service.remediate_legacy_bulk_pickup() {
        Ok(patched) => (StatusCode::OK, axum::Json(json!({ "patched": patched }))).into_response(),
        Err(error) => error_response(error),
    }
}
