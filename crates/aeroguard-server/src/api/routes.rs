//! REST API routes.

use aeroguard_core::{RiskRules, RiskVerdict, TelemetryRecord, WeatherSnapshot, Zone, ZoneInfo};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::{request_id, ws};
use crate::state::{AppState, DashboardView, IngestError, IngestSource};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        // Vehicle ingestion and dashboard
        .route("/data", post(receive_data))
        .route("/api/current", get(get_current))
        .route("/v1/vehicles", get(list_vehicles))
        .route("/v1/vehicles/:vehicle_id", get(get_vehicle))
        // Risk engine
        .route("/v1/risk/evaluate", post(evaluate_risk))
        .route("/v1/risk/rules", get(get_rules))
        .route("/v1/airspace/check", get(check_airspace))
        // WebSocket streaming
        .route("/v1/stream", get(ws::ws_handler))
        .route("/health", get(|| async { "OK" }))
        .layer(middleware::from_fn(request_id::ensure_request_id))
}

type ApiError = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({"status": "error", "message": message.into()})),
    )
}

fn ingest_error(err: IngestError) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, err.to_string())
}

async fn receive_data(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TelemetryRecord>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(record) = payload.map_err(|rejection| {
        tracing::warn!("Rejected telemetry payload: {}", rejection.body_text());
        error_response(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    let outcome = state
        .ingest(record, IngestSource::Http)
        .await
        .map_err(ingest_error)?;

    Ok(Json(json!({
        "status": "success",
        "vehicle_id": outcome.vehicle_id,
        "zone": outcome.zone,
        "risk": outcome.verdict.score,
        "level": outcome.verdict.level,
        "feedback": outcome.verdict.feedback(),
        "message": outcome.verdict.summary(),
    })))
}

async fn get_current(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.current())
}

async fn list_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<DashboardView>> {
    Json(state.list_vehicles())
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<DashboardView>, StatusCode> {
    state
        .get_vehicle(&vehicle_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    #[serde(default)]
    telemetry: TelemetryRecord,
    #[serde(default)]
    zone: Option<Zone>,
    #[serde(default)]
    weather: Option<WeatherSnapshot>,
}

#[derive(Debug, Serialize)]
struct EvaluateResponse {
    zone: Zone,
    feedback: aeroguard_core::FeedbackSignal,
    verdict: RiskVerdict,
}

async fn evaluate_risk(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    let (zone, verdict) = state
        .evaluate_detached(&request.telemetry, request.zone, request.weather.as_ref())
        .map_err(ingest_error)?;

    Ok(Json(EvaluateResponse {
        zone,
        feedback: verdict.feedback(),
        verdict,
    }))
}

async fn get_rules(State(state): State<Arc<AppState>>) -> Json<RiskRules> {
    Json(state.engine().rules().clone())
}

#[derive(Debug, Deserialize)]
struct AirspaceQuery {
    lat: f64,
    lon: f64,
}

async fn check_airspace(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AirspaceQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<ZoneInfo>, ApiError> {
    let Query(query) =
        query.map_err(|rejection| error_response(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    if !(-90.0..=90.0).contains(&query.lat) || !(-180.0..=180.0).contains(&query.lon) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "lat must be within [-90, 90] and lon within [-180, 180]",
        ));
    }

    Ok(Json(state.airspace().zone_info(query.lat, query.lon)))
}
