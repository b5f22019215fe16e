use aeroguard_core::RiskEngine;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, config::Config, state::AppState};

fn setup_app() -> (axum::Router, Arc<AppState>) {
    let mut config = Config::from_env();
    config.default_vehicle_id = "UAV-1".to_string();
    let airspace = aeroguard_core::AirspaceClassifier::default();
    config.airspace_center_lat = airspace.center_lat;
    config.airspace_center_lon = airspace.center_lon;
    config.red_radius_km = airspace.red_radius_km;
    config.yellow_radius_km = airspace.yellow_radius_km;

    let state = Arc::new(AppState::with_weather(config, RiskEngine::default(), None));
    let app = api::routes().with_state(state.clone());
    (app, state)
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn data_ingest_returns_feedback() {
    let (app, state) = setup_app();

    let payload = json!({
        "mpu": {"vibration_rms": 0.9, "tilt_angle": 2.0},
        "motor": {"rpm": 1500, "hall_detected": true},
        "gps": {"latitude": 9.9312, "longitude": 76.2673, "satellites": 12, "hdop": 120}
    });
    let res = app
        .clone()
        .oneshot(post_json("/data", payload.to_string()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = read_json(res).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["vehicle_id"], "UAV-1");
    assert_eq!(body["zone"], "GREEN");
    assert_eq!(body["risk"], 40);
    assert_eq!(body["level"], "CAUTION");
    assert_eq!(body["feedback"], "ALERT_YELLOW");

    let current = app.oneshot(get("/api/current")).await.unwrap();
    assert_eq!(current.status(), StatusCode::OK);
    let current = read_json(current).await;
    assert_eq!(current["system"]["risk_score"], 40);
    assert_eq!(current["system"]["source"], "WiFi");
    assert_eq!(current["gps"]["hdop"], 120.0);
    assert_eq!(current["gps"]["geo_zone"], "GREEN");
    assert_eq!(state.list_vehicles().len(), 1);
}

#[tokio::test]
async fn data_ingest_rejects_bad_payloads() {
    let (app, state) = setup_app();

    let malformed = app
        .clone()
        .oneshot(post_json("/data", "{not json"))
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(malformed).await["status"], "error");

    let empty = app.clone().oneshot(post_json("/data", "{}")).await.unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    let body = read_json(empty).await;
    assert_eq!(body["message"], "record contains no sensor data");

    let out_of_range = app
        .oneshot(post_json(
            "/data",
            json!({"gps": {"latitude": 91.0, "longitude": 0.0}}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);

    assert!(state.list_vehicles().is_empty());
}

#[tokio::test]
async fn current_is_standby_before_first_contact() {
    let (app, _state) = setup_app();

    let res = app.oneshot(get("/api/current")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["vehicle_id"], "UAV-1");
    assert_eq!(body["system"]["blocked_reason"], "STANDBY");
    assert_eq!(body["system"]["source"], "IDLE");
}

#[tokio::test]
async fn vehicle_lookup() {
    let (app, _state) = setup_app();

    let missing = app.clone().oneshot(get("/v1/vehicles/UAV-404")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(post_json(
            "/data",
            json!({"vehicle_id": "UAV-7", "motor": {"rpm": 1200}}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let found = app.clone().oneshot(get("/v1/vehicles/UAV-7")).await.unwrap();
    assert_eq!(found.status(), StatusCode::OK);
    assert_eq!(read_json(found).await["motor"]["rpm"], 1200);

    let all = read_json(app.oneshot(get("/v1/vehicles")).await.unwrap()).await;
    assert_eq!(all.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn detached_evaluation() {
    let (app, state) = setup_app();

    let restricted = json!({
        "telemetry": {"gps": {"latitude": 9.9312, "longitude": 76.2673, "satellites": 12, "hdop": 1.0}},
        "zone": "RED"
    });
    let res = app
        .clone()
        .oneshot(post_json("/v1/risk/evaluate", restricted.to_string()))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["zone"], "RED");
    assert_eq!(body["feedback"], "ALERT_RED");
    assert_eq!(body["verdict"]["score"], 100);
    assert_eq!(body["verdict"]["level"], "ABORT");
    assert_eq!(body["verdict"]["explanation"], "Restricted Airspace");

    let stormy = json!({
        "telemetry": {"gps": {"latitude": 9.9312, "longitude": 76.2673, "satellites": 12, "hdop": 1.0}},
        "weather": {"wind_speed_mps": 2.0, "visibility_m": 10000.0, "condition": "Thunderstorm"}
    });
    let res = app
        .oneshot(post_json("/v1/risk/evaluate", stormy.to_string()))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["zone"], "GREEN");
    assert_eq!(body["verdict"]["score"], 50);
    assert_eq!(body["verdict"]["level"], "CAUTION");

    assert!(state.list_vehicles().is_empty());
}

#[tokio::test]
async fn airspace_check() {
    let (app, _state) = setup_app();

    let res = app
        .clone()
        .oneshot(get("/v1/airspace/check?lat=8.4821&lon=76.92"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["zone"], "RED");
    assert_eq!(body["distance_km"], 0.0);

    let far = read_json(
        app.clone()
            .oneshot(get("/v1/airspace/check?lat=9.9312&lon=76.2673"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(far["zone"], "GREEN");

    let invalid = app
        .clone()
        .oneshot(get("/v1/airspace/check?lat=123&lon=76.92"))
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let missing = app.oneshot(get("/v1/airspace/check?lat=8.0")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rules_are_published() {
    let (app, _state) = setup_app();

    let body = read_json(app.oneshot(get("/v1/risk/rules")).await.unwrap()).await;
    assert_eq!(body["levels"]["caution_from"], 40);
    assert_eq!(body["levels"]["abort_from"], 75);
    assert_eq!(body["geofence"]["yellow_zone_weight"], 30);
}

#[tokio::test]
async fn request_id_is_echoed_or_minted() {
    let (app, _state) = setup_app();

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-42")
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "trace-42");

    let res = app.oneshot(get("/health")).await.unwrap();
    let minted = res.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(minted).is_ok());
}
