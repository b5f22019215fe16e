//! Ingestion API integration tests.
//!
//! Run with: cargo test --test ingest_test -- --ignored
//!
//! Note: Requires a running AeroGuard server at http://localhost:5000
//! or set AEROGUARD_TEST_URL environment variable.

use reqwest::Client;
use serde_json::{json, Value};

fn base_url() -> String {
    std::env::var("AEROGUARD_TEST_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

#[tokio::test]
#[ignore] // Run only when server is running
async fn test_ingest_and_read_back() {
    let client = Client::new();
    let base = base_url();

    let record = json!({
        "vehicle_id": "TEST-ING-001",
        "mpu": {"vibration_rms": 0.05, "tilt_angle": 1.0},
        "motor": {"rpm": 1500, "hall_detected": true},
        "gps": {"latitude": 9.9312, "longitude": 76.2673, "satellites": 14, "hdop": 120}
    });
    let resp = client
        .post(format!("{}/data", base))
        .json(&record)
        .send()
        .await
        .expect("Failed to post telemetry");
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["zone"], "GREEN");

    let resp = client
        .get(format!("{}/v1/vehicles/TEST-ING-001", base))
        .send()
        .await
        .unwrap();
    let view: Value = resp.json().await.unwrap();
    assert_eq!(view["motor"]["rpm"], 1500);
    assert_eq!(view["system"]["source"], "WiFi");
}

#[tokio::test]
#[ignore]
async fn test_restricted_airspace_aborts() {
    let client = Client::new();
    let base = base_url();

    let record = json!({
        "vehicle_id": "TEST-ING-002",
        "gps": {"latitude": 8.4821, "longitude": 76.92, "satellites": 14, "hdop": 1.0}
    });
    let resp = client
        .post(format!("{}/data", base))
        .json(&record)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["risk"], 100);
    assert_eq!(body["level"], "ABORT");
    assert_eq!(body["feedback"], "ALERT_RED");
}

#[tokio::test]
#[ignore]
async fn test_rejects_empty_record() {
    let client = Client::new();
    let resp = client
        .post(format!("{}/data", base_url()))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
