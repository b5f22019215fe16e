//! Offline evaluation of recorded telemetry with the core engine.

use aeroguard_core::{
    AirspaceClassifier, FeedbackSignal, RiskEngine, RiskVerdict, SensorState, TelemetryRecord,
    WeatherSnapshot, Zone,
};
use anyhow::Result;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// One evaluation case.
///
/// Accepts either a bare telemetry record or a wrapper carrying an explicit
/// zone and weather. Any object with a `telemetry` key is a wrapper, and a
/// malformed wrapper is an error rather than a bare record.
#[derive(Debug, Clone)]
pub enum EvaluationInput {
    Case {
        telemetry: TelemetryRecord,
        zone: Option<Zone>,
        weather: Option<WeatherSnapshot>,
    },
    Record(TelemetryRecord),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseInput {
    telemetry: TelemetryRecord,
    #[serde(default)]
    zone: Option<Zone>,
    #[serde(default)]
    weather: Option<WeatherSnapshot>,
}

impl<'de> Deserialize<'de> for EvaluationInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("telemetry").is_some() {
            let case: CaseInput = serde_json::from_value(value).map_err(D::Error::custom)?;
            Ok(EvaluationInput::Case {
                telemetry: case.telemetry,
                zone: case.zone,
                weather: case.weather,
            })
        } else {
            serde_json::from_value(value)
                .map(EvaluationInput::Record)
                .map_err(D::Error::custom)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub zone: Zone,
    pub feedback: FeedbackSignal,
    pub verdict: RiskVerdict,
}

impl EvaluationInput {
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn evaluate(&self, engine: &RiskEngine, airspace: &AirspaceClassifier) -> Result<Evaluation> {
        let (record, zone, weather) = match self {
            EvaluationInput::Case {
                telemetry,
                zone,
                weather,
            } => (telemetry, *zone, weather.as_ref()),
            EvaluationInput::Record(record) => (record, None, None),
        };

        let mut sensors = SensorState::default();
        sensors.merge(record);
        let snapshot = sensors.snapshot();
        snapshot.validate()?;

        let zone = zone.unwrap_or_else(|| airspace.classify(snapshot.position.coordinates()));
        let verdict = engine.evaluate(&snapshot, zone, weather);
        Ok(Evaluation {
            zone,
            feedback: verdict.feedback(),
            verdict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeroguard_core::RiskLevel;

    fn run(input: &str) -> Evaluation {
        EvaluationInput::from_json_str(input)
            .unwrap()
            .evaluate(&RiskEngine::default(), &AirspaceClassifier::default())
            .unwrap()
    }

    #[test]
    fn bare_record_is_classified_from_position() {
        let result = run(r#"{"gps": {"latitude": 8.50, "longitude": 76.92, "satellites": 12, "hdop": 100}}"#);
        assert_eq!(result.zone, Zone::Red);
        assert_eq!(result.verdict.level, RiskLevel::Abort);
        assert_eq!(result.feedback, FeedbackSignal::AlertRed);
    }

    #[test]
    fn wrapper_supplies_zone_and_weather() {
        let result = run(
            r#"{
                "telemetry": {"gps": {"satellites": 12, "hdop": 100}, "motor": {"rpm": 1500}},
                "zone": "YELLOW",
                "weather": {"wind_speed_mps": 13.0, "visibility_m": 8000, "condition": "Clear"}
            }"#,
        );
        assert_eq!(result.zone, Zone::Yellow);
        assert_eq!(result.verdict.score, 70);
        assert_eq!(result.verdict.level, RiskLevel::Caution);
    }

    #[test]
    fn malformed_wrapper_is_rejected() {
        // weather lacks its condition
        let input = r#"{
            "telemetry": {"motor": {"rpm": 200}, "gps": {"satellites": 12, "hdop": 100}},
            "zone": "YELLOW",
            "weather": {"wind_speed_mps": 20.0}
        }"#;
        assert!(EvaluationInput::from_json_str(input).is_err());

        let bad_zone = r#"{"telemetry": {"motor": {"rpm": 200}}, "zone": "PURPLE"}"#;
        assert!(EvaluationInput::from_json_str(bad_zone).is_err());

        let stray_key = r#"{"telemetry": {"motor": {"rpm": 200}}, "zones": "YELLOW"}"#;
        assert!(EvaluationInput::from_json_str(stray_key).is_err());
    }

    #[test]
    fn invalid_position_is_an_error() {
        let input = EvaluationInput::from_json_str(r#"{"gps": {"latitude": 8.5}}"#).unwrap();
        assert!(input
            .evaluate(&RiskEngine::default(), &AirspaceClassifier::default())
            .is_err());
    }
}
