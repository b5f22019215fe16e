//! AeroGuard core: pre-flight risk fusion for small UAVs.
//!
//! Sensor telemetry, airspace classification and ambient weather are fused
//! into a single [`RiskVerdict`] by a stateless [`RiskEngine`].

pub mod airspace;
pub mod engine;
pub mod error;
pub mod models;
pub mod rules;
pub mod spatial;
pub mod telemetry;

pub use airspace::{AirspaceClassifier, ZoneInfo};
pub use engine::{evaluate, RiskEngine};
pub use error::{RulesError, ValidationError};
pub use models::{
    FeedbackSignal, MotionReading, MotorReading, PositionFix, Reason, ReasonCode, RiskLevel,
    RiskVerdict, TelemetrySnapshot, WeatherCondition, WeatherSnapshot, Zone,
};
pub use rules::RiskRules;
pub use spatial::haversine_distance;
pub use telemetry::{SensorState, TelemetryRecord};
