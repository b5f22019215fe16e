//! Per-vehicle record and its dashboard projection.

use aeroguard_core::telemetry::{EnvironmentState, GpsState, MotorState, MpuState};
use aeroguard_core::{Reason, RiskLevel, RiskVerdict, SensorState, WeatherSnapshot, Zone};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transport the latest record arrived on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestSource {
    #[serde(rename = "WiFi")]
    Http,
    #[serde(rename = "SERIAL")]
    Link,
    #[default]
    #[serde(rename = "IDLE")]
    Idle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    /// Reporting within the staleness window
    #[default]
    Active,
    /// No telemetry for longer than the staleness window
    Stale,
}

/// Everything the service knows about one vehicle.
#[derive(Debug, Clone)]
pub struct VehicleRecord {
    pub vehicle_id: String,
    pub sensors: SensorState,
    /// Last successful weather lookup
    pub weather: Option<WeatherSnapshot>,
    pub zone: Zone,
    pub verdict: Option<RiskVerdict>,
    pub source: IngestSource,
    pub status: VehicleStatus,
    pub scan_until: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
}

impl VehicleRecord {
    pub fn new(vehicle_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            sensors: SensorState::default(),
            weather: None,
            zone: Zone::Unknown,
            verdict: None,
            source: IngestSource::Idle,
            status: VehicleStatus::Active,
            scan_until: None,
            last_update: now,
        }
    }

    pub fn scan_active(&self, now: DateTime<Utc>) -> bool {
        self.scan_until.is_some_and(|until| now < until)
    }

    pub fn dashboard(&self, now: DateTime<Utc>) -> DashboardView {
        let (risk_score, risk_level, blocked_reason, reasons) = match &self.verdict {
            Some(verdict) => (
                verdict.score,
                verdict.level,
                verdict.summary(),
                verdict.reasons.clone(),
            ),
            None => (0, RiskLevel::Safe, "STANDBY".to_string(), Vec::new()),
        };

        DashboardView {
            vehicle_id: self.vehicle_id.clone(),
            status: self.status,
            mpu: self.sensors.mpu.clone(),
            environment: self.sensors.environment.clone(),
            motor: self.sensors.motor.clone(),
            gps: GpsView {
                fix: self.sensors.gps.clone(),
                geo_zone: self.zone,
            },
            weather: self.weather.clone(),
            system: SystemView {
                risk_score,
                risk_level,
                blocked_reason,
                reasons,
                scan_triggered: self.scan_active(now),
                source: self.source,
                timestamp: self.last_update,
            },
        }
    }
}

/// JSON shape served to the dashboard and the WebSocket stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub vehicle_id: String,
    pub status: VehicleStatus,
    pub mpu: MpuState,
    pub environment: EnvironmentState,
    pub motor: MotorState,
    pub gps: GpsView,
    pub weather: Option<WeatherSnapshot>,
    pub system: SystemView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpsView {
    #[serde(flatten)]
    pub fix: GpsState,
    pub geo_zone: Zone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemView {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub blocked_reason: String,
    pub reasons: Vec<Reason>,
    pub scan_triggered: bool,
    pub source: IngestSource,
    pub timestamp: DateTime<Utc>,
}
