//! Wire shape of vehicle telemetry and the merged per-vehicle sensor state.
//!
//! Vehicles post partial records: each section and each field inside it is
//! optional, and only the fields present overwrite the previous state.

use crate::error::ValidationError;
use crate::models::{MotionReading, MotorReading, PositionFix, TelemetrySnapshot};
use serde::{Deserialize, Serialize};

/// Raw HDOP reported before the first fix (scaled by 100, i.e. 1.0).
const IDLE_HDOP_RAW: f64 = 100.0;
const IDLE_VIBRATION_G: f64 = 0.02;

/// Telemetry as posted by the vehicle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub mpu: Option<MpuSection>,
    #[serde(default)]
    pub environment: Option<EnvironmentSection>,
    #[serde(default)]
    pub motor: Option<MotorSection>,
    #[serde(default)]
    pub gps: Option<GpsSection>,
    #[serde(default)]
    pub system: Option<SystemSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MpuSection {
    #[serde(default)]
    pub ax: Option<f64>,
    #[serde(default)]
    pub ay: Option<f64>,
    #[serde(default)]
    pub az: Option<f64>,
    #[serde(default)]
    pub vibration_rms: Option<f64>,
    #[serde(default)]
    pub tilt_angle: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSection {
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub light_percent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorSection {
    /// Signed on the wire so a bad reading does not reject the whole record
    #[serde(default)]
    pub rpm: Option<i64>,
    #[serde(default)]
    pub hall_detected: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsSection {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub satellites: Option<i64>,
    #[serde(default)]
    pub hdop: Option<f64>,
    #[serde(default)]
    pub raw_signal: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSection {
    #[serde(default)]
    pub scan_triggered: Option<bool>,
}

impl TelemetryRecord {
    /// True when the record carries no sensor section at all.
    pub fn is_empty(&self) -> bool {
        self.mpu.is_none()
            && self.environment.is_none()
            && self.motor.is_none()
            && self.gps.is_none()
            && self.system.is_none()
    }

    pub fn scan_requested(&self) -> bool {
        self.system
            .as_ref()
            .and_then(|s| s.scan_triggered)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpuState {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub vibration_rms: f64,
    pub tilt_angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentState {
    pub temperature: f64,
    pub humidity: f64,
    pub light_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorState {
    pub rpm: i64,
    pub hall_detected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsState {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub speed: f64,
    pub satellites: i64,
    pub hdop: f64,
    pub raw_signal: f64,
}

/// Latest known value of every sensor on one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorState {
    pub mpu: MpuState,
    pub environment: EnvironmentState,
    pub motor: MotorState,
    pub gps: GpsState,
}

impl Default for SensorState {
    /// An idle vehicle on the bench: level, disarmed, no fix.
    fn default() -> Self {
        Self {
            mpu: MpuState {
                ax: 0.0,
                ay: 0.0,
                az: 1.0,
                vibration_rms: IDLE_VIBRATION_G,
                tilt_angle: 0.0,
            },
            environment: EnvironmentState {
                temperature: 25.0,
                humidity: 45.0,
                light_percent: 0.0,
            },
            motor: MotorState {
                rpm: 0,
                hall_detected: true,
            },
            gps: GpsState {
                latitude: None,
                longitude: None,
                speed: 0.0,
                satellites: 0,
                hdop: IDLE_HDOP_RAW,
                raw_signal: 0.0,
            },
        }
    }
}

fn overwrite<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

impl SensorState {
    /// Apply the fields present in `record`.
    pub fn merge(&mut self, record: &TelemetryRecord) {
        if let Some(mpu) = &record.mpu {
            overwrite(&mut self.mpu.ax, mpu.ax);
            overwrite(&mut self.mpu.ay, mpu.ay);
            overwrite(&mut self.mpu.az, mpu.az);
            overwrite(&mut self.mpu.vibration_rms, mpu.vibration_rms);
            overwrite(&mut self.mpu.tilt_angle, mpu.tilt_angle);
        }
        if let Some(env) = &record.environment {
            overwrite(&mut self.environment.temperature, env.temperature);
            overwrite(&mut self.environment.humidity, env.humidity);
            overwrite(&mut self.environment.light_percent, env.light_percent);
        }
        if let Some(motor) = &record.motor {
            overwrite(&mut self.motor.rpm, motor.rpm);
            overwrite(&mut self.motor.hall_detected, motor.hall_detected);
        }
        if let Some(gps) = &record.gps {
            if gps.latitude.is_some() {
                self.gps.latitude = gps.latitude;
            }
            if gps.longitude.is_some() {
                self.gps.longitude = gps.longitude;
            }
            overwrite(&mut self.gps.speed, gps.speed);
            overwrite(&mut self.gps.satellites, gps.satellites);
            overwrite(&mut self.gps.hdop, gps.hdop);
            overwrite(&mut self.gps.raw_signal, gps.raw_signal);
        }
    }

    /// Engine input for the current state.
    ///
    /// Negative counts clamp to zero and non-finite readings fall back to the
    /// idle defaults; HDOP is passed raw and normalized by the engine.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            motion: MotionReading {
                vibration_g: finite_or(self.mpu.vibration_rms, IDLE_VIBRATION_G).max(0.0),
                tilt_deg: finite_or(self.mpu.tilt_angle, 0.0),
            },
            motor: MotorReading {
                rpm: clamp_count(self.motor.rpm),
                hall_detected: self.motor.hall_detected,
            },
            position: PositionFix {
                lat: self.gps.latitude,
                lon: self.gps.longitude,
                satellites: clamp_count(self.gps.satellites),
                hdop: self.gps.hdop,
            },
        }
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn clamp_count(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

impl TelemetrySnapshot {
    /// Reject coordinates the airspace classifier cannot use.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let position = &self.position;
        match (position.lat, position.lon) {
            (Some(_), None) => return Err(ValidationError::MissingField("gps.longitude")),
            (None, Some(_)) => return Err(ValidationError::MissingField("gps.latitude")),
            _ => {}
        }
        if let Some(lat) = position.lat {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(ValidationError::InvalidField {
                    field: "gps.latitude",
                    reason: format!("{} is outside [-90, 90]", lat),
                });
            }
        }
        if let Some(lon) = position.lon {
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                return Err(ValidationError::InvalidField {
                    field: "gps.longitude",
                    reason: format!("{} is outside [-180, 180]", lon),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_only_overwrites_present_fields() {
        let mut state = SensorState::default();
        let record: TelemetryRecord = serde_json::from_str(
            r#"{"mpu": {"vibration_rms": 0.45}, "motor": {"rpm": 3800}}"#,
        )
        .unwrap();
        state.merge(&record);

        assert_eq!(state.mpu.vibration_rms, 0.45);
        assert_eq!(state.mpu.az, 1.0);
        assert_eq!(state.motor.rpm, 3800);
        assert!(state.motor.hall_detected);
        assert_eq!(state.gps.hdop, 100.0);
    }

    #[test]
    fn position_persists_across_partial_updates() {
        let mut state = SensorState::default();
        state.merge(&serde_json::from_str(
            r#"{"gps": {"latitude": 9.93, "longitude": 76.26, "satellites": 9}}"#,
        ).unwrap());
        state.merge(&serde_json::from_str(r#"{"gps": {"hdop": 350}}"#).unwrap());

        let snapshot = state.snapshot();
        assert_eq!(snapshot.position.coordinates(), Some((9.93, 76.26)));
        assert_eq!(snapshot.position.satellites, 9);
        assert_eq!(snapshot.position.hdop, 350.0);
    }

    #[test]
    fn snapshot_clamps_out_of_range_counts() {
        let mut state = SensorState::default();
        state.merge(&serde_json::from_str(
            r#"{"motor": {"rpm": -20}, "gps": {"satellites": -3}}"#,
        ).unwrap());
        let snapshot = state.snapshot();
        assert_eq!(snapshot.motor.rpm, 0);
        assert_eq!(snapshot.position.satellites, 0);
    }

    #[test]
    fn wrong_types_are_rejected_by_the_decoder() {
        let result: Result<TelemetryRecord, _> =
            serde_json::from_str(r#"{"motor": {"rpm": "fast"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn scan_flag_and_emptiness() {
        let record: TelemetryRecord =
            serde_json::from_str(r#"{"system": {"scan_triggered": true}}"#).unwrap();
        assert!(record.scan_requested());
        assert!(!record.is_empty());
        assert!(TelemetryRecord::default().is_empty());
    }

    #[test]
    fn validate_rejects_half_fix_and_bad_ranges() {
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.validate().unwrap();

        snapshot.position.lat = Some(10.0);
        assert_eq!(
            snapshot.validate(),
            Err(ValidationError::MissingField("gps.longitude"))
        );

        snapshot.position.lon = Some(200.0);
        match snapshot.validate() {
            Err(ValidationError::InvalidField { field, .. }) => assert_eq!(field, "gps.longitude"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
