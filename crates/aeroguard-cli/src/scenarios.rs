//! Preset telemetry scenarios for exercising the risk service.

use aeroguard_core::telemetry::{GpsSection, MotorSection, MpuSection, SystemSection};
use aeroguard_core::TelemetryRecord;
use clap::ValueEnum;
use rand::Rng;
use std::time::Duration;

pub const MIN_RATE_HZ: f64 = 0.01;
pub const MAX_RATE_HZ: f64 = 100.0;

/// Named telemetry preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Healthy vehicle near Kochi
    Normal,
    /// Degraded GPS and rising vibration
    Warning,
    /// Few satellites, heavy vibration and a stalled motor
    Critical,
    /// Healthy vehicle parked inside the restricted zone
    Restricted,
    /// Diagnostic scan request only
    Scan,
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Normal => "NORMAL",
            Scenario::Warning => "WARNING",
            Scenario::Critical => "CRITICAL",
            Scenario::Restricted => "RESTRICTED",
            Scenario::Scan => "SCAN",
        }
    }

    /// Noise-free record for this preset.
    pub fn template(&self, vehicle_id: &str) -> TelemetryRecord {
        let mut record = match self {
            Scenario::Normal => TelemetryRecord {
                gps: Some(gps(9.9312, 76.2673, 22, 120.0, 1050.0)),
                mpu: Some(mpu(0.05, 0.01, 0.01, 1.0)),
                motor: Some(MotorSection {
                    rpm: Some(1500),
                    hall_detected: Some(true),
                }),
                system: Some(SystemSection {
                    scan_triggered: Some(false),
                }),
                ..Default::default()
            },
            Scenario::Warning => TelemetryRecord {
                gps: Some(gps(9.9410, 76.2710, 7, 1100.0, 1350.0)),
                mpu: Some(mpu(0.62, 0.2, 0.1, 0.9)),
                motor: Some(MotorSection {
                    rpm: Some(3800),
                    hall_detected: None,
                }),
                ..Default::default()
            },
            Scenario::Critical => TelemetryRecord {
                gps: Some(gps(9.9401, 76.2701, 5, 900.0, 800.0)),
                mpu: Some(mpu(0.8, 0.5, -0.5, 0.8)),
                motor: Some(MotorSection {
                    rpm: Some(200),
                    hall_detected: None,
                }),
                ..Default::default()
            },
            Scenario::Restricted => TelemetryRecord {
                gps: Some(gps(8.4821, 76.9200, 18, 110.0, 1100.0)),
                mpu: Some(mpu(0.04, 0.0, 0.0, 1.0)),
                motor: Some(MotorSection {
                    rpm: Some(1500),
                    hall_detected: Some(true),
                }),
                ..Default::default()
            },
            Scenario::Scan => TelemetryRecord {
                system: Some(SystemSection {
                    scan_triggered: Some(true),
                }),
                ..Default::default()
            },
        };
        record.vehicle_id = Some(vehicle_id.to_string());
        record
    }

    /// Record with small sensor noise applied.
    pub fn sample<R: Rng + ?Sized>(&self, vehicle_id: &str, rng: &mut R) -> TelemetryRecord {
        let mut record = self.template(vehicle_id);

        if let Some(gps) = record.gps.as_mut() {
            jitter(&mut gps.latitude, 0.0002, rng);
            jitter(&mut gps.longitude, 0.0002, rng);
            jitter(&mut gps.hdop, 10.0, rng);
        }
        if let Some(mpu) = record.mpu.as_mut() {
            jitter(&mut mpu.vibration_rms, 0.02, rng);
            jitter(&mut mpu.ax, 0.01, rng);
            jitter(&mut mpu.ay, 0.01, rng);
            if let Some(v) = mpu.vibration_rms.as_mut() {
                *v = v.max(0.0);
            }
        }
        if let Some(rpm) = record.motor.as_mut().and_then(|m| m.rpm.as_mut()) {
            *rpm = (*rpm + rng.random_range(-50..=50)).max(1);
        }
        record
    }
}

/// Interval between sends, with the rate clamped to [`MIN_RATE_HZ`, `MAX_RATE_HZ`].
pub fn send_period(rate_hz: f64) -> Duration {
    let rate = if rate_hz.is_finite() {
        rate_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ)
    } else {
        MIN_RATE_HZ
    };
    Duration::from_secs_f64(1.0 / rate)
}

fn gps(latitude: f64, longitude: f64, satellites: i64, hdop: f64, raw_signal: f64) -> GpsSection {
    GpsSection {
        latitude: Some(latitude),
        longitude: Some(longitude),
        speed: Some(0.0),
        satellites: Some(satellites),
        hdop: Some(hdop),
        raw_signal: Some(raw_signal),
    }
}

fn mpu(vibration_rms: f64, ax: f64, ay: f64, az: f64) -> MpuSection {
    MpuSection {
        ax: Some(ax),
        ay: Some(ay),
        az: Some(az),
        vibration_rms: Some(vibration_rms),
        tilt_angle: None,
    }
}

fn jitter<R: Rng + ?Sized>(value: &mut Option<f64>, amplitude: f64, rng: &mut R) {
    if let Some(v) = value.as_mut() {
        *v += rng.random_range(-amplitude..=amplitude);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeroguard_core::{AirspaceClassifier, RiskEngine, RiskLevel, SensorState, Zone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn assess(record: &TelemetryRecord) -> (Zone, RiskLevel) {
        let mut sensors = SensorState::default();
        sensors.merge(record);
        let snapshot = sensors.snapshot();
        let zone = AirspaceClassifier::default().classify(snapshot.position.coordinates());
        (zone, RiskEngine::default().evaluate(&snapshot, zone, None).level)
    }

    #[test]
    fn presets_land_on_expected_levels() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(
                assess(&Scenario::Normal.sample("UAV-1", &mut rng)),
                (Zone::Green, RiskLevel::Safe)
            );
            assert_eq!(
                assess(&Scenario::Warning.sample("UAV-1", &mut rng)),
                (Zone::Green, RiskLevel::Caution)
            );
            let (zone, level) = assess(&Scenario::Critical.sample("UAV-1", &mut rng));
            assert_eq!(zone, Zone::Green);
            assert!(level >= RiskLevel::Caution);
            assert_eq!(
                assess(&Scenario::Restricted.sample("UAV-1", &mut rng)),
                (Zone::Red, RiskLevel::Abort)
            );
        }
    }

    #[test]
    fn scan_preset_only_requests_scan() {
        let record = Scenario::Scan.sample("UAV-3", &mut StdRng::seed_from_u64(1));
        assert!(record.scan_requested());
        assert!(record.gps.is_none());
        assert_eq!(record.vehicle_id.as_deref(), Some("UAV-3"));
    }

    #[test]
    fn send_period_is_bounded() {
        assert_eq!(send_period(2.0), Duration::from_millis(500));
        assert_eq!(send_period(1e-300), Duration::from_secs(100));
        assert_eq!(send_period(1e12), Duration::from_millis(10));
        assert_eq!(send_period(0.0), Duration::from_secs(100));
        assert_eq!(send_period(f64::NAN), Duration::from_secs(100));
    }

    #[test]
    fn template_is_noise_free() {
        let record = Scenario::Warning.template("UAV-1");
        let gps = record.gps.unwrap();
        assert_eq!(gps.satellites, Some(7));
        assert_eq!(gps.hdop, Some(1100.0));
        assert_eq!(record.motor.unwrap().rpm, Some(3800));
    }
}
