//! Risk fusion engine.
//!
//! Combines a telemetry snapshot, the airspace zone and an optional weather
//! snapshot into a single [`RiskVerdict`]. Rules run in a fixed order
//! (geofence, GNSS, hardware, weather) so the explanation is reproducible.
//! Only the RED zone short-circuits; every other rule is additive.

use crate::models::{
    Reason, ReasonCode, RiskLevel, RiskVerdict, TelemetrySnapshot, WeatherSnapshot, Zone,
};
use crate::rules::RiskRules;
use std::sync::OnceLock;

/// Stateless evaluator over a read-only rule table.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    rules: RiskRules,
}

/// Evaluate with the default rule table.
pub fn evaluate(
    telemetry: &TelemetrySnapshot,
    zone: Zone,
    weather: Option<&WeatherSnapshot>,
) -> RiskVerdict {
    static ENGINE: OnceLock<RiskEngine> = OnceLock::new();
    ENGINE
        .get_or_init(RiskEngine::default)
        .evaluate(telemetry, zone, weather)
}

/// Running total for one evaluation.
#[derive(Debug, Default)]
struct Assessment {
    score: u32,
    reasons: Vec<Reason>,
}

impl Assessment {
    fn add(&mut self, code: ReasonCode, weight: u32, message: impl Into<String>) {
        self.score = self.score.saturating_add(weight);
        self.reasons.push(Reason {
            code,
            message: message.into(),
            weight,
        });
    }
}

impl RiskEngine {
    /// Build an engine from a validated rule table.
    pub fn new(rules: RiskRules) -> Result<Self, crate::error::RulesError> {
        rules.validate()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &RiskRules {
        &self.rules
    }

    /// Map a score to its level using the configured cut points.
    pub fn level_for(&self, score: u8) -> RiskLevel {
        self.rules.levels.level_for(score)
    }

    pub fn evaluate(
        &self,
        telemetry: &TelemetrySnapshot,
        zone: Zone,
        weather: Option<&WeatherSnapshot>,
    ) -> RiskVerdict {
        if zone == Zone::Red {
            return self.restricted();
        }

        let mut assessment = Assessment::default();
        self.apply_geofence(zone, &mut assessment);
        self.apply_gnss(telemetry, &mut assessment);
        self.apply_hardware(telemetry, &mut assessment);
        self.apply_weather(weather, &mut assessment);
        self.finalize(assessment)
    }

    fn restricted(&self) -> RiskVerdict {
        let message = self.rules.explanation.restricted_message.clone();
        RiskVerdict {
            score: 100,
            level: RiskLevel::Abort,
            reasons: vec![Reason {
                code: ReasonCode::RestrictedAirspace,
                message: message.clone(),
                weight: 100,
            }],
            explanation: message,
        }
    }

    fn apply_geofence(&self, zone: Zone, assessment: &mut Assessment) {
        if zone == Zone::Yellow {
            assessment.add(
                ReasonCode::NearRestrictedZone,
                self.rules.geofence.yellow_zone_weight,
                "Near Restricted Zone",
            );
        }
    }

    fn apply_gnss(&self, telemetry: &TelemetrySnapshot, assessment: &mut Assessment) {
        let gnss = &self.rules.gnss;
        let hdop = gnss.normalize_hdop(telemetry.position.hdop);
        let satellites = telemetry.position.satellites;

        if let Some(band) = gnss.band_for(hdop) {
            assessment.add(
                ReasonCode::GpsPrecision,
                band.weight,
                format!("{} (HDOP {:.1})", band.label, hdop),
            );
        }

        if satellites < gnss.critical_satellites {
            assessment.add(
                ReasonCode::CriticalSatelliteCount,
                gnss.critical_satellite_weight,
                format!("Critical Satellite Count ({})", satellites),
            );
        } else if satellites < gnss.safe_satellites {
            let missing = gnss.safe_satellites - satellites;
            assessment.add(
                ReasonCode::LowSatelliteCount,
                missing.saturating_mul(gnss.per_missing_satellite_weight),
                format!("Low Satellite Count ({})", satellites),
            );
        }

        if hdop > gnss.degraded_hdop && satellites < gnss.degraded_satellites {
            assessment.add(
                ReasonCode::GpsSystemDegraded,
                gnss.degraded_weight,
                "GPS System Degraded",
            );
        }
    }

    fn apply_hardware(&self, telemetry: &TelemetrySnapshot, assessment: &mut Assessment) {
        let hw = &self.rules.hardware;
        let vibration = or_worst(telemetry.motion.vibration_g, f64::INFINITY).max(0.0);
        let tilt = or_worst(telemetry.motion.tilt_deg, f64::INFINITY).abs();
        let rpm = telemetry.motor.rpm;

        if vibration > hw.vibration_critical_g {
            assessment.add(ReasonCode::CriticalVibration, hw.vibration_critical_weight, "Critical Vibration");
        } else if vibration > hw.vibration_warning_g {
            assessment.add(ReasonCode::HighVibration, hw.vibration_warning_weight, "High Vibration");
        }

        if rpm > 0 && rpm < hw.min_safe_rpm {
            assessment.add(ReasonCode::MotorEfficiencyLow, hw.low_rpm_weight, "Motor Efficiency Low");
        }

        if !telemetry.motor.hall_detected {
            assessment.add(ReasonCode::HallSensorFault, hw.hall_fault_weight, "Hall Sensor Fault");
        }

        if tilt > hw.tilt_high_deg {
            assessment.add(ReasonCode::ExcessiveTilt, hw.tilt_high_weight, "Excessive Tilt");
        } else if tilt > hw.tilt_warning_deg {
            assessment.add(ReasonCode::TiltWarning, hw.tilt_warning_weight, "Tilt Warning");
        }
    }

    fn apply_weather(&self, weather: Option<&WeatherSnapshot>, assessment: &mut Assessment) {
        let wx = &self.rules.weather;
        let Some(weather) = weather else {
            assessment.add(
                ReasonCode::WeatherUnavailable,
                wx.missing_weather_penalty,
                "Weather Data Unavailable",
            );
            return;
        };

        let wind = or_worst(weather.wind_speed_mps, f64::INFINITY).max(0.0);
        if wind > wx.wind_critical_mps {
            assessment.add(
                ReasonCode::GaleForceWind,
                wx.wind_critical_weight,
                if wind.is_finite() {
                    format!("Gale Force Wind ({:.1}m/s)", wind)
                } else {
                    "Gale Force Wind (no valid reading)".to_string()
                },
            );
        } else if wind > wx.wind_caution_mps {
            assessment.add(ReasonCode::ModerateWind, wx.wind_caution_weight, "Moderate Wind");
        }

        let visibility = or_worst(weather.visibility_m, 0.0).max(0.0);
        if visibility < wx.visibility_critical_m {
            assessment.add(
                ReasonCode::VeryLowVisibility,
                wx.visibility_critical_weight,
                "Very Low Visibility",
            );
        } else if visibility < wx.visibility_caution_m {
            assessment.add(ReasonCode::LowVisibility, wx.visibility_caution_weight, "Low Visibility");
        }

        if let Some(weight) = wx.dangerous_conditions.get(&weather.condition) {
            assessment.add(
                ReasonCode::DangerousCondition,
                *weight,
                format!("{} Detected", weather.condition),
            );
        }

        if let Some(temp) = weather.temperature_c.filter(|t| t.is_finite()) {
            if temp < wx.temperature_low_c || temp > wx.temperature_high_c {
                assessment.add(ReasonCode::ExtremeTemperature, wx.temperature_weight, "Extreme Temperature");
            }
        }
    }

    fn finalize(&self, assessment: Assessment) -> RiskVerdict {
        let score = assessment.score.min(100) as u8;
        let level = self.level_for(score);
        let explanation = if assessment.reasons.is_empty() {
            self.rules.explanation.nominal_message.clone()
        } else {
            assessment
                .reasons
                .iter()
                .map(|r| r.message.as_str())
                .collect::<Vec<_>>()
                .join(&self.rules.explanation.separator)
        };

        RiskVerdict {
            score,
            level,
            reasons: assessment.reasons,
            explanation,
        }
    }
}

/// Unreadable (non-finite) values count as the worst case for their rule.
fn or_worst(value: f64, worst: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        worst
    }
}
