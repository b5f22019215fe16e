//! Risk weights and thresholds.
//!
//! Every number the engine scores with lives here. The table deserializes from
//! JSON with per-section defaults, so a deployment file only needs to list the
//! values it overrides.

use crate::error::RulesError;
use crate::models::{RiskLevel, WeatherCondition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Complete rule table for the risk fusion engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRules {
    pub geofence: GeofenceRules,
    pub gnss: GnssRules,
    pub hardware: HardwareRules,
    pub weather: WeatherRules,
    pub levels: LevelCutPoints,
    pub explanation: ExplanationRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeofenceRules {
    /// Penalty applied inside the caution radius
    pub yellow_zone_weight: u32,
}

impl Default for GeofenceRules {
    fn default() -> Self {
        Self {
            yellow_zone_weight: 30,
        }
    }
}

/// One HDOP band: applies when normalized HDOP is strictly above `above`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HdopBand {
    pub above: f64,
    pub weight: u32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GnssRules {
    /// Raw HDOP above this is assumed to be scaled by `scale_divisor`
    pub scale_threshold: f64,
    pub scale_divisor: f64,
    /// Raw HDOP at or above this means "no fix"
    pub no_fix_sentinel: f64,
    /// Ordered worst first; only the first matching band contributes
    pub hdop_bands: Vec<HdopBand>,
    pub critical_satellites: u32,
    pub critical_satellite_weight: u32,
    pub safe_satellites: u32,
    pub per_missing_satellite_weight: u32,
    /// Compound penalty when HDOP is above this and satellites below `degraded_satellites`
    pub degraded_hdop: f64,
    pub degraded_satellites: u32,
    pub degraded_weight: u32,
}

impl Default for GnssRules {
    fn default() -> Self {
        Self {
            scale_threshold: 50.0,
            scale_divisor: 100.0,
            no_fix_sentinel: 9999.0,
            hdop_bands: vec![
                HdopBand { above: 20.0, weight: 30, label: "GPS Signal Critical".into() },
                HdopBand { above: 10.0, weight: 20, label: "Poor GPS Precision".into() },
                HdopBand { above: 5.0, weight: 12, label: "Moderate GPS Precision".into() },
                HdopBand { above: 2.0, weight: 5, label: "Fair GPS Precision".into() },
            ],
            critical_satellites: 4,
            critical_satellite_weight: 25,
            safe_satellites: 8,
            per_missing_satellite_weight: 3,
            degraded_hdop: 10.0,
            degraded_satellites: 6,
            degraded_weight: 15,
        }
    }
}

impl GnssRules {
    /// Normalize a raw HDOP reading.
    ///
    /// Sentinel, non-finite and non-positive readings are treated as "no fix",
    /// which maps to `no_fix_sentinel / scale_divisor` (worst band with defaults).
    pub fn normalize_hdop(&self, raw: f64) -> f64 {
        let divisor = if self.scale_divisor > 0.0 { self.scale_divisor } else { 1.0 };
        if !raw.is_finite() || raw <= 0.0 || raw >= self.no_fix_sentinel {
            return self.no_fix_sentinel / divisor;
        }
        if raw > self.scale_threshold {
            raw / divisor
        } else {
            raw
        }
    }

    /// Highest applicable band for a normalized HDOP.
    pub fn band_for(&self, hdop: f64) -> Option<&HdopBand> {
        self.hdop_bands.iter().find(|band| hdop > band.above)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareRules {
    pub vibration_critical_g: f64,
    pub vibration_critical_weight: u32,
    pub vibration_warning_g: f64,
    pub vibration_warning_weight: u32,
    /// RPM in (0, min_safe_rpm) is penalised; 0 is disarmed
    pub min_safe_rpm: u32,
    pub low_rpm_weight: u32,
    pub hall_fault_weight: u32,
    pub tilt_high_deg: f64,
    pub tilt_high_weight: u32,
    pub tilt_warning_deg: f64,
    pub tilt_warning_weight: u32,
}

impl Default for HardwareRules {
    fn default() -> Self {
        Self {
            vibration_critical_g: 0.8,
            vibration_critical_weight: 40,
            vibration_warning_g: 0.5,
            vibration_warning_weight: 20,
            min_safe_rpm: 500,
            low_rpm_weight: 30,
            hall_fault_weight: 25,
            tilt_high_deg: 30.0,
            tilt_high_weight: 25,
            tilt_warning_deg: 15.0,
            tilt_warning_weight: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherRules {
    pub wind_critical_mps: f64,
    pub wind_critical_weight: u32,
    pub wind_caution_mps: f64,
    pub wind_caution_weight: u32,
    pub visibility_critical_m: f64,
    pub visibility_critical_weight: u32,
    pub visibility_caution_m: f64,
    pub visibility_caution_weight: u32,
    /// Per-condition penalty; conditions not listed score nothing
    pub dangerous_conditions: BTreeMap<WeatherCondition, u32>,
    pub temperature_low_c: f64,
    pub temperature_high_c: f64,
    pub temperature_weight: u32,
    /// Score added when no weather snapshot is available
    pub missing_weather_penalty: u32,
}

impl Default for WeatherRules {
    fn default() -> Self {
        let dangerous_conditions = [
            (WeatherCondition::Thunderstorm, 50),
            (WeatherCondition::Tornado, 60),
            (WeatherCondition::Squall, 40),
            (WeatherCondition::Snow, 35),
            (WeatherCondition::Rain, 30),
            (WeatherCondition::Fog, 30),
            (WeatherCondition::Mist, 15),
        ]
        .into_iter()
        .collect();

        Self {
            wind_critical_mps: 12.0,
            wind_critical_weight: 40,
            wind_caution_mps: 7.0,
            wind_caution_weight: 20,
            visibility_critical_m: 1500.0,
            visibility_critical_weight: 35,
            visibility_caution_m: 5000.0,
            visibility_caution_weight: 15,
            dangerous_conditions,
            temperature_low_c: -20.0,
            temperature_high_c: 45.0,
            temperature_weight: 15,
            missing_weather_penalty: 0,
        }
    }
}

/// Score cut points: below `caution_from` is SAFE, below `abort_from` is CAUTION.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelCutPoints {
    pub caution_from: u8,
    pub abort_from: u8,
}

impl Default for LevelCutPoints {
    fn default() -> Self {
        Self {
            caution_from: 40,
            abort_from: 75,
        }
    }
}

impl LevelCutPoints {
    pub fn level_for(&self, score: u8) -> RiskLevel {
        if score < self.caution_from {
            RiskLevel::Safe
        } else if score < self.abort_from {
            RiskLevel::Caution
        } else {
            RiskLevel::Abort
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationRules {
    pub separator: String,
    pub nominal_message: String,
    pub restricted_message: String,
}

impl Default for ExplanationRules {
    fn default() -> Self {
        Self {
            separator: ", ".into(),
            nominal_message: "All systems nominal".into(),
            restricted_message: "Restricted Airspace".into(),
        }
    }
}

impl RiskRules {
    /// Parse a JSON rule table and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, RulesError> {
        let rules: RiskRules = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Load a JSON rule table from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Reject tables whose bands or cut points would make the engine ambiguous.
    pub fn validate(&self) -> Result<(), RulesError> {
        let levels = &self.levels;
        if levels.caution_from == 0 || levels.caution_from >= levels.abort_from || levels.abort_from > 100 {
            return Err(RulesError::Invalid(format!(
                "level cut points must satisfy 0 < caution_from < abort_from <= 100 (got {} / {})",
                levels.caution_from, levels.abort_from
            )));
        }

        let gnss = &self.gnss;
        if !(gnss.scale_divisor.is_finite() && gnss.scale_divisor > 0.0) {
            return Err(RulesError::Invalid("gnss.scale_divisor must be positive".into()));
        }
        if gnss.no_fix_sentinel <= gnss.scale_threshold {
            return Err(RulesError::Invalid(
                "gnss.no_fix_sentinel must exceed gnss.scale_threshold".into(),
            ));
        }
        if gnss
            .hdop_bands
            .windows(2)
            .any(|pair| pair[0].above <= pair[1].above)
        {
            return Err(RulesError::Invalid(
                "gnss.hdop_bands must be ordered worst first with strictly decreasing thresholds".into(),
            ));
        }
        if gnss.critical_satellites > gnss.safe_satellites {
            return Err(RulesError::Invalid(
                "gnss.critical_satellites must not exceed gnss.safe_satellites".into(),
            ));
        }

        let hw = &self.hardware;
        if hw.vibration_warning_g > hw.vibration_critical_g {
            return Err(RulesError::Invalid(
                "hardware.vibration_warning_g must not exceed vibration_critical_g".into(),
            ));
        }
        if hw.tilt_warning_deg > hw.tilt_high_deg {
            return Err(RulesError::Invalid(
                "hardware.tilt_warning_deg must not exceed tilt_high_deg".into(),
            ));
        }

        let wx = &self.weather;
        if wx.wind_caution_mps > wx.wind_critical_mps {
            return Err(RulesError::Invalid(
                "weather.wind_caution_mps must not exceed wind_critical_mps".into(),
            ));
        }
        if wx.visibility_caution_m < wx.visibility_critical_m {
            return Err(RulesError::Invalid(
                "weather.visibility_caution_m must not be below visibility_critical_m".into(),
            ));
        }
        if wx.temperature_low_c >= wx.temperature_high_c {
            return Err(RulesError::Invalid(
                "weather.temperature_low_c must be below temperature_high_c".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RiskRules::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let rules = RiskRules::from_json_str(
            r#"{"geofence": {"yellow_zone_weight": 35}, "weather": {"missing_weather_penalty": 10}}"#,
        )
        .unwrap();
        assert_eq!(rules.geofence.yellow_zone_weight, 35);
        assert_eq!(rules.weather.missing_weather_penalty, 10);
        assert_eq!(rules.weather.wind_critical_mps, 12.0);
        assert_eq!(rules.levels, LevelCutPoints::default());
    }

    #[test]
    fn condition_map_round_trips_through_json() {
        let rules = RiskRules::from_json_str(
            r#"{"weather": {"dangerous_conditions": {"Rain": 45, "Dust": 10}}}"#,
        )
        .unwrap();
        assert_eq!(rules.weather.dangerous_conditions.get(&WeatherCondition::Rain), Some(&45));
        assert_eq!(rules.weather.dangerous_conditions.get(&WeatherCondition::Dust), Some(&10));
        assert!(!rules.weather.dangerous_conditions.contains_key(&WeatherCondition::Snow));
    }

    #[test]
    fn rejects_inverted_cut_points() {
        let err = RiskRules::from_json_str(r#"{"levels": {"caution_from": 80, "abort_from": 60}}"#)
            .unwrap_err();
        assert!(matches!(err, RulesError::Invalid(_)));
    }

    #[test]
    fn rejects_unsorted_hdop_bands() {
        let mut rules = RiskRules::default();
        rules.gnss.hdop_bands.reverse();
        assert!(rules.validate().is_err());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RiskRules::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, RulesError::Parse(_)));
    }

    #[test]
    fn hdop_normalization() {
        let gnss = GnssRules::default();
        assert_eq!(gnss.normalize_hdop(1.2), 1.2);
        assert_eq!(gnss.normalize_hdop(50.0), 50.0);
        assert_eq!(gnss.normalize_hdop(120.0), 1.2);
        assert_eq!(gnss.normalize_hdop(9999.0), 99.99);
        assert_eq!(gnss.normalize_hdop(f64::NAN), 99.99);
        assert_eq!(gnss.normalize_hdop(0.0), 99.99);
    }

    #[test]
    fn cut_points_map_scores() {
        let levels = LevelCutPoints::default();
        assert_eq!(levels.level_for(0), RiskLevel::Safe);
        assert_eq!(levels.level_for(39), RiskLevel::Safe);
        assert_eq!(levels.level_for(40), RiskLevel::Caution);
        assert_eq!(levels.level_for(74), RiskLevel::Caution);
        assert_eq!(levels.level_for(75), RiskLevel::Abort);
        assert_eq!(levels.level_for(100), RiskLevel::Abort);
    }
}
