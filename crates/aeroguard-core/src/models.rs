//! Core data models for the risk fusion engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Airspace classification relative to the restricted-area centre.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Zone {
    /// Inside the hard no-fly radius
    Red,
    /// Inside the caution radius
    Yellow,
    /// Clear of both radii
    Green,
    /// No position fix
    #[default]
    Unknown,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Red => "RED",
            Zone::Yellow => "YELLOW",
            Zone::Green => "GREEN",
            Zone::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity level derived from the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Safe,
    Caution,
    Abort,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Caution => "CAUTION",
            RiskLevel::Abort => "ABORT",
        }
    }

    /// Signal sent back to the vehicle for this level.
    pub fn feedback(&self) -> FeedbackSignal {
        FeedbackSignal::from(*self)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annunciator command written back to the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackSignal {
    /// Quiet
    Safe,
    /// Intermittent beeping
    AlertYellow,
    /// Solid buzzer
    AlertRed,
}

impl FeedbackSignal {
    pub fn as_wire(&self) -> &'static str {
        match self {
            FeedbackSignal::Safe => "SAFE",
            FeedbackSignal::AlertYellow => "ALERT_YELLOW",
            FeedbackSignal::AlertRed => "ALERT_RED",
        }
    }
}

impl From<RiskLevel> for FeedbackSignal {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Safe => FeedbackSignal::Safe,
            RiskLevel::Caution => FeedbackSignal::AlertYellow,
            RiskLevel::Abort => FeedbackSignal::AlertRed,
        }
    }
}

/// Dominant weather condition, using the OpenWeather "main" vocabulary.
///
/// Unrecognised strings are kept verbatim in [`WeatherCondition::Other`] so a
/// configured penalty can still match them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WeatherCondition {
    Clear,
    Clouds,
    Rain,
    Drizzle,
    Thunderstorm,
    Snow,
    Mist,
    Fog,
    Haze,
    Smoke,
    Dust,
    Sand,
    Ash,
    Squall,
    Tornado,
    Other(String),
}

impl WeatherCondition {
    pub fn as_str(&self) -> &str {
        match self {
            WeatherCondition::Clear => "Clear",
            WeatherCondition::Clouds => "Clouds",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Drizzle => "Drizzle",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Mist => "Mist",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::Haze => "Haze",
            WeatherCondition::Smoke => "Smoke",
            WeatherCondition::Dust => "Dust",
            WeatherCondition::Sand => "Sand",
            WeatherCondition::Ash => "Ash",
            WeatherCondition::Squall => "Squall",
            WeatherCondition::Tornado => "Tornado",
            WeatherCondition::Other(name) => name,
        }
    }
}

impl From<String> for WeatherCondition {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "clear" => WeatherCondition::Clear,
            "clouds" => WeatherCondition::Clouds,
            "rain" => WeatherCondition::Rain,
            "drizzle" => WeatherCondition::Drizzle,
            "thunderstorm" => WeatherCondition::Thunderstorm,
            "snow" => WeatherCondition::Snow,
            "mist" => WeatherCondition::Mist,
            "fog" => WeatherCondition::Fog,
            "haze" => WeatherCondition::Haze,
            "smoke" => WeatherCondition::Smoke,
            "dust" => WeatherCondition::Dust,
            "sand" => WeatherCondition::Sand,
            "ash" => WeatherCondition::Ash,
            "squall" => WeatherCondition::Squall,
            "tornado" => WeatherCondition::Tornado,
            _ => WeatherCondition::Other(value.trim().to_string()),
        }
    }
}

impl From<&str> for WeatherCondition {
    fn from(value: &str) -> Self {
        WeatherCondition::from(value.to_string())
    }
}

impl From<WeatherCondition> for String {
    fn from(value: WeatherCondition) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ambient conditions at the vehicle's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Wind speed (m/s)
    #[serde(default)]
    pub wind_speed_mps: f64,
    /// Visibility (meters)
    #[serde(default = "default_visibility_m")]
    pub visibility_m: f64,
    pub condition: WeatherCondition,
    /// Ambient temperature (deg C)
    #[serde(default)]
    pub temperature_c: Option<f64>,
    /// Relative humidity (%)
    #[serde(default)]
    pub humidity_pct: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Visibility reported by providers when the field is absent.
pub const DEFAULT_VISIBILITY_M: f64 = 10_000.0;

fn default_visibility_m() -> f64 {
    DEFAULT_VISIBILITY_M
}

impl WeatherSnapshot {
    /// Create a snapshot with only the fields the engine scores on.
    pub fn new(wind_speed_mps: f64, visibility_m: f64, condition: impl Into<WeatherCondition>) -> Self {
        Self {
            wind_speed_mps,
            visibility_m,
            condition: condition.into(),
            temperature_c: None,
            humidity_pct: None,
            description: None,
        }
    }

    pub fn with_temperature(mut self, temperature_c: f64) -> Self {
        self.temperature_c = Some(temperature_c);
        self
    }
}

/// Inertial readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionReading {
    /// Vibration RMS magnitude (g)
    pub vibration_g: f64,
    /// Tilt from level (degrees)
    pub tilt_deg: f64,
}

/// Motor and hall-sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorReading {
    /// 0 means disarmed / not reporting
    pub rpm: u32,
    pub hall_detected: bool,
}

/// GNSS fix quality and position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    pub satellites: u32,
    /// Raw HDOP as reported; see [`crate::rules::GnssRules::normalize_hdop`]
    pub hdop: f64,
}

impl PositionFix {
    /// Coordinates, when both halves of the fix are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// One telemetry cycle as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub motion: MotionReading,
    pub motor: MotorReading,
    pub position: PositionFix,
}

impl Default for TelemetrySnapshot {
    /// A level, disarmed vehicle with a good fix and no coordinates.
    fn default() -> Self {
        Self {
            motion: MotionReading {
                vibration_g: 0.0,
                tilt_deg: 0.0,
            },
            motor: MotorReading {
                rpm: 0,
                hall_detected: true,
            },
            position: PositionFix {
                lat: None,
                lon: None,
                satellites: 10,
                hdop: 1.0,
            },
        }
    }
}

/// Stable identifier for a triggered rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    RestrictedAirspace,
    NearRestrictedZone,
    GpsPrecision,
    CriticalSatelliteCount,
    LowSatelliteCount,
    GpsSystemDegraded,
    CriticalVibration,
    HighVibration,
    MotorEfficiencyLow,
    HallSensorFault,
    ExcessiveTilt,
    TiltWarning,
    GaleForceWind,
    ModerateWind,
    VeryLowVisibility,
    LowVisibility,
    DangerousCondition,
    ExtremeTemperature,
    WeatherUnavailable,
}

/// A triggered rule with its display text and score contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub code: ReasonCode,
    pub message: String,
    pub weight: u32,
}

/// The engine's output triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub score: u8,
    pub level: RiskLevel,
    pub reasons: Vec<Reason>,
    pub explanation: String,
}

impl RiskVerdict {
    /// Feedback signal for the vehicle.
    pub fn feedback(&self) -> FeedbackSignal {
        self.level.feedback()
    }

    /// Operator-facing line, e.g. `CAUTION: High Vibration, Moderate Wind`.
    pub fn summary(&self) -> String {
        format!("{}: {}", self.level, self.explanation)
    }

    pub fn has_reason(&self, code: ReasonCode) -> bool {
        self.reasons.iter().any(|r| r.code == code)
    }
}
