//! Server configuration from environment.

use aeroguard_core::{AirspaceClassifier, RiskRules};
use anyhow::{Context, Result};
use std::env;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// TCP address for the line-delimited vehicle link (disabled when unset)
    pub link_addr: Option<String>,
    pub weather_url: String,
    /// Empty disables weather lookups
    pub weather_api_key: String,
    pub weather_cache_ttl_s: u64,
    pub weather_timeout_s: u64,
    pub airspace_center_lat: f64,
    pub airspace_center_lon: f64,
    pub red_radius_km: f64,
    pub yellow_radius_km: f64,
    /// Optional JSON rule table
    pub rules_path: Option<String>,
    pub default_vehicle_id: String,
    pub stale_after_secs: u64,
    pub scan_hold_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let airspace = AirspaceClassifier::default();
        Self {
            server_port: parse_env("AEROGUARD_PORT", 5000),
            link_addr: optional_env("AEROGUARD_LINK_ADDR"),
            weather_url: env::var("OPENWEATHER_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org/data/2.5/weather".to_string()),
            weather_api_key: env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
            weather_cache_ttl_s: parse_env("WEATHER_CACHE_TTL_S", 300),
            weather_timeout_s: parse_env("WEATHER_TIMEOUT_S", 5),
            airspace_center_lat: parse_env("AIRSPACE_CENTER_LAT", airspace.center_lat),
            airspace_center_lon: parse_env("AIRSPACE_CENTER_LON", airspace.center_lon),
            red_radius_km: parse_env("AIRSPACE_RED_RADIUS_KM", airspace.red_radius_km),
            yellow_radius_km: parse_env("AIRSPACE_YELLOW_RADIUS_KM", airspace.yellow_radius_km),
            rules_path: optional_env("AEROGUARD_RULES_PATH"),
            default_vehicle_id: env::var("AEROGUARD_DEFAULT_VEHICLE")
                .unwrap_or_else(|_| "UAV-1".to_string()),
            stale_after_secs: parse_env("AEROGUARD_STALE_AFTER_S", 10),
            scan_hold_secs: parse_env("AEROGUARD_SCAN_HOLD_S", 5),
        }
    }

    pub fn airspace(&self) -> AirspaceClassifier {
        AirspaceClassifier::new(
            self.airspace_center_lat,
            self.airspace_center_lon,
            self.red_radius_km,
            self.yellow_radius_km,
        )
    }

    /// Load the rule table once at startup.
    ///
    /// A configured path that does not exist falls back to the defaults; a file
    /// that exists but fails to parse or validate is fatal.
    pub fn load_rules(&self) -> Result<RiskRules> {
        let Some(path) = self.rules_path.as_deref() else {
            tracing::info!("No rules file configured, using default risk rules");
            return Ok(RiskRules::default());
        };

        if !Path::new(path).exists() {
            tracing::warn!("Rules file {} not found, using default risk rules", path);
            return Ok(RiskRules::default());
        }

        let rules = RiskRules::from_path(path)
            .with_context(|| format!("loading risk rules from {}", path))?;
        tracing::info!("Loaded risk rules from {}", path);
        Ok(rules)
    }

    pub fn weather_enabled(&self) -> bool {
        !self.weather_api_key.trim().is_empty()
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
