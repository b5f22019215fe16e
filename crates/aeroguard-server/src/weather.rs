//! OpenWeather current-conditions provider.
//!
//! Lookups are cached per ~1 km grid cell. When the provider fails, an entry up
//! to twice the TTL old is served instead, and further calls are held back by
//! a [`Backoff`] gate so an outage does not turn into a request storm.

use crate::backoff::Backoff;
use crate::config::Config;
use aeroguard_core::models::DEFAULT_VISIBILITY_M;
use aeroguard_core::WeatherSnapshot;
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

const MAX_CACHE_ENTRIES: usize = 256;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather provider HTTP {0}")]
    Status(u16),
    #[error("weather payload missing {0}")]
    Payload(&'static str),
}

/// Cache key: coordinates rounded to 0.01 degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellKey(i32, i32);

impl CellKey {
    pub fn from_coordinates(lat: f64, lon: f64) -> Self {
        CellKey((lat * 100.0).round() as i32, (lon * 100.0).round() as i32)
    }
}

#[derive(Debug, Clone)]
struct CachedWeather {
    fetched_at: Instant,
    snapshot: WeatherSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct OpenWeatherCurrent {
    #[serde(default)]
    main: Option<OpenWeatherMain>,
    #[serde(default)]
    wind: Option<OpenWeatherWind>,
    #[serde(default)]
    visibility: Option<f64>,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OpenWeatherCondition {
    main: String,
    #[serde(default)]
    description: Option<String>,
}

impl OpenWeatherCurrent {
    pub fn into_snapshot(self) -> Result<WeatherSnapshot, WeatherError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or(WeatherError::Payload("weather[0]"))?;
        let main = self.main.ok_or(WeatherError::Payload("main"))?;

        Ok(WeatherSnapshot {
            wind_speed_mps: self.wind.and_then(|w| w.speed).unwrap_or(0.0),
            visibility_m: self.visibility.unwrap_or(DEFAULT_VISIBILITY_M),
            condition: condition.main.into(),
            temperature_c: main.temp,
            humidity_pct: main.humidity,
            description: condition.description,
        })
    }
}

pub struct WeatherProvider {
    client: Client,
    base_url: String,
    api_key: String,
    ttl: Duration,
    timeout: Duration,
    cache: DashMap<CellKey, CachedWeather>,
    backoff: Mutex<Backoff>,
}

impl WeatherProvider {
    /// `None` when no API key is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.weather_enabled() {
            return None;
        }
        Some(Self::new(
            &config.weather_url,
            &config.weather_api_key,
            Duration::from_secs(config.weather_cache_ttl_s.max(1)),
            Duration::from_secs(config.weather_timeout_s.max(1)),
        ))
    }

    pub fn new(base_url: &str, api_key: &str, ttl: Duration, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            ttl,
            timeout,
            cache: DashMap::new(),
            backoff: Mutex::new(Backoff::new(Duration::from_secs(5), Duration::from_secs(300))),
        }
    }

    /// Current conditions at a coordinate, or `None` when unavailable.
    pub async fn current(&self, lat: f64, lon: f64) -> Option<WeatherSnapshot> {
        let key = CellKey::from_coordinates(lat, lon);
        let now = Instant::now();
        let mut stale = None;
        if let Some(entry) = self.cache.get(&key) {
            let age = now.saturating_duration_since(entry.fetched_at);
            if age <= self.ttl {
                return Some(entry.snapshot.clone());
            }
            if age <= self.ttl.saturating_mul(2) {
                stale = Some(entry.snapshot.clone());
            }
        }

        let gate_open = self
            .backoff
            .lock()
            .map(|backoff| backoff.can_attempt(now))
            .unwrap_or(true);
        if !gate_open {
            tracing::debug!("Weather provider backing off, serving cached data");
            return stale;
        }

        match self.fetch(lat, lon).await {
            Ok(snapshot) => {
                if let Ok(mut backoff) = self.backoff.lock() {
                    backoff.record_success();
                }
                self.store(key, snapshot.clone());
                Some(snapshot)
            }
            Err(err) => {
                let delay = self
                    .backoff
                    .lock()
                    .map(|mut backoff| backoff.record_failure(Instant::now()))
                    .unwrap_or_default();
                if stale.is_some() {
                    tracing::warn!("Weather fetch failed, using stale cache: {}", err);
                } else {
                    tracing::warn!("Weather fetch failed: {} (retry in {:?})", err, delay);
                }
                stale
            }
        }
    }

    async fn fetch(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, WeatherError> {
        let lat = format!("{:.6}", lat);
        let lon = format!("{:.6}", lon);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeatherError::Status(response.status().as_u16()));
        }

        let payload: OpenWeatherCurrent = response.json().await?;
        payload.into_snapshot()
    }

    fn store(&self, key: CellKey, snapshot: WeatherSnapshot) {
        self.cache.insert(
            key,
            CachedWeather {
                fetched_at: Instant::now(),
                snapshot,
            },
        );
        self.prune();
    }

    /// Drop entries too old to serve even as stale, then the oldest beyond the cap.
    fn prune(&self) {
        let max_age = self.ttl.saturating_mul(2);
        self.cache.retain(|_, entry| entry.fetched_at.elapsed() <= max_age);
        if self.cache.len() <= MAX_CACHE_ENTRIES {
            return;
        }

        let mut entries: Vec<(CellKey, Instant)> = self
            .cache
            .iter()
            .map(|entry| (*entry.key(), entry.value().fetched_at))
            .collect();
        entries.sort_by_key(|(_, fetched_at)| *fetched_at);
        let excess = entries.len().saturating_sub(MAX_CACHE_ENTRIES);
        for (key, _) in entries.into_iter().take(excess) {
            self.cache.remove(&key);
        }
    }

    #[cfg(test)]
    fn seed(&self, lat: f64, lon: f64, snapshot: WeatherSnapshot, age: Duration) {
        let fetched_at = Instant::now()
            .checked_sub(age)
            .unwrap_or_else(Instant::now);
        self.cache.insert(
            CellKey::from_coordinates(lat, lon),
            CachedWeather { fetched_at, snapshot },
        );
    }
}
