//! In-memory state store using DashMap.
//!
//! `AppState` owns the latest sensor state of every vehicle. The risk engine
//! itself is stateless; this store feeds it and keeps what it returns.

use aeroguard_core::{
    AirspaceClassifier, RiskEngine, RiskVerdict, SensorState, TelemetryRecord, ValidationError,
    WeatherSnapshot, Zone,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

use super::vehicle::{DashboardView, IngestSource, VehicleRecord, VehicleStatus};
use crate::config::Config;
use crate::weather::WeatherProvider;

const MAX_VEHICLE_ID_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("record contains no sensor data")]
    EmptyRecord,
    #[error("invalid vehicle id: {0}")]
    InvalidVehicleId(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Result of one ingested record.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub vehicle_id: String,
    pub zone: Zone,
    pub verdict: RiskVerdict,
}

/// Serialized dashboard update fanned out to WebSocket clients.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub vehicle_id: String,
    pub payload: Arc<str>,
}

/// Application state shared by handlers, loops and the vehicle link.
pub struct AppState {
    config: Config,
    engine: RiskEngine,
    airspace: AirspaceClassifier,
    weather: Option<WeatherProvider>,
    vehicles: DashMap<String, VehicleRecord>,
    pub tx: broadcast::Sender<StateUpdate>,
}

impl AppState {
    pub fn new(config: Config, engine: RiskEngine) -> Self {
        let weather = WeatherProvider::from_config(&config);
        if weather.is_none() {
            tracing::warn!("OPENWEATHER_API_KEY not set, weather lookups disabled");
        }
        Self::with_weather(config, engine, weather)
    }

    pub fn with_weather(config: Config, engine: RiskEngine, weather: Option<WeatherProvider>) -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            airspace: config.airspace(),
            config,
            engine,
            weather,
            vehicles: DashMap::new(),
            tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    pub fn airspace(&self) -> &AirspaceClassifier {
        &self.airspace
    }

    /// Merge a record, look up weather at the vehicle's position and evaluate.
    pub async fn ingest(
        &self,
        record: TelemetryRecord,
        source: IngestSource,
    ) -> Result<IngestOutcome, IngestError> {
        let vehicle_id = self.resolve_vehicle_id(&record)?;

        // Preview the merged state to validate it and find the position.
        let mut preview = self.sensors_of(&vehicle_id);
        preview.merge(&record);
        let snapshot = preview.snapshot();
        snapshot.validate()?;

        let weather = match (&self.weather, snapshot.position.coordinates()) {
            (Some(provider), Some((lat, lon))) => provider.current(lat, lon).await,
            _ => None,
        };

        self.ingest_with_weather(record, source, weather)
    }

    /// Synchronous half of [`AppState::ingest`] with weather already resolved.
    pub fn ingest_with_weather(
        &self,
        record: TelemetryRecord,
        source: IngestSource,
        weather: Option<WeatherSnapshot>,
    ) -> Result<IngestOutcome, IngestError> {
        let vehicle_id = self.resolve_vehicle_id(&record)?;
        let now = Utc::now();

        // The entry guard is held from read to write so concurrent partial
        // records for one vehicle merge instead of overwriting each other.
        let (mut entry, sensors, zone, verdict) = match self.vehicles.entry(vehicle_id.clone()) {
            Entry::Occupied(occupied) => {
                let (sensors, zone, verdict) =
                    self.assess(&occupied.get().sensors, &record, weather.as_ref())?;
                (occupied.into_ref(), sensors, zone, verdict)
            }
            Entry::Vacant(vacant) => {
                let (sensors, zone, verdict) =
                    self.assess(&SensorState::default(), &record, weather.as_ref())?;
                let entry = vacant.insert(VehicleRecord::new(&vehicle_id, now));
                (entry, sensors, zone, verdict)
            }
        };
        entry.sensors = sensors;
        if weather.is_some() {
            entry.weather = weather;
        }
        entry.zone = zone;
        entry.verdict = Some(verdict.clone());
        entry.source = source;
        entry.status = VehicleStatus::Active;
        entry.last_update = now;
        if record.scan_requested() {
            entry.scan_until = Some(now + ChronoDuration::seconds(self.config.scan_hold_secs as i64));
            tracing::info!(vehicle_id = %vehicle_id, "Diagnostic scan triggered");
        }
        let view = entry.dashboard(now);
        drop(entry);

        tracing::info!(
            vehicle_id = %vehicle_id,
            zone = %zone,
            score = verdict.score,
            level = %verdict.level,
            "Risk assessment: {}",
            verdict.explanation
        );

        self.publish(&view);
        Ok(IngestOutcome {
            vehicle_id,
            zone,
            verdict,
        })
    }

    /// Evaluate a record without touching any vehicle state.
    ///
    /// Missing sensor fields take the idle defaults; the zone is classified
    /// from the record's position when not supplied.
    pub fn evaluate_detached(
        &self,
        record: &TelemetryRecord,
        zone: Option<Zone>,
        weather: Option<&WeatherSnapshot>,
    ) -> Result<(Zone, RiskVerdict), IngestError> {
        let mut sensors = SensorState::default();
        sensors.merge(record);
        let snapshot = sensors.snapshot();
        snapshot.validate()?;
        let zone = zone.unwrap_or_else(|| self.airspace.classify(snapshot.position.coordinates()));
        Ok((zone, self.engine.evaluate(&snapshot, zone, weather)))
    }

    pub fn get_vehicle(&self, vehicle_id: &str) -> Option<DashboardView> {
        let now = Utc::now();
        self.vehicles.get(vehicle_id).map(|entry| entry.dashboard(now))
    }

    /// Get all vehicle views, ordered by id.
    pub fn list_vehicles(&self) -> Vec<DashboardView> {
        let now = Utc::now();
        let mut views: Vec<DashboardView> = self
            .vehicles
            .iter()
            .map(|entry| entry.value().dashboard(now))
            .collect();
        views.sort_by(|a, b| a.vehicle_id.cmp(&b.vehicle_id));
        views
    }

    /// Dashboard view of the default vehicle, or a standby view before first contact.
    pub fn current(&self) -> DashboardView {
        let vehicle_id = &self.config.default_vehicle_id;
        self.get_vehicle(vehicle_id).unwrap_or_else(|| {
            let now = Utc::now();
            VehicleRecord::new(vehicle_id, now).dashboard(now)
        })
    }

    /// Mark vehicles silent for longer than the staleness window. Returns how many changed.
    pub fn mark_stale(&self, now: DateTime<Utc>) -> usize {
        let window = ChronoDuration::seconds(self.config.stale_after_secs as i64);
        let mut changed = Vec::new();
        for mut entry in self.vehicles.iter_mut() {
            if entry.status == VehicleStatus::Active && now - entry.last_update > window {
                entry.status = VehicleStatus::Stale;
                entry.source = IngestSource::Idle;
                changed.push(entry.dashboard(now));
            }
        }
        for view in &changed {
            tracing::warn!(vehicle_id = %view.vehicle_id, "Vehicle telemetry stale");
            self.publish(view);
        }
        changed.len()
    }

    /// Merge a record over `current` and evaluate the result without storing it.
    fn assess(
        &self,
        current: &SensorState,
        record: &TelemetryRecord,
        weather: Option<&WeatherSnapshot>,
    ) -> Result<(SensorState, Zone, RiskVerdict), IngestError> {
        let mut sensors = current.clone();
        sensors.merge(record);
        let snapshot = sensors.snapshot();
        snapshot.validate()?;

        let zone = self.airspace.classify(snapshot.position.coordinates());
        let verdict = self.engine.evaluate(&snapshot, zone, weather);
        Ok((sensors, zone, verdict))
    }

    fn sensors_of(&self, vehicle_id: &str) -> SensorState {
        self.vehicles
            .get(vehicle_id)
            .map(|entry| entry.sensors.clone())
            .unwrap_or_default()
    }

    fn resolve_vehicle_id(&self, record: &TelemetryRecord) -> Result<String, IngestError> {
        if record.is_empty() {
            return Err(IngestError::EmptyRecord);
        }
        let vehicle_id = record
            .vehicle_id
            .as_deref()
            .map(str::trim)
            .unwrap_or(&self.config.default_vehicle_id);
        if vehicle_id.is_empty()
            || vehicle_id.len() > MAX_VEHICLE_ID_LEN
            || vehicle_id.chars().any(char::is_control)
        {
            return Err(IngestError::InvalidVehicleId(vehicle_id.to_string()));
        }
        Ok(vehicle_id.to_string())
    }

    fn publish(&self, view: &DashboardView) {
        match serde_json::to_string(view) {
            Ok(payload) => {
                // No subscribers is not an error.
                let _ = self.tx.send(StateUpdate {
                    vehicle_id: view.vehicle_id.clone(),
                    payload: payload.into(),
                });
            }
            Err(err) => tracing::error!("Failed to serialize dashboard update: {}", err),
        }
    }
}
