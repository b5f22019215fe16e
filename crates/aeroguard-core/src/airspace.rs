//! Circular restricted-airspace classifier.
//!
//! A single restricted centre (typically an aerodrome reference point) with a
//! hard no-fly radius and a wider caution radius.

use crate::models::Zone;
use crate::spatial::{compass_point, haversine_distance, initial_bearing_deg};
use serde::{Deserialize, Serialize};

/// Restricted area definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirspaceClassifier {
    pub center_lat: f64,
    pub center_lon: f64,
    /// RED inside this radius
    pub red_radius_km: f64,
    /// YELLOW inside this radius (outside RED)
    pub yellow_radius_km: f64,
}

impl Default for AirspaceClassifier {
    fn default() -> Self {
        Self {
            // Trivandrum International Airport
            center_lat: 8.4821,
            center_lon: 76.9200,
            red_radius_km: 5.0,
            yellow_radius_km: 10.0,
        }
    }
}

/// Detailed classification for a single coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub zone: Zone,
    /// Distance to the restricted centre, rounded to 10 m
    pub distance_km: f64,
    /// Bearing from the coordinate toward the centre
    pub bearing_deg: f64,
    pub direction: String,
    pub center_lat: f64,
    pub center_lon: f64,
}

impl AirspaceClassifier {
    pub fn new(center_lat: f64, center_lon: f64, red_radius_km: f64, yellow_radius_km: f64) -> Self {
        Self {
            center_lat,
            center_lon,
            red_radius_km,
            yellow_radius_km: yellow_radius_km.max(red_radius_km),
        }
    }

    /// Classify a fix; `None` (no fix) or non-finite coordinates yield UNKNOWN.
    pub fn classify(&self, position: Option<(f64, f64)>) -> Zone {
        match position {
            Some((lat, lon)) if lat.is_finite() && lon.is_finite() => {
                self.zone_for_distance(self.distance_km(lat, lon))
            }
            _ => Zone::Unknown,
        }
    }

    pub fn zone_info(&self, lat: f64, lon: f64) -> ZoneInfo {
        let distance_km = self.distance_km(lat, lon);
        let bearing_deg = initial_bearing_deg(lat, lon, self.center_lat, self.center_lon);
        ZoneInfo {
            zone: self.classify(Some((lat, lon))),
            distance_km: (distance_km * 100.0).round() / 100.0,
            bearing_deg,
            direction: compass_point(bearing_deg).to_string(),
            center_lat: self.center_lat,
            center_lon: self.center_lon,
        }
    }

    fn distance_km(&self, lat: f64, lon: f64) -> f64 {
        haversine_distance(lat, lon, self.center_lat, self.center_lon) / 1000.0
    }

    fn zone_for_distance(&self, distance_km: f64) -> Zone {
        if distance_km < self.red_radius_km {
            Zone::Red
        } else if distance_km < self.yellow_radius_km {
            Zone::Yellow
        } else {
            Zone::Green
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_radius() {
        let airspace = AirspaceClassifier::default();
        assert_eq!(airspace.classify(Some((8.4821, 76.9200))), Zone::Red);
        assert_eq!(airspace.classify(Some((8.5100, 76.9300))), Zone::Red);
        assert_eq!(airspace.classify(Some((8.5500, 76.9500))), Zone::Yellow);
        assert_eq!(airspace.classify(Some((8.6000, 77.0000))), Zone::Green);
        assert_eq!(airspace.classify(Some((9.9312, 76.2673))), Zone::Green);
    }

    #[test]
    fn missing_fix_is_unknown() {
        let airspace = AirspaceClassifier::default();
        assert_eq!(airspace.classify(None), Zone::Unknown);
        assert_eq!(airspace.classify(Some((f64::NAN, 76.9))), Zone::Unknown);
    }

    #[test]
    fn zone_info_points_back_at_centre() {
        let airspace = AirspaceClassifier::default();
        let info = airspace.zone_info(8.5500, 76.9200);
        assert_eq!(info.zone, Zone::Yellow);
        assert_eq!(info.direction, "S");
        assert!((info.distance_km - 7.56).abs() < 0.05);
    }

    #[test]
    fn yellow_radius_never_smaller_than_red() {
        let airspace = AirspaceClassifier::new(0.0, 0.0, 5.0, 2.0);
        assert_eq!(airspace.yellow_radius_km, 5.0);
    }
}
