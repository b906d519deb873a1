use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct LngLatBounds {
    pub sw: LngLat,
    pub ne: LngLat,
}

/// One known position of a balloon. Altitude is in km.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct BalloonHistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    North,
    South,
    Equatorial,
}

impl Hemisphere {
    /// Classifies a latitude with a 5° dead-band around the equator.
    pub fn from_lat(lat: f64) -> Self {
        if lat > 5.0 {
            Hemisphere::North
        } else if lat < -5.0 {
            Hemisphere::South
        } else {
            Hemisphere::Equatorial
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalloonInsight {
    pub id: String,
    pub history: Vec<BalloonHistoryPoint>,
    pub current: BalloonHistoryPoint,
    pub drift_km: f64,
    pub avg_speed_kph: f64,
    pub altitude_range_km: f64,
    pub altitude_trend_3h: Option<f64>,
    pub hemisphere: Hemisphere,
    pub pressure_hpa: Option<f64>,
    pub temperature_c: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardEvent {
    pub id: String,
    pub title: String,
    pub category: String,
    pub lat: f64,
    pub lon: f64,
    pub date: DateTime<Utc>,
    pub magnitude: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardProximity {
    pub event_id: String,
    pub event_title: String,
    pub category: String,
    pub balloon_id: String,
    pub distance_km: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HemisphereSplit {
    pub north: usize,
    pub south: usize,
    pub equatorial: usize,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriftLeader {
    pub id: String,
    pub drift_km: f64,
}

/// Balloon counts by current altitude, in 5 km bands.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AltitudeBands {
    pub below5: usize,
    pub from5_to10: usize,
    pub from10_to15: usize,
    pub from15_to20: usize,
    pub from20_to25: usize,
    pub above25: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_balloons: usize,
    pub avg_altitude: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub coverage_percent: f64,
    pub data_points: usize,
    pub hemisphere_split: HemisphereSplit,
    pub drift_leaders: Vec<DriftLeader>,
    pub hazard_matches: usize,
    pub hazard_event_count: usize,
    pub altitude_bands: AltitudeBands,
    pub bounds: Option<LngLatBounds>,
    pub lat_spread: f64,
    pub lon_spread: f64,
}

/// Everything one aggregation run hands to its caller.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetPayload {
    pub balloons: Vec<BalloonInsight>,
    pub stats: FleetStats,
    pub hazard_events: Vec<HazardEvent>,
    pub hazard_proximities: Vec<HazardProximity>,
    pub last_updated: DateTime<Utc>,
}
