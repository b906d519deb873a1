//! Fleet-wide summary statistics.

use crate::geodesy::round1;
use shared::models::{
    AltitudeBands, BalloonInsight, DriftLeader, FleetStats, Hemisphere, HemisphereSplit, LngLat,
    LngLatBounds,
};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Size of one coverage grid cell, in degrees.
pub const GRID_CELL_DEG: f64 = 10.0;
const GRID_ROWS: usize = 18;
const GRID_COLS: usize = 36;
/// 18 x 36 cells of 10° cover the globe.
pub const GRID_CELLS: usize = GRID_ROWS * GRID_COLS;

pub const DRIFT_LEADERS: usize = 5;

pub fn fleet_stats(balloons: &[BalloonInsight], hazard_events: usize, hazard_matches: usize) -> FleetStats {
    let (avg_altitude, min_altitude, max_altitude) = altitude_summary(balloons);
    let bounds = current_bounds(balloons);

    FleetStats {
        total_balloons: balloons.len(),
        avg_altitude,
        min_altitude,
        max_altitude,
        coverage_percent: coverage_percent(balloons),
        data_points: balloons.iter().map(|b| b.history.len()).sum(),
        hemisphere_split: hemisphere_split(balloons),
        drift_leaders: drift_leaders(balloons),
        hazard_matches,
        hazard_event_count: hazard_events,
        altitude_bands: altitude_bands(balloons),
        lat_spread: bounds.map(|b| b.ne.lat - b.sw.lat).unwrap_or(0.0),
        lon_spread: bounds.map(|b| b.ne.lng - b.sw.lng).unwrap_or(0.0),
        bounds,
    }
}

/// (avg, min, max) over every known altitude of every history point.
fn altitude_summary(balloons: &[BalloonInsight]) -> (f64, f64, f64) {
    let altitudes: Vec<f64> = balloons
        .iter()
        .flat_map(|b| b.history.iter().filter_map(|p| p.altitude))
        .collect();

    if altitudes.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let sum: f64 = altitudes.iter().sum();
    let min = altitudes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = altitudes.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    (sum / altitudes.len() as f64, min, max)
}

/// Grid cell of a position. Points on the +90 / +180 edges fold into the last
/// row / column.
fn grid_cell(lat: f64, lon: f64) -> (usize, usize) {
    // Out-of-range positions are clamped into the edge cells on purpose.
    let row = ((lat + 90.0) / GRID_CELL_DEG).floor().clamp(0.0, (GRID_ROWS - 1) as f64);
    let col = ((lon + 180.0) / GRID_CELL_DEG).floor().clamp(0.0, (GRID_COLS - 1) as f64);
    (row as usize, col as usize)
}

fn coverage_percent(balloons: &[BalloonInsight]) -> f64 {
    let cells: HashSet<(usize, usize)> = balloons
        .iter()
        .flat_map(|b| b.history.iter())
        .map(|p| grid_cell(p.lat, p.lon))
        .collect();

    cells.len() as f64 / GRID_CELLS as f64 * 100.0
}

fn hemisphere_split(balloons: &[BalloonInsight]) -> HemisphereSplit {
    let mut split = HemisphereSplit::default();
    for balloon in balloons {
        match balloon.hemisphere {
            Hemisphere::North => split.north += 1,
            Hemisphere::South => split.south += 1,
            Hemisphere::Equatorial => split.equatorial += 1,
        }
    }
    split
}

/// Top drifters, largest first. Equal drifts keep balloon order.
fn drift_leaders(balloons: &[BalloonInsight]) -> Vec<DriftLeader> {
    let mut ranked: Vec<&BalloonInsight> = balloons.iter().collect();
    ranked.sort_by(|a, b| b.drift_km.partial_cmp(&a.drift_km).unwrap_or(Ordering::Equal));

    ranked
        .into_iter()
        .take(DRIFT_LEADERS)
        .map(|b| DriftLeader {
            id: b.id.clone(),
            drift_km: round1(b.drift_km),
        })
        .collect()
}

fn altitude_bands(balloons: &[BalloonInsight]) -> AltitudeBands {
    let mut bands = AltitudeBands::default();
    for altitude in balloons.iter().filter_map(|b| b.current.altitude) {
        match altitude {
            a if a < 0.0 => {}
            a if a < 5.0 => bands.below5 += 1,
            a if a < 10.0 => bands.from5_to10 += 1,
            a if a < 15.0 => bands.from10_to15 += 1,
            a if a < 20.0 => bands.from15_to20 += 1,
            a if a < 25.0 => bands.from20_to25 += 1,
            _ => bands.above25 += 1,
        }
    }
    bands
}

fn current_bounds(balloons: &[BalloonInsight]) -> Option<LngLatBounds> {
    balloons.iter().map(|b| &b.current).fold(None, |acc, p| {
        let bounds = acc.unwrap_or(LngLatBounds {
            sw: LngLat { lng: p.lon, lat: p.lat },
            ne: LngLat { lng: p.lon, lat: p.lat },
        });
        Some(LngLatBounds {
            sw: LngLat {
                lng: bounds.sw.lng.min(p.lon),
                lat: bounds.sw.lat.min(p.lat),
            },
            ne: LngLat {
                lng: bounds.ne.lng.max(p.lon),
                lat: bounds.ne.lat.max(p.lat),
            },
        })
    })
}
