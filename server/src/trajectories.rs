//! Per-balloon trajectories rebuilt from hourly snapshots.

use crate::atmosphere;
use crate::geodesy::distance_km;
use crate::snapshots::Snapshot;
use anyhow::{bail, Result};
use shared::models::{BalloonHistoryPoint, BalloonInsight, Hemisphere};
use std::collections::BTreeMap;

/// Identity of a balloon within one aggregation run.
///
/// The telemetry files carry no serial numbers: the n-th point of every hourly
/// file is assumed to be the same balloon. Nothing guarantees this across
/// hours, so the assumption is kept behind this key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BalloonKey(usize);

impl BalloonKey {
    pub fn from_position(index: usize) -> Self {
        BalloonKey(index)
    }

    /// Display id, e.g. `WB-0042`.
    pub fn id(&self) -> String {
        format!("WB-{:04}", self.0)
    }
}

/// Group snapshot points into histories keyed by balloon, oldest first.
pub fn group_histories(snapshots: &[Snapshot]) -> BTreeMap<BalloonKey, Vec<BalloonHistoryPoint>> {
    let mut histories: BTreeMap<BalloonKey, Vec<BalloonHistoryPoint>> = BTreeMap::new();

    for snapshot in snapshots {
        for (index, point) in snapshot.points.iter().enumerate() {
            histories
                .entry(BalloonKey::from_position(index))
                .or_default()
                .push(BalloonHistoryPoint {
                    timestamp: snapshot.timestamp,
                    lat: point.lat,
                    lon: point.lon,
                    altitude: point.altitude,
                });
        }
    }

    for history in histories.values_mut() {
        history.sort_by_key(|p| p.timestamp);
    }
    histories.retain(|_, history| !history.is_empty());

    histories
}

/// Build one insight per balloon, ordered by key.
///
/// Fails if a derived value is not a finite number, which means the input
/// broke an assumption the rest of the pipeline relies on.
pub fn build_insights(snapshots: &[Snapshot]) -> Result<Vec<BalloonInsight>> {
    group_histories(snapshots)
        .into_iter()
        .filter_map(|(key, history)| insight(key, history).transpose())
        .collect()
}

fn insight(key: BalloonKey, history: Vec<BalloonHistoryPoint>) -> Result<Option<BalloonInsight>> {
    let (Some(start), Some(current)) = (history.first(), history.last()) else {
        return Ok(None);
    };
    let current = current.clone();

    let drift_km = if history.len() > 1 {
        distance_km(start.lat, start.lon, current.lat, current.lon)
    } else {
        0.0
    };
    let hours_covered = history.len() - 1;
    let avg_speed_kph = if hours_covered > 0 {
        drift_km / hours_covered as f64
    } else {
        0.0
    };

    let insight = BalloonInsight {
        id: key.id(),
        drift_km,
        avg_speed_kph,
        altitude_range_km: altitude_range(&history),
        altitude_trend_3h: altitude_trend_3h(&history),
        hemisphere: Hemisphere::from_lat(current.lat),
        pressure_hpa: current.altitude.map(atmosphere::pressure_hpa),
        temperature_c: current.altitude.map(atmosphere::temperature_c),
        current,
        history,
    };

    check_finite(&insight)?;
    Ok(Some(insight))
}

fn altitude_range(history: &[BalloonHistoryPoint]) -> f64 {
    let altitudes = history.iter().filter_map(|p| p.altitude);
    let bounds = altitudes.fold(None, |acc: Option<(f64, f64)>, alt| match acc {
        Some((min, max)) => Some((min.min(alt), max.max(alt))),
        None => Some((alt, alt)),
    });

    bounds.map(|(min, max)| max - min).unwrap_or(0.0)
}

/// Change in altitude against the point three steps back in the available
/// history, which is not necessarily three hours back when snapshots are
/// missing.
fn altitude_trend_3h(history: &[BalloonHistoryPoint]) -> Option<f64> {
    let current = history.last()?.altitude?;
    let earlier = history[history.len().saturating_sub(4)].altitude?;
    Some(current - earlier)
}

fn check_finite(insight: &BalloonInsight) -> Result<()> {
    let derived = [
        insight.current.lat,
        insight.current.lon,
        insight.drift_km,
        insight.avg_speed_kph,
        insight.altitude_range_km,
    ];
    let estimates = [
        insight.altitude_trend_3h,
        insight.pressure_hpa,
        insight.temperature_c,
    ];
    if derived.iter().chain(estimates.iter().flatten()).any(|v| !v.is_finite()) {
        bail!("Non-finite trajectory values for balloon {}", insight.id);
    }
    Ok(())
}
