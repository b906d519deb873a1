//! One aggregation run: fetch both feeds, rebuild trajectories, correlate.

use crate::config::Sources;
use crate::hazards::fetch_hazards;
use crate::http_fetch::HttpFetch;
use crate::proximity::match_hazards;
use crate::snapshots::{fetch_snapshots, Snapshot, SNAPSHOT_HOURS};
use crate::stats::fleet_stats;
use crate::trajectories::build_insights;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use shared::models::{FleetPayload, HazardEvent};

pub struct FleetEngine<C> {
    client: C,
    sources: Sources,
}

impl<C: HttpFetch> FleetEngine<C> {
    pub fn new(client: C, sources: Sources) -> Self {
        Self { client, sources }
    }

    /// Fetch the 24 snapshots and the hazard feed concurrently, then assemble.
    ///
    /// Feed failures only shrink the result. An error means the fetched data
    /// could not be aggregated at all.
    pub async fn aggregate(&self) -> Result<FleetPayload> {
        let epoch = Utc::now();

        let (snapshots, hazards) = tokio::join!(
            fetch_snapshots(&self.client, &self.sources.telemetry_base_url, epoch),
            fetch_hazards(&self.client, &self.sources.hazard_feed_url),
        );

        if snapshots.len() < SNAPSHOT_HOURS as usize {
            let missing: Vec<u32> = (0..SNAPSHOT_HOURS)
                .filter(|h| !snapshots.iter().any(|s| s.offset_hours == *h))
                .collect();
            log::warn!("Aggregating without hour offsets {:?}", missing);
        }

        let payload = assemble(&snapshots, hazards, Utc::now())?;

        log::info!(
            "Aggregated {}/{} snapshots: {} balloons, {} hazard events, {} proximity matches",
            snapshots.len(),
            SNAPSHOT_HOURS,
            payload.balloons.len(),
            payload.hazard_events.len(),
            payload.hazard_proximities.len(),
        );

        Ok(payload)
    }
}

/// Join fetched inputs into the payload stamped `last_updated`.
pub fn assemble(
    snapshots: &[Snapshot],
    hazard_events: Vec<HazardEvent>,
    last_updated: DateTime<Utc>,
) -> Result<FleetPayload> {
    let balloons = build_insights(snapshots).context("Failed to build balloon trajectories")?;
    let hazard_proximities = match_hazards(&hazard_events, &balloons);
    let stats = fleet_stats(&balloons, hazard_events.len(), hazard_proximities.len());

    Ok(FleetPayload {
        balloons,
        stats,
        hazard_events,
        hazard_proximities,
        last_updated,
    })
}
