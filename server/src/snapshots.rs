//! Hourly telemetry snapshots.
//!
//! The telemetry source publishes one JSON file per hour offset, `00.json` being
//! the most recent and `23.json` the oldest. Each file is a bare array of
//! `[lat, lon, altitude?]` points.

use crate::http_fetch::HttpFetch;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use serde_json::Value;

/// Number of hourly files in the aggregation window.
pub const SNAPSHOT_HOURS: u32 = 24;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawPoint {
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub offset_hours: u32,
    pub points: Vec<RawPoint>,
}

/// Build the URL of one hourly file.
///
/// URL format: `{base}/{offset:02}.json`
pub fn build_url(base_url: &str, offset_hours: u32) -> String {
    format!("{}/{:02}.json", base_url.trim_end_matches('/'), offset_hours)
}

/// Fetch all hourly snapshots concurrently.
///
/// `epoch` is the batch time: offset `n` is stamped `epoch - n hours`. Failed
/// snapshots are logged and left out, so the result may hold anywhere from 0
/// to 24 entries, ordered by ascending offset.
pub async fn fetch_snapshots<C: HttpFetch>(
    client: &C,
    base_url: &str,
    epoch: DateTime<Utc>,
) -> Vec<Snapshot> {
    let requests = (0..SNAPSHOT_HOURS)
        .map(|offset| fetch_snapshot(client, base_url, epoch, offset));

    join_all(requests).await.into_iter().flatten().collect()
}

async fn fetch_snapshot<C: HttpFetch>(
    client: &C,
    base_url: &str,
    epoch: DateTime<Utc>,
    offset_hours: u32,
) -> Option<Snapshot> {
    let url = build_url(base_url, offset_hours);

    let points = match client.get(&url).await.and_then(|body| parse_points(&body)) {
        Ok(points) => points,
        Err(err) => {
            log::warn!("Dropping snapshot {:02}: {:#}", offset_hours, err);
            return None;
        }
    };

    Some(Snapshot {
        timestamp: epoch - TimeDelta::hours(offset_hours.into()),
        offset_hours,
        points,
    })
}

/// Parse one snapshot body, silently skipping malformed points.
///
/// Fails only when the body is not a JSON array.
pub fn parse_points(body: &[u8]) -> Result<Vec<RawPoint>> {
    let value: Value = serde_json::from_slice(body).context("Snapshot body is not valid JSON")?;

    match value {
        Value::Array(items) => Ok(items.iter().filter_map(parse_point).collect()),
        other => Err(anyhow!("Snapshot body is not a list: {}", kind(&other))),
    }
}

fn parse_point(value: &Value) -> Option<RawPoint> {
    let fields = value.as_array()?;
    if fields.len() < 2 {
        return None;
    }

    let lat = fields[0].as_f64()?;
    let lon = fields[1].as_f64()?;
    let altitude = match fields.get(2) {
        Some(alt) => Some(alt.as_f64()?),
        None => None,
    };

    Some(RawPoint { lat, lon, altitude })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_fetch::testing::{GatedFetch, StaticFetch};
    use std::time::Duration;

    const BASE: &str = "https://telemetry.test/treasure";

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    // =========================================================================
    // build_url tests
    // =========================================================================

    #[test]
    fn test_build_url_hour_padding() {
        assert_eq!(build_url(BASE, 0), "https://telemetry.test/treasure/00.json");
        assert_eq!(build_url(BASE, 7), "https://telemetry.test/treasure/07.json");
        assert_eq!(build_url(BASE, 23), "https://telemetry.test/treasure/23.json");
    }

    #[test]
    fn test_build_url_trailing_slash() {
        assert_eq!(build_url("https://x.test/", 3), "https://x.test/03.json");
    }

    // =========================================================================
    // parse_points tests
    // =========================================================================

    #[test]
    fn test_parse_points_valid() {
        let points = parse_points(br#"[[10.5, -20.25, 12.1], [1, 2]]"#).unwrap();

        assert_eq!(
            points,
            vec![
                RawPoint { lat: 10.5, lon: -20.25, altitude: Some(12.1) },
                RawPoint { lat: 1.0, lon: 2.0, altitude: None },
            ]
        );
    }

    #[test]
    fn test_parse_points_drops_malformed_points() {
        let body = br#"[
            [1, 2, 3],
            [1],
            "nope",
            ["a", 2, 3],
            [1, "b"],
            [1, 2, "high"],
            [1, 2, null],
            [4, 5, 6, 7]
        ]"#;
        let points = parse_points(body).unwrap();

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].lat, 1.0);
        assert_eq!(points[1].altitude, Some(6.0));
    }

    #[test]
    fn test_parse_points_empty_list() {
        assert!(parse_points(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_points_rejects_non_list() {
        assert!(parse_points(br#"{"points": []}"#).is_err());
        assert!(parse_points(b"null").is_err());
        assert!(parse_points(b"<html>oops</html>").is_err());
    }

    // =========================================================================
    // fetch_snapshots tests
    // =========================================================================

    #[tokio::test]
    async fn test_fetch_snapshots_tolerates_failures() {
        let client = StaticFetch::new()
            .with(build_url(BASE, 0), "[[10, 20, 5]]")
            .with(build_url(BASE, 1), "[[10.09, 20, 5]]")
            .with(build_url(BASE, 2), "{\"error\": true}")
            .with(build_url(BASE, 5), "[]");

        let snapshots = fetch_snapshots(&client, BASE, epoch()).await;

        let offsets: Vec<u32> = snapshots.iter().map(|s| s.offset_hours).collect();
        assert_eq!(offsets, vec![0, 1, 5]);
        assert!(snapshots[2].points.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_snapshots_timestamps_from_batch_epoch() {
        let client = StaticFetch::new()
            .with(build_url(BASE, 0), "[]")
            .with(build_url(BASE, 23), "[]");

        let snapshots = fetch_snapshots(&client, BASE, epoch()).await;

        assert_eq!(snapshots[0].timestamp, epoch());
        assert_eq!(snapshots[1].timestamp.to_rfc3339(), "2024-05-31T13:00:00+00:00");
    }

    #[tokio::test]
    async fn test_fetch_snapshots_all_failed() {
        let snapshots = fetch_snapshots(&StaticFetch::new(), BASE, epoch()).await;
        assert!(snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_snapshots_requests_all_hours_at_once() {
        let client = GatedFetch::new(
            SNAPSHOT_HOURS as usize,
            StaticFetch::new().with(build_url(BASE, 0), "[[1, 2, 3]]"),
        );

        let snapshots = tokio::time::timeout(
            Duration::from_secs(2),
            fetch_snapshots(&client, BASE, epoch()),
        )
        .await
        .expect("requests were not all in flight together");

        assert_eq!(snapshots.len(), 1);
    }
}
