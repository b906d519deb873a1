//! Open natural-hazard events feed (EONET v3 shape).
//!
//! Hazards are best-effort: any failure degrades to an empty list.

use crate::http_fetch::HttpFetch;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use shared::models::HazardEvent;

/// Category ids kept from the feed.
pub const HAZARD_CATEGORIES: [&str; 4] = ["wildfires", "severeStorms", "volcanoes", "seaLakeIce"];

/// Maximum number of events kept per run.
pub const MAX_HAZARD_EVENTS: usize = 40;

/// Only the envelope is typed; events are read field by field.
#[derive(Debug, Deserialize)]
struct Feed {
    events: Vec<Value>,
}

/// A usable geometry: a `[lon, lat]` point with a parseable date.
struct Fix {
    lat: f64,
    lon: f64,
    date: DateTime<Utc>,
    magnitude: Option<f64>,
}

/// Fetch current hazard events, returning an empty list on any failure.
pub async fn fetch_hazards<C: HttpFetch>(client: &C, feed_url: &str) -> Vec<HazardEvent> {
    let result = client
        .get(feed_url)
        .await
        .and_then(|body| parse_feed(&body));

    match result {
        Ok(events) => events,
        Err(err) => {
            log::warn!("Hazard feed unavailable, continuing without hazards: {:#}", err);
            Vec::new()
        }
    }
}

/// Parse the feed body into at most [`MAX_HAZARD_EVENTS`] events, in feed order.
pub fn parse_feed(body: &[u8]) -> Result<Vec<HazardEvent>> {
    let feed: Feed = serde_json::from_slice(body).context("Malformed hazard feed")?;

    Ok(feed
        .events
        .iter()
        .filter_map(into_hazard)
        .take(MAX_HAZARD_EVENTS)
        .collect())
}

fn into_hazard(event: &Value) -> Option<HazardEvent> {
    let category = event.get("categories")?.as_array()?.first()?;
    if !HAZARD_CATEGORIES.contains(&category.get("id")?.as_str()?) {
        return None;
    }

    let id = match event.get("id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    let fix = latest_fix(event.get("geometry")?.as_array()?)?;

    Some(HazardEvent {
        id,
        title: text(event, "title"),
        category: text(category, "title"),
        lat: fix.lat,
        lon: fix.lon,
        date: fix.date,
        magnitude: fix.magnitude,
    })
}

/// A string field, empty when missing or not a string.
fn text(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// The most recent valid geometry. Ties keep the earliest listed.
fn latest_fix(geometries: &[Value]) -> Option<Fix> {
    geometries
        .iter()
        .filter_map(as_fix)
        .fold(None, |best: Option<Fix>, fix| match best {
            Some(best) if best.date >= fix.date => Some(best),
            _ => Some(fix),
        })
}

fn as_fix(geometry: &Value) -> Option<Fix> {
    let pair = geometry.get("coordinates")?.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    let date = DateTime::parse_from_rfc3339(geometry.get("date")?.as_str()?)
        .ok()?
        .with_timezone(&Utc);

    Some(Fix {
        lat,
        lon,
        date,
        // Non-numeric magnitudes ("n/a", null) are reported as absent.
        magnitude: geometry.get("magnitudeValue").and_then(Value::as_f64),
    })
}
