use crate::geodesy::{distance_km, round1};
use shared::models::{BalloonInsight, HazardEvent, HazardProximity};

/// Hazards farther than this from every balloon are not reported.
pub const PROXIMITY_THRESHOLD_KM: f64 = 500.0;

/// Pair each hazard with its nearest balloon, keeping pairs within
/// [`PROXIMITY_THRESHOLD_KM`]. Output follows hazard order, at most one record
/// per hazard.
pub fn match_hazards(hazards: &[HazardEvent], balloons: &[BalloonInsight]) -> Vec<HazardProximity> {
    hazards
        .iter()
        .filter_map(|hazard| {
            let (balloon, distance) = nearest_balloon(hazard, balloons)?;
            if distance > PROXIMITY_THRESHOLD_KM {
                return None;
            }

            Some(HazardProximity {
                event_id: hazard.id.clone(),
                event_title: hazard.title.clone(),
                category: hazard.category.clone(),
                balloon_id: balloon.id.clone(),
                distance_km: round1(distance),
            })
        })
        .collect()
}

/// Nearest balloon by current position. Ties keep the first balloon.
fn nearest_balloon<'a>(
    hazard: &HazardEvent,
    balloons: &'a [BalloonInsight],
) -> Option<(&'a BalloonInsight, f64)> {
    balloons
        .iter()
        .map(|b| {
            let d = distance_km(hazard.lat, hazard.lon, b.current.lat, b.current.lon);
            (b, d)
        })
        .fold(None, |nearest, (b, d)| match nearest {
            Some((_, best)) if best <= d => nearest,
            _ => Some((b, d)),
        })
}
