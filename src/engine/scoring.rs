use crate::config::MatchingConfig;
use crate::geo::distance_km;
use crate::models::matching::{MatchKind, MatchReason, MatchResult, ScoreBreakdown};
use crate::models::ride::{RideOffer, TripRequest};

/// Scores one ride against a trip request on a 0..=100 scale.
///
/// Returns `None` when pickup plus dropoff deviation exceeds the allowed share
/// of the rider's direct trip. The timing, pickup distance and detour
/// components only lower the score; they never reject.
pub fn compute_score(
    request: &TripRequest,
    ride: &RideOffer,
    config: &MatchingConfig,
) -> Option<MatchResult> {
    let route_similarity = route_similarity(request, ride, config)?;

    let pickup_distance_km = distance_km(&request.origin, &ride.origin);
    let detour_km = detour_km(request, ride);

    let breakdown = ScoreBreakdown {
        route_similarity,
        timing_score: timing_score(request, ride, config),
        distance_score: distance_score(pickup_distance_km, config),
        detour_cost_score: detour_cost_score(detour_km, config),
        detour_km,
        pickup_distance_km,
    };

    let score = weighted_score(&breakdown, config);

    Some(MatchResult {
        ride_id: ride.id,
        score,
        reason: MatchReason::from_score(score),
        breakdown,
        kind: MatchKind::Scored,
    })
}

pub fn weighted_score(breakdown: &ScoreBreakdown, config: &MatchingConfig) -> f64 {
    let score = (breakdown.route_similarity * config.route_weight)
        + (breakdown.timing_score * config.timing_weight)
        + (breakdown.distance_score * config.distance_weight)
        + (breakdown.detour_cost_score * config.detour_weight);

    score.clamp(0.0, 100.0)
}

fn route_similarity(
    request: &TripRequest,
    ride: &RideOffer,
    config: &MatchingConfig,
) -> Option<f64> {
    let origin_detour = distance_km(&request.origin, &ride.origin);
    let dest_detour = distance_km(&request.destination, &ride.destination);
    let direct = distance_km(&request.origin, &request.destination);

    let total_detour = origin_detour + dest_detour;
    let max_acceptable = direct * config.max_detour_ratio;

    if total_detour > max_acceptable {
        return None;
    }

    // Only reachable with max_acceptable == 0 when the ride covers the
    // exact same points.
    if max_acceptable <= 0.0 {
        return Some(100.0);
    }

    Some((100.0 * (1.0 - total_detour / max_acceptable)).clamp(0.0, 100.0))
}

fn timing_score(request: &TripRequest, ride: &RideOffer, config: &MatchingConfig) -> f64 {
    let diff_minutes = (request.departure_time - ride.departure_time)
        .num_seconds()
        .unsigned_abs() as f64
        / 60.0;

    linear_decay(diff_minutes, config.timing_window_minutes)
}

fn distance_score(pickup_distance_km: f64, config: &MatchingConfig) -> f64 {
    linear_decay(pickup_distance_km, config.max_pickup_distance_km)
}

/// Extra kilometres the driver covers by routing through the rider's pickup.
fn detour_km(request: &TripRequest, ride: &RideOffer) -> f64 {
    let via_rider = distance_km(&ride.origin, &request.origin)
        + distance_km(&request.origin, &ride.destination);
    let direct = distance_km(&ride.origin, &ride.destination);

    (via_rider - direct).max(0.0)
}

fn detour_cost_score(detour_km: f64, config: &MatchingConfig) -> f64 {
    (100.0 - detour_km * config.detour_penalty_per_km).max(0.0)
}

fn linear_decay(value: f64, limit: f64) -> f64 {
    if limit <= 0.0 || value > limit {
        return 0.0;
    }

    (100.0 * (1.0 - value / limit)).clamp(0.0, 100.0)
}
