use serde::Serialize;
use tracing::debug;

use crate::config::MatchingConfig;
use crate::engine::scoring::compute_score;
use crate::models::matching::{MatchKind, MatchReason, MatchResult, ScoreBreakdown};
use crate::models::ride::{RideOffer, TripRequest};

/// Ranks candidate rides for a trip request, best first.
///
/// Only pending rides with free seats are scored. Rejected rides and results
/// under `min_score` are dropped. The sort is stable so equal scores keep the
/// order the rides were passed in.
pub fn rank(
    request: &TripRequest,
    rides: &[RideOffer],
    config: &MatchingConfig,
) -> Vec<MatchResult> {
    let mut results: Vec<MatchResult> = rides
        .iter()
        .filter(|ride| ride.is_matchable())
        .filter_map(|ride| compute_score(request, ride, config))
        .filter(|result| result.score >= config.min_score)
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));

    debug!(
        candidates = rides.len(),
        matched = results.len(),
        "ranked rides"
    );

    results
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedRides {
    pub results: Vec<MatchResult>,
    pub fallback: bool,
}

/// Wraps [`rank`] with the "show everything bookable" policy used by the
/// search screen: when nothing matches, every matchable ride is returned at
/// the neutral `fallback_score`, in input order.
pub fn rank_with_fallback(
    request: &TripRequest,
    rides: &[RideOffer],
    config: &MatchingConfig,
) -> RankedRides {
    let results = rank(request, rides, config);
    if !results.is_empty() {
        return RankedRides {
            results,
            fallback: false,
        };
    }

    let results = rides
        .iter()
        .filter(|ride| ride.is_matchable())
        .map(|ride| neutral_result(ride, config.fallback_score))
        .collect();

    RankedRides {
        results,
        fallback: true,
    }
}

fn neutral_result(ride: &RideOffer, score: f64) -> MatchResult {
    MatchResult {
        ride_id: ride.id,
        score,
        breakdown: ScoreBreakdown {
            route_similarity: 0.0,
            timing_score: 0.0,
            distance_score: 0.0,
            detour_cost_score: 0.0,
            detour_km: 0.0,
            pickup_distance_km: 0.0,
        },
        reason: MatchReason::from_score(score),
        kind: MatchKind::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{rank, rank_with_fallback};
    use crate::config::MatchingConfig;
    use crate::geo::Coordinate;
    use crate::models::matching::MatchKind;
    use crate::models::ride::{RideOffer, RideStatus, TripRequest};

    fn departure() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 30, 0).unwrap()
    }

    fn point(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn request() -> TripRequest {
        TripRequest {
            origin: point(28.60, 77.20),
            origin_label: String::new(),
            destination: point(28.70, 77.30),
            destination_label: String::new(),
            departure_time: departure(),
        }
    }

    fn ride(
        id_seed: u128,
        origin: Coordinate,
        destination: Coordinate,
        offset_minutes: i64,
    ) -> RideOffer {
        RideOffer {
            id: Uuid::from_u128(id_seed),
            driver_id: Uuid::from_u128(1000 + id_seed),
            origin,
            origin_label: String::new(),
            destination,
            destination_label: String::new(),
            departure_time: departure() + Duration::minutes(offset_minutes),
            seats_available: 3,
            status: RideStatus::Pending,
            price_per_seat: 90.0,
        }
    }

    #[test]
    fn orders_by_descending_score() {
        let rides = vec![
            ride(1, point(28.61, 77.21), point(28.69, 77.29), 10),
            ride(2, point(28.601, 77.201), point(28.699, 77.299), 10),
            ride(3, point(28.601, 77.201), point(28.699, 77.299), 200),
        ];

        let results = rank(&request(), &rides, &MatchingConfig::default());

        let ids: Vec<u128> = results.iter().map(|r| r.ride_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn skips_unmatchable_rides() {
        let mut full = ride(1, point(28.601, 77.201), point(28.699, 77.299), 0);
        full.seats_available = 0;
        let mut cancelled = ride(2, point(28.601, 77.201), point(28.699, 77.299), 0);
        cancelled.status = RideStatus::Cancelled;
        let mut active = ride(3, point(28.601, 77.201), point(28.699, 77.299), 0);
        active.status = RideStatus::Active;

        let results = rank(&request(), &[full, cancelled, active], &MatchingConfig::default());

        assert!(results.is_empty());
    }

    #[test]
    fn ties_keep_input_order() {
        let rides: Vec<RideOffer> = (1..=4)
            .map(|seed| ride(seed, point(28.601, 77.201), point(28.699, 77.299), 15))
            .collect();

        let results = rank(&request(), &rides, &MatchingConfig::default());

        let ids: Vec<u128> = results.iter().map(|r| r.ride_id.as_u128()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn drops_results_below_min_score() {
        let rides = vec![ride(1, point(28.601, 77.201), point(28.699, 77.299), 600)];
        let config = MatchingConfig {
            min_score: 99.0,
            ..MatchingConfig::default()
        };

        assert!(rank(&request(), &rides, &config).is_empty());
    }

    #[test]
    fn fallback_returns_matchable_rides_at_neutral_score() {
        let far = ride(1, point(19.07, 72.87), point(18.52, 73.85), 0);
        let mut cancelled = ride(2, point(19.07, 72.87), point(18.52, 73.85), 0);
        cancelled.status = RideStatus::Cancelled;
        let other = ride(3, point(12.97, 77.59), point(13.08, 80.27), 0);

        let rides = [far, cancelled, other];
        let ranked = rank_with_fallback(&request(), &rides, &MatchingConfig::default());

        assert!(ranked.fallback);
        let ids: Vec<u128> = ranked.results.iter().map(|r| r.ride_id.as_u128()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(ranked
            .results
            .iter()
            .all(|r| r.score == 50.0 && r.kind == MatchKind::Fallback));
    }

    #[test]
    fn fallback_not_used_when_matches_exist() {
        let rides = vec![ride(1, point(28.601, 77.201), point(28.699, 77.299), 0)];

        let ranked = rank_with_fallback(&request(), &rides, &MatchingConfig::default());

        assert!(!ranked.fallback);
        assert_eq!(ranked.results[0].kind, MatchKind::Scored);
    }
}
