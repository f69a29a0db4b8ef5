use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::engine::matcher::{rank, rank_with_fallback, RankedRides};
use crate::engine::sequencer::{sequence, PassengerPickup, PickupPlan};
use crate::error::AppError;
use crate::geo::Coordinate;
use crate::models::ride::TripRequest;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/match", post(match_rides))
        .route("/sequence", post(sequence_pickups))
}

#[derive(Deserialize, Default)]
pub struct MatchParams {
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Deserialize)]
pub struct SequenceRequest {
    pub driver_start: Coordinate,
    pub passengers: Vec<PassengerPickup>,
    pub final_destination: Coordinate,
}

async fn match_rides(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MatchParams>,
    Json(request): Json<TripRequest>,
) -> Json<RankedRides> {
    let start = Instant::now();
    let rides = state.ride_snapshot();

    let ranked = if params.fallback {
        rank_with_fallback(&request, &rides, &state.matching)
    } else {
        RankedRides {
            results: rank(&request, &rides, &state.matching),
            fallback: false,
        }
    };

    state
        .metrics
        .match_latency_seconds
        .observe(start.elapsed().as_secs_f64());

    let outcome = match (ranked.fallback, ranked.results.is_empty()) {
        (true, _) => "fallback",
        (false, true) => "empty",
        (false, false) => "matched",
    };
    state
        .metrics
        .match_requests_total
        .with_label_values(&[outcome])
        .inc();

    info!(
        candidates = rides.len(),
        results = ranked.results.len(),
        outcome,
        "match request served"
    );

    Json(ranked)
}

async fn sequence_pickups(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SequenceRequest>,
) -> Result<Json<PickupPlan>, AppError> {
    if payload.passengers.iter().any(|p| p.id.trim().is_empty()) {
        return Err(AppError::BadRequest("passenger id cannot be empty".to_string()));
    }

    Ok(Json(sequence(
        payload.driver_start,
        &payload.passengers,
        payload.final_destination,
        state.matching.average_speed_kmh,
    )))
}
