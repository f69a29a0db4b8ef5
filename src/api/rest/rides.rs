use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::api::rest::rewards::publish_earn;
use crate::error::AppError;
use crate::geo::Coordinate;
use crate::models::rewards::{Coupon, EarnOutcome, LedgerEvent};
use crate::models::ride::{RideOffer, RideStatus};
use crate::rewards::{calculate_discount, coupon_applies};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rides", post(create_ride).get(list_rides))
        .route("/rides/:id/status", patch(update_ride_status))
        .route("/rides/:id/book", post(book_ride))
}

#[derive(Deserialize)]
pub struct CreateRideRequest {
    pub driver_id: Uuid,
    pub origin: Coordinate,
    #[serde(default)]
    pub origin_label: String,
    pub destination: Coordinate,
    #[serde(default)]
    pub destination_label: String,
    pub departure_time: DateTime<Utc>,
    pub seats_available: u32,
    pub price_per_seat: f64,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RideStatus,
}

#[derive(Deserialize)]
pub struct BookRideRequest {
    pub user_id: String,
    #[serde(default = "one_seat")]
    pub seats: u32,
    pub coupon_id: Option<Uuid>,
}

fn one_seat() -> u32 {
    1
}

#[derive(Serialize)]
pub struct BookingReceipt {
    pub ride_id: Uuid,
    pub user_id: String,
    pub seats: u32,
    pub fare: f64,
    pub discount: f64,
    pub payable: f64,
    pub coupon: Option<Coupon>,
    pub rewards: EarnOutcome,
}

async fn create_ride(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRideRequest>,
) -> Result<Json<RideOffer>, AppError> {
    if payload.seats_available == 0 {
        return Err(AppError::BadRequest("seats_available must be > 0".to_string()));
    }

    if !payload.price_per_seat.is_finite() || payload.price_per_seat < 0.0 {
        return Err(AppError::BadRequest(
            "price_per_seat must be a non-negative number".to_string(),
        ));
    }

    let ride = RideOffer {
        id: Uuid::new_v4(),
        driver_id: payload.driver_id,
        origin: payload.origin,
        origin_label: payload.origin_label,
        destination: payload.destination,
        destination_label: payload.destination_label,
        departure_time: payload.departure_time,
        seats_available: payload.seats_available,
        status: RideStatus::Pending,
        price_per_seat: payload.price_per_seat,
    };

    state.rides.insert(ride.id, ride.clone());
    state.refresh_open_rides();

    info!(ride_id = %ride.id, driver_id = %ride.driver_id, "ride published");
    Ok(Json(ride))
}

async fn list_rides(State(state): State<Arc<AppState>>) -> Json<Vec<RideOffer>> {
    Json(state.ride_snapshot())
}

async fn update_ride_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<RideOffer>, AppError> {
    let updated = {
        let mut ride = state
            .rides
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("ride {} not found", id)))?;

        if ride.status.is_final() && ride.status != payload.status {
            return Err(AppError::Conflict(format!(
                "ride {} is already {:?}",
                id, ride.status
            )));
        }

        ride.status = payload.status;
        ride.clone()
    };

    state.refresh_open_rides();
    Ok(Json(updated))
}

/// Reserves seats, spends the rider's coupon if one is given, then records
/// the ride rewards.
async fn book_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BookRideRequest>,
) -> Result<Json<BookingReceipt>, AppError> {
    let result = reserve(&state, id, &payload);
    let outcome = if result.is_ok() { "success" } else { "error" };
    state.metrics.bookings_total.with_label_values(&[outcome]).inc();

    let (fare, coupon) = result?;
    state.refresh_open_rides();

    let discount = coupon
        .as_ref()
        .map(|coupon| calculate_discount(coupon, fare))
        .unwrap_or(0.0);
    let payable = round2((fare - discount).max(0.0));

    if let Some(coupon) = &coupon {
        state.metrics.coupon_use_total.with_label_values(&["used"]).inc();
        state.publish(LedgerEvent::CouponUsed(coupon.clone()));
    }

    let rewards = state.ledger.earn_for_booking(&payload.user_id, payable, id);
    publish_earn(&state, &rewards);

    info!(
        ride_id = %id,
        user_id = %payload.user_id,
        seats = payload.seats,
        fare,
        discount,
        "ride booked"
    );

    Ok(Json(BookingReceipt {
        ride_id: id,
        user_id: payload.user_id,
        seats: payload.seats,
        fare,
        discount,
        payable,
        coupon,
        rewards,
    }))
}

/// Holds the ride entry while the coupon is consumed, so a failed coupon
/// leaves the seats untouched and seats are never sold twice.
fn reserve(
    state: &AppState,
    ride_id: Uuid,
    payload: &BookRideRequest,
) -> Result<(f64, Option<Coupon>), AppError> {
    if payload.user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id cannot be empty".to_string()));
    }

    if payload.seats == 0 {
        return Err(AppError::BadRequest("seats must be > 0".to_string()));
    }

    let mut ride = state
        .rides
        .get_mut(&ride_id)
        .ok_or_else(|| AppError::NotFound(format!("ride {} not found", ride_id)))?;

    if ride.status != RideStatus::Pending {
        return Err(AppError::Conflict(format!("ride {} is not open for booking", ride_id)));
    }

    if ride.seats_available < payload.seats {
        return Err(AppError::Conflict(format!(
            "only {} seats left on ride {}",
            ride.seats_available, ride_id
        )));
    }

    let fare = round2(ride.price_per_seat * payload.seats as f64);

    let coupon = match payload.coupon_id {
        Some(coupon_id) => {
            let coupon = state
                .ledger
                .coupon(coupon_id)
                .ok_or_else(|| AppError::NotFound(format!("coupon {} not found", coupon_id)))?;

            if coupon.user_id != payload.user_id {
                return Err(AppError::BadRequest(format!(
                    "coupon {} belongs to another user",
                    coupon_id
                )));
            }

            if !coupon_applies(&coupon, fare, Utc::now()) || !state.ledger.use_coupon(coupon_id) {
                state.metrics.coupon_use_total.with_label_values(&["rejected"]).inc();
                return Err(AppError::Conflict(format!(
                    "coupon {} cannot be applied to this booking",
                    coupon.code
                )));
            }

            state.ledger.coupon(coupon_id)
        }
        None => None,
    };

    ride.seats_available -= payload.seats;
    Ok((fare, coupon))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
