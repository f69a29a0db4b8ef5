use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::rewards::{Coupon, LedgerEvent};
use crate::rewards::{calculate_discount, coupon_applies};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/coupons/:id/use", post(use_coupon))
        .route("/coupons/:id/discount", post(discount))
        .route("/coupons/code/:code", get(coupon_by_code))
}

#[derive(Serialize)]
pub struct UseCouponResponse {
    pub used: bool,
    pub coupon: Coupon,
}

#[derive(Deserialize)]
pub struct DiscountRequest {
    pub ride_price: f64,
}

#[derive(Serialize)]
pub struct DiscountResponse {
    pub coupon_id: Uuid,
    pub applicable: bool,
    pub discount: f64,
    pub payable: f64,
}

/// A coupon that was already used or has expired answers `used: false`.
async fn use_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UseCouponResponse>, AppError> {
    if state.ledger.coupon(id).is_none() {
        return Err(AppError::NotFound(format!("coupon {} not found", id)));
    }

    let used = state.ledger.use_coupon(id);
    let outcome = if used { "used" } else { "rejected" };
    state.metrics.coupon_use_total.with_label_values(&[outcome]).inc();

    let coupon = state
        .ledger
        .coupon(id)
        .ok_or_else(|| AppError::NotFound(format!("coupon {} not found", id)))?;

    if used {
        state.publish(LedgerEvent::CouponUsed(coupon.clone()));
    }

    Ok(Json(UseCouponResponse { used, coupon }))
}

async fn discount(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DiscountRequest>,
) -> Result<Json<DiscountResponse>, AppError> {
    if !payload.ride_price.is_finite() || payload.ride_price < 0.0 {
        return Err(AppError::BadRequest(
            "ride_price must be a non-negative number".to_string(),
        ));
    }

    let coupon = state
        .ledger
        .coupon(id)
        .ok_or_else(|| AppError::NotFound(format!("coupon {} not found", id)))?;

    let applicable = coupon_applies(&coupon, payload.ride_price, Utc::now());
    let discount = if applicable {
        calculate_discount(&coupon, payload.ride_price)
    } else {
        0.0
    };

    Ok(Json(DiscountResponse {
        coupon_id: id,
        applicable,
        discount,
        payable: (payload.ride_price - discount).max(0.0),
    }))
}

async fn coupon_by_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Coupon>, AppError> {
    state
        .ledger
        .coupon_by_code(&code.to_ascii_uppercase())
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("coupon code {} not found", code)))
}
