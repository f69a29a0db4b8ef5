use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::rewards::{
    Coupon, EarnOutcome, LedgerEvent, RedemptionOption, RewardTransaction, RewardsSummary,
};
use crate::rewards::catalog::find_option;
use crate::rewards::RewardsError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/catalog", get(catalog))
        .route("/rewards/:user_id", get(summary))
        .route("/rewards/:user_id/transactions", get(transactions))
        .route("/rewards/:user_id/coupons", get(coupons))
        .route("/rewards/:user_id/options", get(options))
        .route("/rewards/:user_id/redeem", post(redeem))
        .route("/rewards/:user_id/credit", post(credit))
}

#[derive(Deserialize)]
pub struct RedeemRequest {
    pub option_id: String,
}

#[derive(Serialize)]
pub struct RedeemResponse {
    pub success: bool,
    pub message: String,
    pub transaction: Option<RewardTransaction>,
    pub coupon: Option<Coupon>,
}

#[derive(Deserialize)]
pub struct CreditRequest {
    pub points: i64,
    pub description: String,
}

/// Broadcasts the ledger changes of an earn and counts them.
pub(crate) fn publish_earn(state: &AppState, outcome: &EarnOutcome) {
    state
        .metrics
        .ledger_transactions_total
        .with_label_values(&[outcome.transaction.kind.as_str()])
        .inc();
    state.publish(LedgerEvent::TransactionRecorded(outcome.transaction.clone()));

    if let Some(coupon) = &outcome.coupon {
        publish_coupon(state, coupon);
    }
}

fn publish_coupon(state: &AppState, coupon: &Coupon) {
    state
        .metrics
        .coupons_issued_total
        .with_label_values(&[coupon.source.as_str()])
        .inc();
    state.publish(LedgerEvent::CouponIssued(coupon.clone()));
}

async fn catalog(State(state): State<Arc<AppState>>) -> Json<Vec<RedemptionOption>> {
    Json(state.catalog.clone())
}

async fn summary(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<RewardsSummary> {
    Json(state.ledger.summary(&user_id))
}

async fn transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<Vec<RewardTransaction>> {
    Json(state.ledger.transactions(&user_id))
}

async fn coupons(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<Vec<Coupon>> {
    Json(state.ledger.user_coupons(&user_id))
}

async fn options(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Json<Vec<RedemptionOption>> {
    Json(state.ledger.available_options(&user_id, &state.catalog))
}

async fn redeem(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(payload): Json<RedeemRequest>,
) -> Result<(StatusCode, Json<RedeemResponse>), AppError> {
    let option = find_option(&state.catalog, &payload.option_id).ok_or_else(|| {
        AppError::NotFound(format!("redemption option {} not found", payload.option_id))
    })?;

    match state.ledger.redeem(&user_id, option) {
        Ok(redemption) => {
            state
                .metrics
                .ledger_transactions_total
                .with_label_values(&[redemption.transaction.kind.as_str()])
                .inc();
            state.publish(LedgerEvent::TransactionRecorded(redemption.transaction.clone()));
            if let Some(coupon) = &redemption.coupon {
                publish_coupon(&state, coupon);
            }

            Ok((
                StatusCode::OK,
                Json(RedeemResponse {
                    success: true,
                    message: format!("Redeemed {}", option.title),
                    transaction: Some(redemption.transaction),
                    coupon: redemption.coupon,
                }),
            ))
        }
        Err(err @ RewardsError::InsufficientPoints { .. }) => Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(RedeemResponse {
                success: false,
                message: err.to_string(),
                transaction: None,
                coupon: None,
            }),
        )),
        Err(err) => Err(err.into()),
    }
}

async fn credit(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(payload): Json<CreditRequest>,
) -> Result<Json<RewardTransaction>, AppError> {
    let transaction = state
        .ledger
        .credit_bonus(&user_id, payload.points, &payload.description)?;

    state
        .metrics
        .ledger_transactions_total
        .with_label_values(&[transaction.kind.as_str()])
        .inc();
    state.publish(LedgerEvent::TransactionRecorded(transaction.clone()));

    Ok(Json(transaction))
}
