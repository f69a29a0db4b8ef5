use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earn,
    Redeem,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Earn => "earn",
            TransactionKind::Redeem => "redeem",
        }
    }
}

/// One immutable ledger entry. `points` is positive for earn and negative
/// for redeem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardTransaction {
    pub id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,
    pub points: i64,
    pub cashback: Option<f64>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub ride_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
    FreeRide,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CouponSource {
    Redemption,
    RideBonus,
}

impl CouponSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CouponSource::Redemption => "redemption",
            CouponSource::RideBonus => "ride_bonus",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub id: Uuid,
    pub user_id: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub min_ride_value: Option<f64>,
    pub source: CouponSource,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

impl Coupon {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionType {
    Cashback,
    DiscountCoupon,
    FreeRide,
}

/// A catalog entry. `value` is a currency amount for cashback and free
/// rides, and a percentage for discount coupons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RedemptionOption {
    pub id: String,
    pub title: String,
    pub points_required: i64,
    #[serde(rename = "type")]
    pub kind: RedemptionType,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnOutcome {
    pub points: i64,
    pub cashback: f64,
    pub bonus_points: i64,
    pub coupon: Option<Coupon>,
    pub transaction: RewardTransaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    pub transaction: RewardTransaction,
    pub coupon: Option<Coupon>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RewardsSummary {
    pub user_id: String,
    pub balance: i64,
    pub total_earned: i64,
    pub total_redeemed: i64,
    pub total_cashback: f64,
    pub rides_rewarded: usize,
    pub active_coupons: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    TransactionRecorded(RewardTransaction),
    CouponIssued(Coupon),
    CouponUsed(Coupon),
}
