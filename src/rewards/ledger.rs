use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RewardsConfig;
use crate::models::rewards::{
    Coupon, CouponSource, DiscountType, EarnOutcome, RedemptionOption, RedemptionType, Redemption,
    RewardTransaction, RewardsSummary, TransactionKind,
};
use crate::rewards::catalog::{affordable, assert_well_formed};
use crate::rewards::codes::{generate_code, CODE_SUFFIX_LEN};
use crate::rewards::random::RandomSource;
use crate::rewards::RewardsError;

const MAX_CODE_ATTEMPTS: usize = 16;

#[derive(Debug, Default)]
struct Account {
    transactions: Vec<RewardTransaction>,
    /// Coupon ids in issue order.
    coupon_ids: Vec<Uuid>,
}

impl Account {
    fn balance(&self) -> i64 {
        self.transactions.iter().map(|tx| tx.points).sum()
    }

    fn rides_rewarded(&self) -> usize {
        self.transactions
            .iter()
            .filter(|tx| tx.kind == TransactionKind::Earn && tx.ride_id.is_some())
            .count()
    }
}

/// Append-only points ledger and coupon wallet, keyed by user id.
///
/// The balance is never stored: it is the sum of the user's transaction
/// deltas. Earn and redeem hold the user's account entry for the whole
/// check-append-mint sequence, and coupon use flips `is_used` under the
/// coupon's entry lock, so both are linearizable. Locks are always taken
/// account first, then coupon or code.
pub struct RewardsLedger {
    config: RewardsConfig,
    random: Arc<dyn RandomSource>,
    accounts: DashMap<String, Account>,
    coupons: DashMap<Uuid, Coupon>,
    codes: DashMap<String, Uuid>,
}

impl RewardsLedger {
    pub fn new(config: RewardsConfig, random: Arc<dyn RandomSource>) -> Self {
        Self {
            config,
            random,
            accounts: DashMap::new(),
            coupons: DashMap::new(),
            codes: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RewardsConfig {
        &self.config
    }

    /// Records the points for a completed ride.
    ///
    /// `total_prior_rides` is the number of rides the user finished before
    /// this one and decides the milestone bonus. A bonus coupon is issued
    /// when the injected random draw falls under the configured probability.
    pub fn earn_for_ride(
        &self,
        user_id: &str,
        ride_price: f64,
        total_prior_rides: u32,
        ride_id: Option<Uuid>,
    ) -> EarnOutcome {
        self.record_earn(user_id, ride_price, ride_id, |_| total_prior_rides)
    }

    /// Records the points for a booked ride, counting the user's earlier
    /// ride-linked earns under the account lock so each milestone is paid
    /// once even when bookings race.
    pub fn earn_for_booking(&self, user_id: &str, ride_price: f64, ride_id: Uuid) -> EarnOutcome {
        self.record_earn(user_id, ride_price, Some(ride_id), |account| {
            u32::try_from(account.rides_rewarded()).unwrap_or(u32::MAX)
        })
    }

    fn record_earn(
        &self,
        user_id: &str,
        ride_price: f64,
        ride_id: Option<Uuid>,
        prior_rides: impl FnOnce(&Account) -> u32,
    ) -> EarnOutcome {
        let now = Utc::now();
        let points = self.config.points_per_ride;
        let cashback = round2(ride_price.max(0.0) * self.config.cashback_rate);

        let mut account = self.accounts.entry(user_id.to_string()).or_default();

        let ride_number = prior_rides(&*account).saturating_add(1);
        let bonus_points = self.config.milestone_bonus(ride_number);

        let coupon = if self.random.unit() < self.config.bonus_coupon_probability {
            Some(self.mint_coupon(
                &mut account,
                user_id,
                DiscountType::Percentage,
                self.config.bonus_coupon_percent,
                Some(self.config.coupon_min_ride_value),
                CouponSource::RideBonus,
                now,
                Duration::days(self.config.bonus_coupon_validity_days),
            ))
        } else {
            None
        };

        let description = if bonus_points > 0 {
            format!("Ride completed (+{bonus_points} bonus for ride #{ride_number})")
        } else {
            "Ride completed".to_string()
        };

        let transaction = RewardTransaction {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            kind: TransactionKind::Earn,
            points: points + bonus_points,
            cashback: Some(cashback),
            description,
            created_at: now,
            ride_id,
        };
        account.transactions.push(transaction.clone());
        drop(account);

        info!(
            user_id,
            points,
            bonus_points,
            cashback,
            coupon_issued = coupon.is_some(),
            "ride rewards recorded"
        );

        EarnOutcome {
            points,
            cashback,
            bonus_points,
            coupon,
            transaction,
        }
    }

    /// Spends points on a catalog option.
    ///
    /// Fails with [`RewardsError::InsufficientPoints`] and leaves the ledger
    /// untouched when the balance is short. Cashback is only recorded on the
    /// transaction; crediting a wallet is up to the caller.
    ///
    /// # Panics
    ///
    /// On a malformed catalog entry (non-positive cost, invalid value).
    pub fn redeem(
        &self,
        user_id: &str,
        option: &RedemptionOption,
    ) -> Result<Redemption, RewardsError> {
        assert_well_formed(option);
        let now = Utc::now();

        let mut account = self.accounts.entry(user_id.to_string()).or_default();
        let balance = account.balance();
        if balance < option.points_required {
            return Err(RewardsError::InsufficientPoints {
                required: option.points_required,
                balance,
            });
        }

        let validity = Duration::days(self.config.redeemed_coupon_validity_days);
        let coupon = match option.kind {
            RedemptionType::Cashback => None,
            RedemptionType::DiscountCoupon => Some(self.mint_coupon(
                &mut account,
                user_id,
                DiscountType::Percentage,
                option.value,
                Some(self.config.coupon_min_ride_value),
                CouponSource::Redemption,
                now,
                validity,
            )),
            RedemptionType::FreeRide => Some(self.mint_coupon(
                &mut account,
                user_id,
                DiscountType::FreeRide,
                option.value,
                None,
                CouponSource::Redemption,
                now,
                validity,
            )),
        };

        let transaction = RewardTransaction {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            kind: TransactionKind::Redeem,
            points: -option.points_required,
            cashback: (option.kind == RedemptionType::Cashback).then_some(option.value),
            description: format!("Redeemed {}", option.title),
            created_at: now,
            ride_id: None,
        };
        account.transactions.push(transaction.clone());
        drop(account);

        info!(
            user_id,
            option_id = %option.id,
            points = option.points_required,
            "points redeemed"
        );

        Ok(Redemption { transaction, coupon })
    }

    /// Promotional credit such as a welcome or referral bonus.
    pub fn credit_bonus(
        &self,
        user_id: &str,
        points: i64,
        description: &str,
    ) -> Result<RewardTransaction, RewardsError> {
        if points <= 0 {
            return Err(RewardsError::NonPositiveCredit(points));
        }

        let transaction = RewardTransaction {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            kind: TransactionKind::Earn,
            points,
            cashback: None,
            description: description.to_string(),
            created_at: Utc::now(),
            ride_id: None,
        };

        self.accounts
            .entry(user_id.to_string())
            .or_default()
            .transactions
            .push(transaction.clone());

        info!(user_id, points, "bonus points credited");
        Ok(transaction)
    }

    pub fn balance(&self, user_id: &str) -> i64 {
        self.accounts
            .get(user_id)
            .map(|account| account.balance())
            .unwrap_or(0)
    }

    /// The user's transactions, newest first.
    pub fn transactions(&self, user_id: &str) -> Vec<RewardTransaction> {
        self.accounts
            .get(user_id)
            .map(|account| account.transactions.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of ride-linked earn entries, i.e. rides already rewarded.
    pub fn rides_rewarded(&self, user_id: &str) -> usize {
        self.accounts
            .get(user_id)
            .map(|account| account.rides_rewarded())
            .unwrap_or(0)
    }

    pub fn summary(&self, user_id: &str) -> RewardsSummary {
        let transactions = self.transactions(user_id);

        let total_earned = transactions.iter().map(|tx| tx.points.max(0)).sum();
        let total_redeemed = transactions.iter().map(|tx| (-tx.points).max(0)).sum();
        let total_cashback = round2(transactions.iter().filter_map(|tx| tx.cashback).sum());

        RewardsSummary {
            user_id: user_id.to_string(),
            balance: transactions.iter().map(|tx| tx.points).sum(),
            total_earned,
            total_redeemed,
            total_cashback,
            rides_rewarded: self.rides_rewarded(user_id),
            active_coupons: self.user_coupons(user_id).len(),
        }
    }

    /// Catalog entries the user can currently afford.
    pub fn available_options(
        &self,
        user_id: &str,
        catalog: &[RedemptionOption],
    ) -> Vec<RedemptionOption> {
        affordable(catalog, self.balance(user_id))
    }

    /// Unused, unexpired coupons, newest first.
    pub fn user_coupons(&self, user_id: &str) -> Vec<Coupon> {
        self.user_coupons_at(user_id, Utc::now())
    }

    pub fn user_coupons_at(&self, user_id: &str, now: DateTime<Utc>) -> Vec<Coupon> {
        let Some(account) = self.accounts.get(user_id) else {
            return Vec::new();
        };

        account
            .coupon_ids
            .iter()
            .rev()
            .filter_map(|id| self.coupons.get(id).map(|coupon| coupon.clone()))
            .filter(|coupon| coupon.is_active_at(now))
            .collect()
    }

    pub fn coupon(&self, coupon_id: Uuid) -> Option<Coupon> {
        self.coupons.get(&coupon_id).map(|coupon| coupon.clone())
    }

    pub fn coupon_by_code(&self, code: &str) -> Option<Coupon> {
        let coupon_id = *self.codes.get(code)?;
        self.coupon(coupon_id)
    }

    /// Marks a coupon used. Returns `false` without changing anything when
    /// the coupon is unknown, already used, or expired.
    pub fn use_coupon(&self, coupon_id: Uuid) -> bool {
        self.use_coupon_at(coupon_id, Utc::now())
    }

    pub fn use_coupon_at(&self, coupon_id: Uuid, now: DateTime<Utc>) -> bool {
        let Some(mut coupon) = self.coupons.get_mut(&coupon_id) else {
            return false;
        };

        if !coupon.is_active_at(now) {
            return false;
        }

        coupon.is_used = true;
        coupon.used_at = Some(now);
        info!(coupon_id = %coupon_id, user_id = %coupon.user_id, "coupon used");
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn mint_coupon(
        &self,
        account: &mut Account,
        user_id: &str,
        discount_type: DiscountType,
        discount_value: f64,
        min_ride_value: Option<f64>,
        source: CouponSource,
        now: DateTime<Utc>,
        validity: Duration,
    ) -> Coupon {
        let id = Uuid::new_v4();
        let coupon = Coupon {
            id,
            user_id: user_id.to_string(),
            code: self.reserve_code(id),
            discount_type,
            discount_value,
            min_ride_value,
            source,
            created_at: now,
            expires_at: now + validity,
            is_used: false,
            used_at: None,
        };

        self.coupons.insert(id, coupon.clone());
        account.coupon_ids.push(id);
        coupon
    }

    /// Draws codes until one is free. After `MAX_CODE_ATTEMPTS` collisions
    /// the suffix falls back to the coupon id's leading hex digits.
    fn reserve_code(&self, coupon_id: Uuid) -> String {
        let prefix = &self.config.coupon_code_prefix;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code(prefix, self.random.as_ref());
            match self.codes.entry(code.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(coupon_id);
                    return code;
                }
                Entry::Occupied(_) => warn!(code = %code, "coupon code collision; retrying"),
            }
        }

        let suffix: String = coupon_id
            .simple()
            .to_string()
            .to_ascii_uppercase()
            .chars()
            .take(CODE_SUFFIX_LEN)
            .collect();
        let code = format!("{prefix}{suffix}");
        self.codes.insert(code.clone(), coupon_id);
        code
    }
}

/// Discount a coupon gives on `ride_price`. Free-ride and fixed coupons are
/// capped at the price.
pub fn calculate_discount(coupon: &Coupon, ride_price: f64) -> f64 {
    match coupon.discount_type {
        DiscountType::FreeRide | DiscountType::Fixed => ride_price.min(coupon.discount_value),
        DiscountType::Percentage => ride_price * coupon.discount_value / 100.0,
    }
}

/// Whether the coupon can be spent on a ride of `ride_price` at `now`.
pub fn coupon_applies(coupon: &Coupon, ride_price: f64, now: DateTime<Utc>) -> bool {
    coupon.is_active_at(now)
        && coupon
            .min_ride_value
            .is_none_or(|minimum| ride_price >= minimum)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{calculate_discount, coupon_applies, RewardsLedger};
    use crate::config::RewardsConfig;
    use crate::models::rewards::{
        Coupon, CouponSource, DiscountType, RedemptionOption, RedemptionType, TransactionKind,
    };
    use crate::rewards::random::{FixedRandom, RandomSource};
    use crate::rewards::RewardsError;

    fn ledger(random: impl RandomSource + 'static) -> RewardsLedger {
        RewardsLedger::new(RewardsConfig::default(), Arc::new(random))
    }

    fn option(kind: RedemptionType, points_required: i64, value: f64) -> RedemptionOption {
        RedemptionOption {
            id: format!("{kind:?}-{points_required}"),
            title: "test option".to_string(),
            points_required,
            kind,
            value,
        }
    }

    fn coupon(
        discount_type: DiscountType,
        discount_value: f64,
        min_ride_value: Option<f64>,
    ) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: Uuid::new_v4(),
            user_id: "rider".to_string(),
            code: "RWDTEST0001".to_string(),
            discount_type,
            discount_value,
            min_ride_value,
            source: CouponSource::Redemption,
            created_at: now,
            expires_at: now + Duration::days(1),
            is_used: false,
            used_at: None,
        }
    }

    #[test]
    fn earn_records_points_and_cashback() {
        let ledger = ledger(FixedRandom::never());

        let outcome = ledger.earn_for_ride("rider", 123.45, 0, Some(Uuid::new_v4()));

        assert_eq!(outcome.points, 100);
        assert_eq!(outcome.bonus_points, 0);
        assert_eq!(outcome.cashback, 6.17);
        assert!(outcome.coupon.is_none());
        assert_eq!(outcome.transaction.points, 100);
        assert_eq!(outcome.transaction.kind, TransactionKind::Earn);
        assert_eq!(ledger.transactions("rider").len(), 1);
        assert_eq!(ledger.balance("rider"), 100);
    }

    #[test]
    fn milestone_ride_adds_bonus_to_single_transaction() {
        let ledger = ledger(FixedRandom::never());

        let outcome = ledger.earn_for_ride("rider", 80.0, 9, None);

        assert_eq!(outcome.bonus_points, 500);
        assert_eq!(outcome.transaction.points, 600);
        assert_eq!(ledger.transactions("rider").len(), 1);
    }

    #[test]
    fn winning_draw_issues_thirty_day_bonus_coupon() {
        let ledger = ledger(FixedRandom::always());

        let outcome = ledger.earn_for_ride("rider", 80.0, 0, None);

        let coupon = outcome.coupon.expect("bonus coupon");
        assert_eq!(coupon.source, CouponSource::RideBonus);
        assert_eq!(coupon.discount_type, DiscountType::Percentage);
        assert_eq!(coupon.expires_at - coupon.created_at, Duration::days(30));
        assert_eq!(ledger.user_coupons("rider"), vec![coupon]);
    }

    #[test]
    fn draw_at_probability_does_not_issue() {
        let ledger = ledger(FixedRandom::new(0.30));
        assert!(ledger.earn_for_ride("rider", 80.0, 0, None).coupon.is_none());

        let ledger = self::ledger(FixedRandom::new(0.29));
        assert!(ledger.earn_for_ride("rider", 80.0, 0, None).coupon.is_some());
    }

    #[test]
    fn redeem_discount_mints_percentage_coupon() {
        let ledger = ledger(FixedRandom::never());
        ledger.credit_bonus("rider", 700, "welcome").unwrap();

        let redemption = ledger
            .redeem("rider", &option(RedemptionType::DiscountCoupon, 600, 20.0))
            .unwrap();

        assert_eq!(redemption.transaction.points, -600);
        assert_eq!(redemption.transaction.kind, TransactionKind::Redeem);
        let coupon = redemption.coupon.expect("coupon");
        assert_eq!(coupon.discount_type, DiscountType::Percentage);
        assert_eq!(coupon.discount_value, 20.0);
        assert_eq!(coupon.min_ride_value, Some(5.0));
        assert_eq!(coupon.expires_at - coupon.created_at, Duration::days(60));
        assert!(coupon.code.starts_with("RWD"));
        assert_eq!(ledger.balance("rider"), 100);
    }

    #[test]
    fn redeem_free_ride_has_no_minimum() {
        let ledger = ledger(FixedRandom::never());
        ledger.credit_bonus("rider", 1500, "welcome").unwrap();

        let redemption = ledger
            .redeem("rider", &option(RedemptionType::FreeRide, 1500, 150.0))
            .unwrap();

        let coupon = redemption.coupon.unwrap();
        assert_eq!(coupon.discount_type, DiscountType::FreeRide);
        assert_eq!(coupon.min_ride_value, None);
    }

    #[test]
    fn redeem_cashback_records_amount_without_coupon() {
        let ledger = ledger(FixedRandom::never());
        ledger.credit_bonus("rider", 500, "welcome").unwrap();

        let redemption = ledger
            .redeem("rider", &option(RedemptionType::Cashback, 500, 25.0))
            .unwrap();

        assert!(redemption.coupon.is_none());
        assert_eq!(redemption.transaction.cashback, Some(25.0));
        assert_eq!(ledger.balance("rider"), 0);
    }

    #[test]
    fn insufficient_balance_changes_nothing() {
        let ledger = ledger(FixedRandom::never());
        ledger.credit_bonus("rider", 150, "welcome").unwrap();

        let err = ledger
            .redeem("rider", &option(RedemptionType::DiscountCoupon, 200, 10.0))
            .unwrap_err();

        assert_eq!(
            err,
            RewardsError::InsufficientPoints {
                required: 200,
                balance: 150
            }
        );
        assert!(err.to_string().contains("200"));
        assert_eq!(ledger.transactions("rider").len(), 1);
        assert!(ledger.user_coupons("rider").is_empty());
    }

    #[test]
    #[should_panic]
    fn zero_cost_option_panics() {
        let ledger = ledger(FixedRandom::never());
        let _ = ledger.redeem("rider", &option(RedemptionType::Cashback, 0, 10.0));
    }

    #[test]
    fn use_coupon_is_single_shot() {
        let ledger = ledger(FixedRandom::always());
        let coupon = ledger.earn_for_ride("rider", 50.0, 0, None).coupon.unwrap();

        assert!(ledger.use_coupon(coupon.id));
        let after_first = ledger.coupon(coupon.id).unwrap();
        assert!(after_first.is_used);
        assert!(after_first.used_at.is_some());

        assert!(!ledger.use_coupon(coupon.id));
        assert_eq!(ledger.coupon(coupon.id).unwrap(), after_first);
        assert!(ledger.user_coupons("rider").is_empty());
    }

    #[test]
    fn unknown_or_expired_coupon_cannot_be_used() {
        let ledger = ledger(FixedRandom::always());
        assert!(!ledger.use_coupon(Uuid::new_v4()));

        let coupon = ledger.earn_for_ride("rider", 50.0, 0, None).coupon.unwrap();
        let later = coupon.expires_at + Duration::seconds(1);

        assert!(!ledger.use_coupon_at(coupon.id, later));
        assert!(!ledger.coupon(coupon.id).unwrap().is_used);
    }

    #[test]
    fn expired_coupons_are_filtered_on_read() {
        let ledger = ledger(FixedRandom::always());
        let coupon = ledger.earn_for_ride("rider", 50.0, 0, None).coupon.unwrap();

        let before_expiry = coupon.expires_at - Duration::seconds(1);
        assert_eq!(ledger.user_coupons_at("rider", before_expiry).len(), 1);
        assert!(ledger.user_coupons_at("rider", coupon.expires_at).is_empty());
        assert!(!ledger.coupon(coupon.id).unwrap().is_used);
    }

    #[test]
    fn coupons_are_listed_newest_first() {
        let ledger = ledger(FixedRandom::always());
        let first = ledger.earn_for_ride("rider", 50.0, 0, None).coupon.unwrap();
        let second = ledger.earn_for_ride("rider", 50.0, 1, None).coupon.unwrap();

        let ids: Vec<Uuid> = ledger.user_coupons("rider").iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_ne!(first.code, second.code);
        assert_eq!(ledger.coupon_by_code(&first.code).unwrap().id, first.id);
    }

    #[test]
    fn concurrent_use_succeeds_exactly_once() {
        let ledger = Arc::new(ledger(FixedRandom::always()));
        let coupon = ledger.earn_for_ride("rider", 50.0, 0, None).coupon.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || ledger.use_coupon(coupon.id))
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|used| *used)
            .count();

        assert_eq!(successes, 1);
    }

    #[test]
    fn concurrent_redeems_never_overdraw() {
        let ledger = Arc::new(ledger(FixedRandom::never()));
        ledger.credit_bonus("rider", 1000, "welcome").unwrap();
        let cashback = option(RedemptionType::Cashback, 300, 10.0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let cashback = cashback.clone();
                thread::spawn(move || ledger.redeem("rider", &cashback).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(ledger.balance("rider"), 100);
    }

    #[test]
    fn concurrent_bookings_pay_a_milestone_once() {
        for _ in 0..200 {
            let ledger = Arc::new(ledger(FixedRandom::never()));
            for _ in 0..4 {
                ledger.earn_for_booking("rider", 40.0, Uuid::new_v4());
            }
            let barrier = Arc::new(Barrier::new(4));

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let ledger = Arc::clone(&ledger);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        ledger.earn_for_booking("rider", 40.0, Uuid::new_v4()).bonus_points
                    })
                })
                .collect();

            let bonuses: Vec<i64> = handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|bonus| *bonus > 0)
                .collect();

            assert_eq!(bonuses, vec![250]);
            assert_eq!(ledger.rides_rewarded("rider"), 8);
            assert_eq!(ledger.balance("rider"), 8 * 100 + 250);
        }
    }

    #[test]
    fn booking_earns_count_prior_rides_from_the_ledger() {
        let ledger = ledger(FixedRandom::never());
        ledger.earn_for_ride("rider", 40.0, 0, None);

        let bonuses: Vec<i64> = (0..5)
            .map(|_| ledger.earn_for_booking("rider", 40.0, Uuid::new_v4()).bonus_points)
            .collect();

        assert_eq!(bonuses, vec![0, 0, 0, 0, 250]);
    }

    #[test]
    fn balance_matches_sum_of_deltas() {
        let ledger = ledger(FixedRandom::never());
        let mut expected = 0;

        for ride in 0..12 {
            let outcome = ledger.earn_for_ride("rider", 60.0, ride, Some(Uuid::new_v4()));
            expected += outcome.transaction.points;
        }
        expected -= ledger
            .redeem("rider", &option(RedemptionType::DiscountCoupon, 300, 10.0))
            .unwrap()
            .transaction
            .points
            .abs();

        let sum: i64 = ledger.transactions("rider").iter().map(|tx| tx.points).sum();
        assert_eq!(sum, expected);
        assert_eq!(ledger.balance("rider"), expected);
        assert_eq!(ledger.rides_rewarded("rider"), 12);

        let summary = ledger.summary("rider");
        assert_eq!(summary.balance, expected);
        assert_eq!(summary.total_redeemed, 300);
        assert_eq!(summary.total_earned, 12 * 100 + 250 + 500);
    }

    #[test]
    fn users_are_isolated() {
        let ledger = ledger(FixedRandom::always());
        ledger.earn_for_ride("alice", 50.0, 0, None);

        assert_eq!(ledger.balance("bob"), 0);
        assert!(ledger.user_coupons("bob").is_empty());
        assert!(ledger.transactions("bob").is_empty());
    }

    #[test]
    fn non_positive_credit_is_rejected() {
        let ledger = ledger(FixedRandom::never());
        assert_eq!(
            ledger.credit_bonus("rider", 0, "nothing"),
            Err(RewardsError::NonPositiveCredit(0))
        );
    }

    #[test]
    fn discount_rules() {
        let free = coupon(DiscountType::FreeRide, 150.0, None);
        assert_eq!(calculate_discount(&free, 100.0), 100.0);
        assert_eq!(calculate_discount(&free, 200.0), 150.0);

        let percent = coupon(DiscountType::Percentage, 20.0, Some(5.0));
        assert_eq!(calculate_discount(&percent, 250.0), 50.0);

        let fixed = coupon(DiscountType::Fixed, 30.0, None);
        assert_eq!(calculate_discount(&fixed, 20.0), 20.0);
        assert_eq!(calculate_discount(&fixed, 80.0), 30.0);
    }

    #[test]
    fn minimum_ride_value_gates_application() {
        let percent = coupon(DiscountType::Percentage, 10.0, Some(5.0));
        let now = Utc::now();

        assert!(!coupon_applies(&percent, 4.99, now));
        assert!(coupon_applies(&percent, 5.0, now));
        assert!(!coupon_applies(&percent, 50.0, percent.expires_at));
    }
}
