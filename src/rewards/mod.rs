pub mod catalog;
pub mod codes;
pub mod ledger;
pub mod random;

use thiserror::Error;

pub use ledger::{calculate_discount, coupon_applies, RewardsLedger};
pub use random::{FixedRandom, RandomSource, SeededRandom, SystemRandom};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RewardsError {
    #[error("insufficient points: {required} required, {balance} available")]
    InsufficientPoints { required: i64, balance: i64 },

    #[error("credited points must be positive, got {0}")]
    NonPositiveCredit(i64),
}
