use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub rng_seed: Option<u64>,
    pub matching: MatchingConfig,
    pub rewards: RewardsConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            rng_seed: parse_optional("RNG_SEED")?,
            matching: MatchingConfig::from_env()?,
            rewards: RewardsConfig::from_env()?,
        })
    }
}

/// Tunables for ride scoring, ranking and pickup sequencing.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Share of the rider's direct trip length that pickup plus dropoff
    /// deviation may consume before a ride is rejected.
    pub max_detour_ratio: f64,
    pub timing_window_minutes: f64,
    pub max_pickup_distance_km: f64,
    /// Score points lost per extra kilometre the driver drives.
    pub detour_penalty_per_km: f64,
    pub route_weight: f64,
    pub timing_weight: f64,
    pub distance_weight: f64,
    pub detour_weight: f64,
    /// Results below this combined score are dropped.
    pub min_score: f64,
    pub fallback_score: f64,
    pub average_speed_kmh: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_detour_ratio: 0.3,
            timing_window_minutes: 360.0,
            max_pickup_distance_km: 5.0,
            detour_penalty_per_km: 10.0,
            route_weight: 0.4,
            timing_weight: 0.3,
            distance_weight: 0.2,
            detour_weight: 0.1,
            min_score: 1.0,
            fallback_score: 50.0,
            average_speed_kmh: 30.0,
        }
    }
}

impl MatchingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        Ok(Self {
            max_detour_ratio: parse_or_default(
                "MATCH_MAX_DETOUR_RATIO",
                defaults.max_detour_ratio,
            )?,
            timing_window_minutes: parse_or_default(
                "MATCH_TIMING_WINDOW_MINUTES",
                defaults.timing_window_minutes,
            )?,
            max_pickup_distance_km: parse_or_default(
                "MATCH_MAX_PICKUP_DISTANCE_KM",
                defaults.max_pickup_distance_km,
            )?,
            detour_penalty_per_km: parse_or_default(
                "MATCH_DETOUR_PENALTY_PER_KM",
                defaults.detour_penalty_per_km,
            )?,
            route_weight: parse_or_default("MATCH_ROUTE_WEIGHT", defaults.route_weight)?,
            timing_weight: parse_or_default("MATCH_TIMING_WEIGHT", defaults.timing_weight)?,
            distance_weight: parse_or_default("MATCH_DISTANCE_WEIGHT", defaults.distance_weight)?,
            detour_weight: parse_or_default("MATCH_DETOUR_WEIGHT", defaults.detour_weight)?,
            min_score: parse_or_default("MATCH_MIN_SCORE", defaults.min_score)?,
            fallback_score: parse_or_default("MATCH_FALLBACK_SCORE", defaults.fallback_score)?,
            average_speed_kmh: parse_or_default(
                "MATCH_AVERAGE_SPEED_KMH",
                defaults.average_speed_kmh,
            )?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub rides: u32,
    pub bonus_points: i64,
}

/// Tunables for earning, redeeming and coupon minting.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardsConfig {
    pub points_per_ride: i64,
    pub cashback_rate: f64,
    pub milestones: Vec<Milestone>,
    pub bonus_coupon_probability: f64,
    pub bonus_coupon_percent: f64,
    pub bonus_coupon_validity_days: i64,
    pub redeemed_coupon_validity_days: i64,
    pub coupon_min_ride_value: f64,
    pub coupon_code_prefix: String,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            points_per_ride: 100,
            cashback_rate: 0.05,
            milestones: vec![
                Milestone { rides: 5, bonus_points: 250 },
                Milestone { rides: 10, bonus_points: 500 },
                Milestone { rides: 25, bonus_points: 1000 },
                Milestone { rides: 50, bonus_points: 2500 },
                Milestone { rides: 100, bonus_points: 5000 },
            ],
            bonus_coupon_probability: 0.30,
            bonus_coupon_percent: 10.0,
            bonus_coupon_validity_days: 30,
            redeemed_coupon_validity_days: 60,
            coupon_min_ride_value: 5.0,
            coupon_code_prefix: "RWD".to_string(),
        }
    }
}

impl RewardsConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let milestones = match env::var("REWARDS_MILESTONES") {
            Ok(raw) => parse_milestones(&raw)?,
            Err(_) => defaults.milestones,
        };

        Ok(Self {
            points_per_ride: parse_or_default("REWARDS_POINTS_PER_RIDE", defaults.points_per_ride)?,
            cashback_rate: parse_or_default("REWARDS_CASHBACK_RATE", defaults.cashback_rate)?,
            milestones,
            bonus_coupon_probability: parse_or_default(
                "REWARDS_BONUS_COUPON_PROBABILITY",
                defaults.bonus_coupon_probability,
            )?,
            bonus_coupon_percent: parse_or_default(
                "REWARDS_BONUS_COUPON_PERCENT",
                defaults.bonus_coupon_percent,
            )?,
            bonus_coupon_validity_days: parse_or_default(
                "REWARDS_BONUS_COUPON_VALIDITY_DAYS",
                defaults.bonus_coupon_validity_days,
            )?,
            redeemed_coupon_validity_days: parse_or_default(
                "REWARDS_REDEEMED_COUPON_VALIDITY_DAYS",
                defaults.redeemed_coupon_validity_days,
            )?,
            coupon_min_ride_value: parse_or_default(
                "REWARDS_COUPON_MIN_RIDE_VALUE",
                defaults.coupon_min_ride_value,
            )?,
            coupon_code_prefix: env::var("REWARDS_COUPON_CODE_PREFIX")
                .unwrap_or(defaults.coupon_code_prefix),
        })
    }

    /// Bonus points for the ride that brings the user to `ride_count`.
    pub fn milestone_bonus(&self, ride_count: u32) -> i64 {
        self.milestones
            .iter()
            .find(|milestone| milestone.rides == ride_count)
            .map(|milestone| milestone.bonus_points)
            .unwrap_or(0)
    }
}

/// Parses `rides:bonus` pairs separated by commas, e.g. `5:250,10:500`.
pub fn parse_milestones(raw: &str) -> Result<Vec<Milestone>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (rides, bonus) = entry.split_once(':').ok_or_else(|| {
                AppError::Internal(format!("invalid REWARDS_MILESTONES entry: {entry}"))
            })?;
            let rides = rides.trim().parse::<u32>().map_err(|err| {
                AppError::Internal(format!("invalid REWARDS_MILESTONES rides {rides}: {err}"))
            })?;
            let bonus_points = bonus.trim().parse::<i64>().map_err(|err| {
                AppError::Internal(format!("invalid REWARDS_MILESTONES bonus {bonus}: {err}"))
            })?;
            Ok(Milestone { rides, bonus_points })
        })
        .collect()
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(key)?.unwrap_or(default))
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}
