use crate::models::rewards::{RedemptionOption, RedemptionType};

/// The redemption catalog offered to riders. Entries are grouped by type and
/// ascend by cost within a group, but lookups never rely on that ordering.
pub fn default_catalog() -> Vec<RedemptionOption> {
    vec![
        option("cashback_25", "₹25 cashback", 500, RedemptionType::Cashback, 25.0),
        option("cashback_60", "₹60 cashback", 1000, RedemptionType::Cashback, 60.0),
        option("cashback_150", "₹150 cashback", 2000, RedemptionType::Cashback, 150.0),
        option("discount_10", "10% off your next ride", 300, RedemptionType::DiscountCoupon, 10.0),
        option("discount_20", "20% off your next ride", 600, RedemptionType::DiscountCoupon, 20.0),
        option("discount_30", "30% off your next ride", 900, RedemptionType::DiscountCoupon, 30.0),
        option("free_ride_150", "Free ride up to ₹150", 1500, RedemptionType::FreeRide, 150.0),
        option("free_ride_300", "Free ride up to ₹300", 2500, RedemptionType::FreeRide, 300.0),
    ]
}

pub fn find_option<'a>(catalog: &'a [RedemptionOption], id: &str) -> Option<&'a RedemptionOption> {
    catalog.iter().find(|option| option.id == id)
}

/// Options whose cost fits in `balance`.
pub fn affordable(catalog: &[RedemptionOption], balance: i64) -> Vec<RedemptionOption> {
    catalog
        .iter()
        .filter(|option| option.points_required <= balance)
        .cloned()
        .collect()
}

/// Panics on entries that would produce a nonsensical transaction. Catalog
/// data is authored by developers, so a bad entry is a bug.
pub fn assert_well_formed(option: &RedemptionOption) {
    assert!(
        option.points_required > 0,
        "redemption option {} must cost a positive number of points, got {}",
        option.id,
        option.points_required
    );
    assert!(
        option.value.is_finite() && option.value >= 0.0,
        "redemption option {} has invalid value {}",
        option.id,
        option.value
    );
    if option.kind == RedemptionType::DiscountCoupon {
        assert!(
            option.value <= 100.0,
            "discount option {} exceeds 100%",
            option.id
        );
    }
}

fn option(
    id: &str,
    title: &str,
    points_required: i64,
    kind: RedemptionType,
    value: f64,
) -> RedemptionOption {
    RedemptionOption {
        id: id.to_string(),
        title: title.to_string(),
        points_required,
        kind,
        value,
    }
}
