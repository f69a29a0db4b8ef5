use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub match_requests_total: IntCounterVec,
    pub match_latency_seconds: Histogram,
    pub open_rides: IntGauge,
    pub bookings_total: IntCounterVec,
    pub ledger_transactions_total: IntCounterVec,
    pub coupons_issued_total: IntCounterVec,
    pub coupon_use_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let match_requests_total = IntCounterVec::new(
            Opts::new("match_requests_total", "Ride match requests by outcome"),
            &["outcome"],
        )
        .expect("valid match_requests_total metric");

        let match_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "match_latency_seconds",
            "Latency of ranking candidate rides in seconds",
        ))
        .expect("valid match_latency_seconds metric");

        let open_rides = IntGauge::new("open_rides", "Pending rides with free seats")
            .expect("valid open_rides metric");

        let bookings_total = IntCounterVec::new(
            Opts::new("bookings_total", "Seat bookings by outcome"),
            &["outcome"],
        )
        .expect("valid bookings_total metric");

        let ledger_transactions_total = IntCounterVec::new(
            Opts::new("ledger_transactions_total", "Ledger transactions by kind"),
            &["kind"],
        )
        .expect("valid ledger_transactions_total metric");

        let coupons_issued_total = IntCounterVec::new(
            Opts::new("coupons_issued_total", "Coupons minted by source"),
            &["source"],
        )
        .expect("valid coupons_issued_total metric");

        let coupon_use_total = IntCounterVec::new(
            Opts::new("coupon_use_total", "Coupon use attempts by outcome"),
            &["outcome"],
        )
        .expect("valid coupon_use_total metric");

        registry
            .register(Box::new(match_requests_total.clone()))
            .expect("register match_requests_total");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");
        registry
            .register(Box::new(open_rides.clone()))
            .expect("register open_rides");
        registry
            .register(Box::new(bookings_total.clone()))
            .expect("register bookings_total");
        registry
            .register(Box::new(ledger_transactions_total.clone()))
            .expect("register ledger_transactions_total");
        registry
            .register(Box::new(coupons_issued_total.clone()))
            .expect("register coupons_issued_total");
        registry
            .register(Box::new(coupon_use_total.clone()))
            .expect("register coupon_use_total");

        Self {
            registry,
            match_requests_total,
            match_latency_seconds,
            open_rides,
            bookings_total,
            ledger_transactions_total,
            coupons_issued_total,
            coupon_use_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
