use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::{MatchingConfig, RewardsConfig};
use crate::models::rewards::{LedgerEvent, RedemptionOption};
use crate::models::ride::RideOffer;
use crate::observability::metrics::Metrics;
use crate::rewards::catalog::{assert_well_formed, default_catalog};
use crate::rewards::{RandomSource, RewardsLedger};

pub struct AppState {
    pub rides: DashMap<Uuid, RideOffer>,
    pub ledger: RewardsLedger,
    pub catalog: Vec<RedemptionOption>,
    pub matching: MatchingConfig,
    pub ledger_events_tx: broadcast::Sender<LedgerEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        matching: MatchingConfig,
        rewards: RewardsConfig,
        random: Arc<dyn RandomSource>,
        event_buffer_size: usize,
    ) -> Self {
        let (ledger_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let catalog = default_catalog();
        catalog.iter().for_each(assert_well_formed);

        Self {
            rides: DashMap::new(),
            ledger: RewardsLedger::new(rewards, random),
            catalog,
            matching,
            ledger_events_tx,
            metrics: Metrics::new(),
        }
    }

    /// Snapshot of the ride board in a stable order (departure, then id) so
    /// ranking ties resolve the same way on every request.
    pub fn ride_snapshot(&self) -> Vec<RideOffer> {
        let mut rides: Vec<RideOffer> = self
            .rides
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rides.sort_by(|a, b| {
            a.departure_time
                .cmp(&b.departure_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        rides
    }

    pub fn publish(&self, event: LedgerEvent) {
        let _ = self.ledger_events_tx.send(event);
    }

    pub fn refresh_open_rides(&self) {
        let open = self
            .rides
            .iter()
            .filter(|entry| entry.value().is_matchable())
            .count();
        self.metrics.open_rides.set(open as i64);
    }
}
