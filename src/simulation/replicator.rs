// Level replicator
// Selects in-band origin levels, scales them, and queues them by simulated arrival

use crate::config::ReplicationConfig;
use crate::simulation::order_book::{Side, VenueBook};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A replicated level on its way to the destination book.
///
/// Ephemeral: created by the replicator each step and consumed by the
/// matching engine within the same step.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticOrder {
    pub side: Side,
    pub price: f64,
    pub size: f64,
    /// Simulated arrival latency, milliseconds from step start
    pub arrival_offset: f64,
}

pub struct LevelReplicator {
    config: ReplicationConfig,
}

impl LevelReplicator {
    pub fn new(config: ReplicationConfig) -> Self {
        Self { config }
    }

    /// Build the processing queue for one step from the current origin book.
    ///
    /// Levels strictly inside the band around the origin mid price are scaled
    /// by the replication fraction, assigned uniform arrival offsets from a
    /// stream reseeded per step (same seed and step always reproduce the same
    /// ordering), sorted by arrival, and cut off once the running cumulative
    /// offset exceeds the latency budget. An empty queue is a valid outcome.
    pub fn build_queue(&self, origin: &VenueBook, step: usize) -> Vec<SyntheticOrder> {
        let mid = match origin.mid_price() {
            Some(mid) => mid,
            None => return Vec::new(),
        };

        let band = self.config.band_bp as f64 / 10_000.0;
        let lower = mid * (1.0 - band);
        let upper = mid * (1.0 + band);

        let mut orders = Vec::new();

        for level in origin.levels_in_priority(Side::Bid) {
            // open interval: a bid sitting exactly on the bound is not mirrored
            if level.price > lower {
                orders.push(SyntheticOrder {
                    side: Side::Bid,
                    price: level.price,
                    size: level.size * self.config.replication_fraction,
                    arrival_offset: 0.0,
                });
            }
        }

        for level in origin.levels_in_priority(Side::Ask) {
            if level.price < upper {
                orders.push(SyntheticOrder {
                    side: Side::Ask,
                    price: level.price,
                    size: level.size * self.config.replication_fraction,
                    arrival_offset: 0.0,
                });
            }
        }

        let mut rng = StdRng::seed_from_u64(self.config.random_seed ^ step as u64);
        for order in &mut orders {
            order.arrival_offset = rng.gen_range(0.0..self.config.latency_window);
        }

        orders.sort_by(|a, b| a.arrival_offset.total_cmp(&b.arrival_offset));

        let mut cumulative = 0.0;
        orders.retain(|order| {
            cumulative += order.arrival_offset;
            cumulative <= self.config.latency_budget
        });

        orders
    }
}
