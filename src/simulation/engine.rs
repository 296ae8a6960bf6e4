// Simulation engine
// Drives replication, matching, and reconciliation across a bounded number of
// steps, accumulating balances, reconciled books, and fee history

use crate::config::SimulationConfig;
use crate::error::{SimulationError, SimulationResult};
use crate::simulation::ledger::{FeeEvent, FeeSchedule, Venue, VenueLedger};
use crate::simulation::matching_engine::MatchingEngine;
use crate::simulation::order_book::{OrderBookSnapshot, VenueBook};
use crate::simulation::reconciler::Reconciler;
use crate::simulation::replicator::LevelReplicator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Everything a run produces, for the reporting collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub origin_ledger: VenueLedger,
    pub destination_ledger: VenueLedger,
    /// Reconciled destination book after each completed step
    pub reconciled_books: Vec<OrderBookSnapshot>,
    /// Run-wide fee history in execution order
    pub fee_events: Vec<FeeEvent>,
    pub steps_completed: usize,
    /// Set when the series ran out before `max_steps`; results are partial
    pub truncated: bool,
}

impl SimulationReport {
    pub fn fees_for(&self, venue: Venue) -> impl Iterator<Item = &FeeEvent> {
        self.fee_events.iter().filter(move |e| e.venue == venue)
    }

    pub fn total_fees(&self, venue: Venue) -> f64 {
        self.fees_for(venue).map(|e| e.fee).sum()
    }
}

/// Validate a snapshot series: non-empty, strictly increasing timestamps,
/// well-formed books
pub fn validate_series(series: &[OrderBookSnapshot], name: &str) -> SimulationResult<()> {
    if series.is_empty() {
        return Err(SimulationError::MalformedSnapshotSequence(format!(
            "{} series is empty",
            name
        )));
    }

    for (i, window) in series.windows(2).enumerate() {
        if window[1].timestamp <= window[0].timestamp {
            return Err(SimulationError::MalformedSnapshotSequence(format!(
                "{} series timestamps not strictly increasing at index {}",
                name,
                i + 1
            )));
        }
    }

    for (i, snapshot) in series.iter().enumerate() {
        snapshot.validate().map_err(|e| {
            SimulationError::MalformedSnapshotSequence(format!("{}[{}]: {}", name, i, e))
        })?;
    }

    Ok(())
}

/// Trim the destination series so it starts no earlier than the origin series
pub fn align_series<'a>(
    origin: &[OrderBookSnapshot],
    destination: &'a [OrderBookSnapshot],
) -> SimulationResult<&'a [OrderBookSnapshot]> {
    let start = origin
        .first()
        .map(|s| s.timestamp)
        .ok_or_else(|| {
            SimulationError::MalformedSnapshotSequence("origin series is empty".to_string())
        })?;

    let idx = destination
        .iter()
        .position(|s| s.timestamp >= start)
        .ok_or(SimulationError::NoOverlap)?;

    Ok(&destination[idx..])
}

pub struct SimulationEngine {
    config: SimulationConfig,
    replicator: LevelReplicator,
    matching: MatchingEngine,
    reconciler: Reconciler,
}

impl SimulationEngine {
    pub fn new(config: SimulationConfig) -> Self {
        let replicator = LevelReplicator::new(config.replication.clone());
        Self {
            config,
            replicator,
            matching: MatchingEngine::new(),
            reconciler: Reconciler::new(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the simulation over the two snapshot series.
    ///
    /// Steps execute sequentially: each consumes origin/destination snapshots
    /// `i` and `i+1` and leaves the mutated books and ledgers as input for
    /// step `i+1`. If the series run out before `max_steps`, the run stops
    /// early and the report is flagged truncated.
    pub fn run(
        &self,
        origin: &[OrderBookSnapshot],
        destination: &[OrderBookSnapshot],
    ) -> SimulationResult<SimulationReport> {
        self.config.validate().map_err(SimulationError::from)?;
        validate_series(origin, "origin")?;
        validate_series(destination, "destination")?;
        let destination = align_series(origin, destination)?;

        let mut origin_book = VenueBook::from_snapshot(&origin[0]);
        let mut dest_book = VenueBook::from_snapshot(&destination[0]);

        let mut origin_ledger = VenueLedger::new(
            self.config.balances.fiat_origin,
            self.config.balances.token_origin,
            FeeSchedule {
                maker: self.config.fees.maker_origin,
                taker: self.config.fees.taker_origin,
            },
        );
        let mut dest_ledger = VenueLedger::new(
            self.config.balances.fiat_destination,
            self.config.balances.token_destination,
            FeeSchedule {
                maker: self.config.fees.maker_destination,
                taker: self.config.fees.taker_destination,
            },
        );

        let available = origin.len().min(destination.len()).saturating_sub(1);
        let steps = available.min(self.config.max_steps);
        let truncated = available < self.config.max_steps;
        if truncated {
            warn!(
                requested = self.config.max_steps,
                available, "horizon truncated, returning partial results"
            );
        }

        info!(
            steps,
            origin_depth = ?origin_book.depth(),
            destination_depth = ?dest_book.depth(),
            "simulation initialized"
        );

        let mut fee_events: Vec<FeeEvent> = Vec::new();
        let mut reconciled_books = Vec::with_capacity(steps);

        for step in 0..steps {
            let queue = self.replicator.build_queue(&origin_book, step);
            debug!(step, queue_len = queue.len(), "replication queue built");

            self.matching.process_queue(
                &queue,
                &mut dest_book,
                &mut origin_book,
                &mut dest_ledger,
                &mut origin_ledger,
                &mut fee_events,
            )?;

            self.reconciler.reconcile(
                &mut dest_book,
                &mut origin_book,
                &destination[step + 1],
                &origin[step + 1],
                &mut dest_ledger,
                &mut origin_ledger,
                &mut fee_events,
            )?;

            reconciled_books.push(dest_book.to_snapshot(destination[step + 1].timestamp));
        }

        info!(
            steps_completed = steps,
            fee_events = fee_events.len(),
            origin_fiat = origin_ledger.fiat,
            destination_fiat = dest_ledger.fiat,
            "simulation finished"
        );

        Ok(SimulationReport {
            origin_ledger,
            destination_ledger: dest_ledger,
            reconciled_books,
            fee_events,
            steps_completed: steps,
            truncated,
        })
    }
}

/// Run independent configurations in parallel over the same input series.
///
/// Runs share nothing mutable: the series are read-only and every run builds
/// its own books and ledgers, so results are identical to running serially.
pub fn run_batch(
    configs: &[SimulationConfig],
    origin: &[OrderBookSnapshot],
    destination: &[OrderBookSnapshot],
) -> Vec<SimulationResult<SimulationReport>> {
    configs
        .par_iter()
        .map(|config| SimulationEngine::new(config.clone()).run(origin, destination))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::order_book::PriceLevel;
    use chrono::{Duration, TimeZone, Utc};

    fn snapshot(
        offset_secs: i64,
        bids: Vec<(f64, f64)>,
        asks: Vec<(f64, f64)>,
    ) -> OrderBookSnapshot {
        let base = Utc.with_ymd_and_hms(2021, 7, 5, 12, 0, 0).unwrap();
        OrderBookSnapshot {
            timestamp: base + Duration::seconds(offset_secs),
            bids: bids
                .into_iter()
                .map(|(price, size)| PriceLevel { price, size })
                .collect(),
            asks: asks
                .into_iter()
                .map(|(price, size)| PriceLevel { price, size })
                .collect(),
        }
    }

    fn simple_series(start: i64, count: usize) -> Vec<OrderBookSnapshot> {
        (0..count)
            .map(|i| {
                snapshot(
                    start + i as i64,
                    vec![(99.0, 5.0), (98.0, 5.0)],
                    vec![(101.0, 5.0), (102.0, 5.0)],
                )
            })
            .collect()
    }

    #[test]
    fn test_align_drops_early_destination_snapshots() {
        let origin = simple_series(10, 3);
        let destination = simple_series(8, 5);

        let aligned = align_series(&origin, &destination).unwrap();
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned[0].timestamp, origin[0].timestamp);
    }

    #[test]
    fn test_align_no_overlap() {
        let origin = simple_series(100, 3);
        let destination = simple_series(0, 3);

        let err = align_series(&origin, &destination).unwrap_err();
        assert!(matches!(err, SimulationError::NoOverlap));
    }

    #[test]
    fn test_series_validation_rejects_unordered_timestamps() {
        let mut series = simple_series(0, 3);
        series.swap(0, 2);

        let err = validate_series(&series, "origin").unwrap_err();
        assert!(matches!(
            err,
            SimulationError::MalformedSnapshotSequence(_)
        ));
    }

    #[test]
    fn test_series_validation_rejects_duplicate_timestamps() {
        let mut series = simple_series(0, 3);
        series[1].timestamp = series[0].timestamp;

        assert!(validate_series(&series, "destination").is_err());
    }

    #[test]
    fn test_run_truncates_on_short_series() {
        let mut config = SimulationConfig::default();
        config.max_steps = 10;

        let origin = simple_series(0, 4);
        let destination = simple_series(0, 4);

        let report = SimulationEngine::new(config)
            .run(&origin, &destination)
            .unwrap();
        assert!(report.truncated);
        assert_eq!(report.steps_completed, 3);
        assert_eq!(report.reconciled_books.len(), 3);
    }

    #[test]
    fn test_run_exact_horizon_not_truncated() {
        let mut config = SimulationConfig::default();
        config.max_steps = 3;

        let origin = simple_series(0, 4);
        let destination = simple_series(0, 4);

        let report = SimulationEngine::new(config)
            .run(&origin, &destination)
            .unwrap();
        assert!(!report.truncated);
        assert_eq!(report.steps_completed, 3);
    }

    #[test]
    fn test_batch_matches_serial_runs() {
        let mut fast = SimulationConfig::default();
        fast.max_steps = 2;
        let mut wide = fast.clone();
        wide.replication.band_bp = 500;

        let origin = simple_series(0, 4);
        let destination = simple_series(0, 4);

        let batch = run_batch(&[fast.clone(), wide.clone()], &origin, &destination);
        assert_eq!(batch.len(), 2);

        let serial = SimulationEngine::new(fast).run(&origin, &destination).unwrap();
        let parallel = batch[0].as_ref().unwrap();
        assert_eq!(
            serial.destination_ledger.fiat,
            parallel.destination_ledger.fiat
        );
        assert_eq!(serial.fee_events.len(), parallel.fee_events.len());
    }
}
