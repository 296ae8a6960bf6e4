// End-to-end simulation tests: golden balances, determinism, invariants

mod common;

use common::{constant_series, snapshot_at, test_config};
use xemm_sim::{FillKind, SimulationEngine, Venue};

const TOL: f64 = 1e-9;

/// Three steps over constant books. Each step mirrors one bid (99.5) and one
/// ask (101.5) as makers; both are crossed by the next observed top of book
/// (99.0 / 102.0) and fill with maker fees, hedged fee-free on origin.
///
/// Per step, hand-computed:
///   destination: -99.5 - 0.0995 + 101.5 - 0.1015 = +1.799 fiat, token flat
///   origin:      +99.5 - 101.5 = -2.0 fiat, token flat
///   fees:        0.0995 + 0.1015 = 0.201 on destination, none on origin
#[test]
fn test_golden_three_step_run() {
    common::init_logging();

    let origin = constant_series(4, &[(99.5, 2.0), (98.0, 5.0)], &[(101.5, 2.0), (103.0, 5.0)]);
    let destination = constant_series(4, &[(99.0, 3.0)], &[(102.0, 3.0)]);

    let report = SimulationEngine::new(test_config())
        .run(&origin, &destination)
        .unwrap();

    assert!(!report.truncated);
    assert_eq!(report.steps_completed, 3);

    assert!((report.destination_ledger.fiat - 10_005.397).abs() < TOL);
    assert!((report.destination_ledger.token - 10.0).abs() < TOL);
    assert!((report.origin_ledger.fiat - 9_994.0).abs() < TOL);
    assert!((report.origin_ledger.token - 10.0).abs() < TOL);

    assert!((report.total_fees(Venue::Destination) - 0.603).abs() < TOL);
    assert!(report.total_fees(Venue::Origin).abs() < TOL);
    assert_eq!(report.fee_events.len(), 12);

    // every step ends back at the organic destination book
    assert_eq!(report.reconciled_books.len(), 3);
    for book in &report.reconciled_books {
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.asks.len(), 1);
        assert!((book.bids[0].price - 99.0).abs() < TOL);
        assert!((book.bids[0].size - 3.0).abs() < TOL);
        assert!((book.asks[0].price - 102.0).abs() < TOL);
        assert!((book.asks[0].size - 3.0).abs() < TOL);
    }
}

/// One step where the mirrored origin bid at 100.4 crosses the destination
/// best ask at 100.3 and fills as taker, hedged at taker fee on origin.
#[test]
fn test_taker_fill_and_hedge_balances() {
    let origin = constant_series(
        2,
        &[(100.4, 1.0), (100.0, 2.0)],
        &[(100.6, 1.0), (101.0, 2.0)],
    );
    let destination = constant_series(2, &[(100.1, 2.0)], &[(100.3, 2.0)]);

    let mut config = test_config();
    config.max_steps = 1;

    let report = SimulationEngine::new(config).run(&origin, &destination).unwrap();

    // taker buy of 0.5 at 100.3: notional 50.15, fee 0.1003
    assert!((report.destination_ledger.fiat - (10_000.0 - 50.15 - 0.1003)).abs() < TOL);
    assert!((report.destination_ledger.token - 10.5).abs() < TOL);

    // hedge sell of 0.5 into origin bids at 100.4: notional 50.2, fee 0.1004
    assert!((report.origin_ledger.fiat - (10_000.0 + 50.2 - 0.1004)).abs() < TOL);
    assert!((report.origin_ledger.token - 9.5).abs() < TOL);

    let takers: Vec<_> = report
        .fee_events
        .iter()
        .filter(|e| e.kind == FillKind::Taker)
        .collect();
    assert_eq!(takers.len(), 2);
}

/// Every destination fill is mirrored by an origin hedge of equal volume
#[test]
fn test_hedge_volume_equals_fill_volume() {
    let origin = constant_series(
        4,
        &[(100.4, 1.0), (100.0, 2.0)],
        &[(100.6, 1.0), (101.0, 2.0)],
    );
    let destination = constant_series(4, &[(100.1, 2.0)], &[(100.3, 2.0)]);

    let report = SimulationEngine::new(test_config())
        .run(&origin, &destination)
        .unwrap();

    let dest: Vec<_> = report.fees_for(Venue::Destination).collect();
    let orig: Vec<_> = report.fees_for(Venue::Origin).collect();
    assert_eq!(dest.len(), orig.len());
    for (fill, hedge) in dest.iter().zip(orig.iter()) {
        assert!((fill.volume - hedge.volume).abs() < TOL);
    }
}

/// Same fixture, same seed: the full serialized report is bit-identical
#[test]
fn test_rerun_is_bit_identical() {
    let origin = constant_series(
        4,
        &[(100.4, 1.0), (100.0, 2.0)],
        &[(100.6, 1.0), (101.0, 2.0)],
    );
    let destination = constant_series(4, &[(100.1, 2.0)], &[(100.3, 2.0)]);

    let config = test_config();
    let first = SimulationEngine::new(config.clone())
        .run(&origin, &destination)
        .unwrap();
    let second = SimulationEngine::new(config)
        .run(&origin, &destination)
        .unwrap();

    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    assert_eq!(a, b);
}

/// A different seed may reorder arrivals but never breaks determinism
#[test]
fn test_seed_changes_are_self_consistent() {
    let origin = constant_series(
        4,
        &[(100.4, 1.0), (100.0, 2.0)],
        &[(100.6, 1.0), (101.0, 2.0)],
    );
    let destination = constant_series(4, &[(100.1, 2.0)], &[(100.3, 2.0)]);

    let mut config = test_config();
    config.replication.random_seed = 12345;

    let first = SimulationEngine::new(config.clone())
        .run(&origin, &destination)
        .unwrap();
    let second = SimulationEngine::new(config)
        .run(&origin, &destination)
        .unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

/// Destination snapshots older than the origin start are ignored entirely
#[test]
fn test_alignment_skips_stale_destination_history() {
    let origin: Vec<_> = (0..4)
        .map(|i| snapshot_at(10 + i, &[(99.0, 3.0)], &[(102.0, 3.0)]))
        .collect();
    // three stale snapshots, then the overlapping window
    let destination: Vec<_> = (0..7)
        .map(|i| snapshot_at(7 + i, &[(99.0, 3.0)], &[(102.0, 3.0)]))
        .collect();

    let mut config = test_config();
    config.max_steps = 10;

    let report = SimulationEngine::new(config)
        .run(&origin, &destination)
        .unwrap();

    // four aligned snapshots on each side: three steps, then truncation
    assert_eq!(report.steps_completed, 3);
    assert!(report.truncated);
}

/// A band too narrow to select any origin level yields an idle but valid run
#[test]
fn test_no_in_band_levels_is_not_an_error() {
    let origin = constant_series(4, &[(99.0, 2.0)], &[(101.0, 2.0)]);
    let destination = constant_series(4, &[(99.0, 3.0)], &[(102.0, 3.0)]);

    let mut config = test_config();
    config.replication.band_bp = 50; // (99.5, 100.5) contains no level

    let report = SimulationEngine::new(config)
        .run(&origin, &destination)
        .unwrap();

    assert_eq!(report.steps_completed, 3);
    assert!(report.fee_events.is_empty());
    assert!((report.destination_ledger.fiat - 10_000.0).abs() < TOL);
    assert!((report.origin_ledger.fiat - 10_000.0).abs() < TOL);
}
