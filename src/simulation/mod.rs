// Simulation module
// Replication, matching, and reconciliation of a cross-exchange strategy

pub mod engine;
pub mod ledger;
pub mod matching_engine;
pub mod order_book;
pub mod reconciler;
pub mod replicator;

pub use engine::{align_series, run_batch, validate_series, SimulationEngine, SimulationReport};
pub use ledger::{FeeEvent, FeeSchedule, FillKind, Venue, VenueLedger};
pub use matching_engine::{MatchStats, MatchingEngine};
pub use order_book::{consume, LevelWalk, OrderBookSnapshot, PriceLevel, Side, VenueBook};
pub use reconciler::{merged_size, Reconciler};
pub use replicator::{LevelReplicator, SyntheticOrder};
