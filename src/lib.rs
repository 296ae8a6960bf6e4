// XEMM simulator library
//
// Replicates price levels from an origin venue's order book onto a
// destination venue, simulates fills of the synthetic levels as real
// snapshots evolve, and tracks balances and fees on both venues.

pub mod config;
pub mod error;
pub mod simulation;

// Re-export configuration
pub use config::{
    BalanceConfig, ConfigError, FeeConfig, ReplicationConfig, SimulationConfig,
};

// Re-export error types
pub use error::{SimulationError, SimulationResult};

// Re-export simulation components
pub use simulation::{
    align_series, run_batch, FeeEvent, FeeSchedule, FillKind, LevelReplicator, MatchingEngine,
    OrderBookSnapshot, PriceLevel, Reconciler, Side, SimulationEngine, SimulationReport,
    SyntheticOrder, Venue, VenueBook, VenueLedger,
};
