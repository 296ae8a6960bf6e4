// Unified error handling for the XEMM simulator

use crate::config::ConfigError;

/// Main error type for the simulator
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("no overlap: destination series has no snapshot at or after the origin start")]
    NoOverlap,

    #[error("malformed snapshot sequence: {0}")]
    MalformedSnapshotSequence(String),

    #[error("insufficient liquidity: requested {requested:.8}, available {available:.8}")]
    InsufficientLiquidity { requested: f64, available: f64 },

    #[error("insufficient {asset} balance: required {required:.8}, available {available:.8}")]
    InsufficientBalance {
        asset: &'static str,
        required: f64,
        available: f64,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias using SimulationError
pub type SimulationResult<T> = Result<T, SimulationError>;
