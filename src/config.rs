// Configuration management for the XEMM simulator

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Level replication parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Half-width of the selection band around the origin mid price, in basis points
    pub band_bp: u32,
    /// Fraction of each selected origin level that is mirrored, in (0, 1]
    pub replication_fraction: f64,
    /// Upper bound of the uniform arrival-latency draw, in milliseconds
    pub latency_window: f64,
    /// Cumulative latency after which a replicated order never arrives
    pub latency_budget: f64,
    /// Seed for the per-step arrival-offset stream
    pub random_seed: u64,
}

/// Maker/taker fee rates per venue, as fractions of notional
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub maker_origin: f64,
    pub taker_origin: f64,
    pub maker_destination: f64,
    pub taker_destination: f64,
}

/// Starting balances per venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub fiat_origin: f64,
    pub token_origin: f64,
    pub fiat_destination: f64,
    pub token_destination: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub replication: ReplicationConfig,
    pub fees: FeeConfig,
    pub balances: BalanceConfig,
    /// Maximum number of simulation steps to run
    pub max_steps: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            replication: ReplicationConfig {
                band_bp: 10,
                replication_fraction: 0.1,
                latency_window: 1250.0,
                latency_budget: 1000.0,
                random_seed: 42,
            },
            fees: FeeConfig {
                maker_origin: 0.0016, // Kraken Pro maker fee
                taker_origin: 0.0026, // Kraken Pro taker fee
                maker_destination: 0.0010,
                taker_destination: 0.0020,
            },
            balances: BalanceConfig {
                fiat_origin: 1_000_000.0,
                token_origin: 100.0,
                fiat_destination: 1_000_000.0,
                token_destination: 100.0,
            },
            max_steps: 100,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: SimulationConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replication.band_bp == 0 {
            return Err(ConfigError::Validation(
                "band_bp must be greater than 0".to_string(),
            ));
        }

        let p = self.replication.replication_fraction;
        if !(p > 0.0 && p <= 1.0) {
            return Err(ConfigError::Validation(
                "replication_fraction must be in (0, 1]".to_string(),
            ));
        }

        if self.replication.latency_window <= 0.0 {
            return Err(ConfigError::Validation(
                "latency_window must be positive".to_string(),
            ));
        }

        if self.replication.latency_budget <= 0.0 {
            return Err(ConfigError::Validation(
                "latency_budget must be positive".to_string(),
            ));
        }

        for (name, rate) in [
            ("maker_origin", self.fees.maker_origin),
            ("taker_origin", self.fees.taker_origin),
            ("maker_destination", self.fees.maker_destination),
            ("taker_destination", self.fees.taker_destination),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(ConfigError::Validation(format!(
                    "fee rate {} must be in [0, 1)",
                    name
                )));
            }
        }

        for (name, balance) in [
            ("fiat_origin", self.balances.fiat_origin),
            ("token_origin", self.balances.token_origin),
            ("fiat_destination", self.balances.fiat_destination),
            ("token_destination", self.balances.token_destination),
        ] {
            if balance < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "initial balance {} must be non-negative",
                    name
                )));
            }
        }

        if self.max_steps == 0 {
            return Err(ConfigError::Validation(
                "max_steps must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
