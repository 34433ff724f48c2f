//! Configuration types for copy-ledger

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::settlement::{Amount, MAX_FEE_BPS};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Settlement-engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Fee on realized profit, in basis points
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u32,

    /// Minimum per-operation open amount
    #[serde(default = "default_min_open_amount")]
    pub min_open_amount: Amount,

    /// Maximum per-operation open amount
    #[serde(default = "default_max_open_amount")]
    pub max_open_amount: Amount,

    /// Minimum partial-sell unit
    #[serde(default = "default_min_sell_amount")]
    pub min_sell_amount: Amount,
}

fn default_fee_bps() -> u32 {
    100 // 1%
}
fn default_min_open_amount() -> Amount {
    1_000
}
fn default_max_open_amount() -> Amount {
    1_000_000_000_000_000_000
}
fn default_min_sell_amount() -> Amount {
    1_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_bps: default_fee_bps(),
            min_open_amount: default_min_open_amount(),
            max_open_amount: default_max_open_amount(),
            min_sell_amount: default_min_sell_amount(),
        }
    }
}

impl EngineConfig {
    /// Reject fee rates above the protocol maximum and inverted bounds
    pub fn validate(&self) -> Result<()> {
        if self.fee_bps > MAX_FEE_BPS {
            return Err(Error::FeeTooHigh(self.fee_bps));
        }
        if self.min_open_amount > self.max_open_amount {
            return Err(Error::AmountOutOfBounds {
                amount: self.min_open_amount,
                min: 0,
                max: self.max_open_amount,
            });
        }
        Ok(())
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.engine.validate()?;
        Ok(config)
    }
}
