//! Configuration management
//!
//! Process-wide tariff rates, loaded from the environment the same way a
//! worker binary would load them. Producers contribute only coefficients;
//! the base prices here turn them into amounts.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default base price charged once per run.
pub const DEFAULT_BASE_RUN_TARIFF: &str = "10";

/// Default base price charged per persisted item.
pub const DEFAULT_BASE_ITEM_TARIFF: &str = "0.05";

/// Process-wide base tariff prices
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TariffRates {
    pub base_run_price: Decimal,
    pub base_item_price: Decimal,
}

impl Default for TariffRates {
    fn default() -> Self {
        Self {
            // The defaults are valid decimal literals; parsing cannot fail.
            base_run_price: Decimal::from_str(DEFAULT_BASE_RUN_TARIFF).unwrap_or_default(),
            base_item_price: Decimal::from_str(DEFAULT_BASE_ITEM_TARIFF).unwrap_or_default(),
        }
    }
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    pub tariffs: TariffRates,
}

impl CoreConfig {
    /// Load configuration from environment and defaults
    ///
    /// - `CIP_BASE_RUN_TARIFF`: base run price (decimal)
    /// - `CIP_BASE_ITEM_TARIFF`: base per-item price (decimal)
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = CoreConfig {
            tariffs: TariffRates {
                base_run_price: parse_decimal_env("CIP_BASE_RUN_TARIFF", DEFAULT_BASE_RUN_TARIFF)?,
                base_item_price: parse_decimal_env(
                    "CIP_BASE_ITEM_TARIFF",
                    DEFAULT_BASE_ITEM_TARIFF,
                )?,
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tariffs.base_run_price < Decimal::ZERO {
            anyhow::bail!("Base run tariff must not be negative");
        }

        if self.tariffs.base_item_price < Decimal::ZERO {
            anyhow::bail!("Base item tariff must not be negative");
        }

        Ok(())
    }
}

fn parse_decimal_env(key: &str, default: &str) -> anyhow::Result<Decimal> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    Decimal::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("Invalid decimal in {}: {} ({})", key, raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tariffs.base_run_price, Decimal::from(10));
    }

    #[test]
    fn negative_rates_are_rejected() {
        let config = CoreConfig {
            tariffs: TariffRates {
                base_run_price: Decimal::from(-1),
                base_item_price: Decimal::ZERO,
            },
        };
        assert!(config.validate().is_err());
    }
}
