//! Configuration management for the presale.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unparseable values fall back to the default; [`Config::validate`] catches
//! values that parse but make no sense.

use crate::aggregates::marketplace::MAX_FEE_PERCENT;
use crate::types::{EventTerms, Settings};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;

/// Invalid configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Purchase windows must have a length
    #[error("FAIRSALE_SLOT_DURATION_SECS must be greater than zero")]
    ZeroSlotDuration,

    /// Marketplace fee above 100%
    #[error("FAIRSALE_MARKETPLACE_FEE_PERCENT must be at most {max}, got {value}")]
    FeeOutOfRange {
        /// Configured value
        value: u8,
        /// Highest allowed value
        max: u8,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Length of each purchase window, in seconds
    pub slot_duration_secs: u64,
    /// Gap between consecutive windows, in seconds
    pub buffer_secs: u64,
    /// Loyalty points per ticket bought in the presale
    pub points_per_ticket: u64,
    /// Marketplace fee, in percent
    pub marketplace_fee_percent: u8,
    /// Per-buyer limit for events created by the demo
    pub default_max_purchase: u32,
    /// Resale cap for events created by the demo
    pub default_resale_cap_percent: u16,
    /// Where the Prometheus scrape endpoint lives; metrics are off when unset
    pub metrics_addr: Option<SocketAddr>,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        Self {
            slot_duration_secs: parse(&lookup, "FAIRSALE_SLOT_DURATION_SECS")
                .unwrap_or(defaults.slot_duration_secs),
            buffer_secs: parse(&lookup, "FAIRSALE_BUFFER_SECS").unwrap_or(defaults.buffer_secs),
            points_per_ticket: parse(&lookup, "FAIRSALE_POINTS_PER_TICKET")
                .unwrap_or(defaults.points_per_ticket),
            marketplace_fee_percent: parse(&lookup, "FAIRSALE_MARKETPLACE_FEE_PERCENT")
                .unwrap_or(defaults.marketplace_fee_percent),
            default_max_purchase: parse(&lookup, "FAIRSALE_DEFAULT_MAX_PURCHASE").unwrap_or(4),
            default_resale_cap_percent: parse(&lookup, "FAIRSALE_DEFAULT_RESALE_CAP_PERCENT")
                .unwrap_or(50),
            metrics_addr: parse(&lookup, "FAIRSALE_METRICS_ADDR"),
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "fairsale_ticketing=info".to_string()),
        }
    }

    /// Check values that parse but cannot be used
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroSlotDuration`] for a zero window length
    /// - [`ConfigError::FeeOutOfRange`] for a fee above 100%
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_duration_secs == 0 {
            return Err(ConfigError::ZeroSlotDuration);
        }
        if self.marketplace_fee_percent > MAX_FEE_PERCENT {
            return Err(ConfigError::FeeOutOfRange {
                value: self.marketplace_fee_percent,
                max: MAX_FEE_PERCENT,
            });
        }
        Ok(())
    }

    /// Initial settings for the store
    #[must_use]
    pub const fn settings(&self) -> Settings {
        Settings {
            slot_duration_secs: self.slot_duration_secs,
            buffer_secs: self.buffer_secs,
            points_per_ticket: self.points_per_ticket,
            marketplace_fee_percent: self.marketplace_fee_percent,
        }
    }

    /// Terms for a newly created event
    #[must_use]
    pub const fn default_terms(&self) -> EventTerms {
        EventTerms {
            max_purchase_per_buyer: self.default_max_purchase,
            resale_cap_percent: self.default_resale_cap_percent,
        }
    }
}

fn parse<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.settings(), Settings::default());
        assert_eq!(
            config.default_terms(),
            EventTerms {
                max_purchase_per_buyer: 4,
                resale_cap_percent: 50,
            }
        );
        assert_eq!(config.metrics_addr, None);
        assert_eq!(config.log_level, "fairsale_ticketing=info");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_reads_overrides() {
        let config = config(&[
            ("FAIRSALE_SLOT_DURATION_SECS", "600"),
            ("FAIRSALE_BUFFER_SECS", " 60 "),
            ("FAIRSALE_MARKETPLACE_FEE_PERCENT", "5"),
            ("FAIRSALE_DEFAULT_RESALE_CAP_PERCENT", "150"),
            ("FAIRSALE_METRICS_ADDR", "127.0.0.1:9000"),
        ]);
        assert_eq!(config.slot_duration_secs, 600);
        assert_eq!(config.buffer_secs, 60);
        assert_eq!(config.settings().marketplace_fee_percent, 5);
        assert_eq!(config.default_resale_cap_percent, 150);
        assert_eq!(config.metrics_addr, "127.0.0.1:9000".parse().ok());
    }

    #[test]
    fn test_unparseable_value_uses_default() {
        let config = config(&[
            ("FAIRSALE_POINTS_PER_TICKET", "lots"),
            ("FAIRSALE_MARKETPLACE_FEE_PERCENT", "300"),
        ]);
        assert_eq!(config.points_per_ticket, 1);
        assert_eq!(config.marketplace_fee_percent, 0);
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        assert_eq!(
            config(&[("FAIRSALE_SLOT_DURATION_SECS", "0")]).validate(),
            Err(ConfigError::ZeroSlotDuration)
        );
        assert_eq!(
            config(&[("FAIRSALE_MARKETPLACE_FEE_PERCENT", "101")]).validate(),
            Err(ConfigError::FeeOutOfRange { value: 101, max: 100 })
        );
    }
}
