//! Ledger configuration.
//!
//! Consolidates the environment variables read by the library and validates
//! them once at startup.

use crate::store::executor::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_BACKOFF,
};
use crate::wallet::DEFAULT_CURRENCY;

/// Ledger behaviour knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Currency assigned to newly created wallets
    pub currency: String,
    /// Attempts per atomic unit, first try included
    pub max_attempts: u32,
    /// Deadline for one attempt in milliseconds
    pub unit_timeout_ms: u64,
    /// Base backoff between conflicting attempts in milliseconds
    pub retry_backoff_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            unit_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF.as_millis() as u64,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables
    ///
    /// Recognised variables:
    /// - `LEDGER_CURRENCY`: wallet currency (default: INR)
    /// - `LEDGER_MAX_ATTEMPTS`: attempts per unit (default: 5)
    /// - `LEDGER_UNIT_TIMEOUT_MS`: per-attempt deadline (default: 5000)
    /// - `LEDGER_RETRY_BACKOFF_MS`: base retry backoff (default: 10)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but unparseable, or
    /// if the resulting configuration fails [`LedgerConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            currency: std::env::var("LEDGER_CURRENCY").unwrap_or(defaults.currency),
            max_attempts: parse_env("LEDGER_MAX_ATTEMPTS", defaults.max_attempts)?,
            unit_timeout_ms: parse_env("LEDGER_UNIT_TIMEOUT_MS", defaults.unit_timeout_ms)?,
            retry_backoff_ms: parse_env("LEDGER_RETRY_BACKOFF_MS", defaults.retry_backoff_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        let currency_ok = self.currency.len() == 3
            && self.currency.chars().all(|c| c.is_ascii_uppercase());
        if !currency_ok {
            return Err(ConfigError::Invalid {
                var: "LEDGER_CURRENCY".to_string(),
                reason: format!("Must be a 3-letter ISO code, got {:?}", self.currency),
            });
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "LEDGER_MAX_ATTEMPTS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.unit_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "LEDGER_UNIT_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse an environment variable, falling back to `default` when unset
///
/// A value that is present but malformed is an error.
pub fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert_eq!(config.currency, "INR");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.unit_timeout_ms, 5000);
        assert_eq!(config.retry_backoff_ms, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = LedgerConfig {
            max_attempts: 0,
            ..LedgerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("LEDGER_MAX_ATTEMPTS"));
    }

    #[test]
    fn test_bad_currency_rejected() {
        let config = LedgerConfig {
            currency: "rupees".to_string(),
            ..LedgerConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }
}
