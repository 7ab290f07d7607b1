//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use neon_ledger::LedgerConfig;
use neon_ledger::db::DatabaseConfig;
use std::net::SocketAddr;
use std::str::FromStr;

/// Default bind address when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:6969";

/// Minimum JWT secret length in bytes
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Which ledger store the server runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Backend::Postgres),
            "memory" | "mem" => Ok(Backend::Memory),
            other => Err(ConfigError::Invalid {
                var: "LEDGER_BACKEND".to_string(),
                reason: format!("unknown backend '{other}', expected postgres or memory"),
            }),
        }
    }
}

/// Command-line overrides, applied on top of the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub backend: Option<Backend>,
    pub database_url: Option<String>,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Store backend
    pub backend: Backend,
    /// Database configuration, present only for the postgres backend
    pub database: Option<DatabaseConfig>,
    /// Secret for verifying HS256 access tokens
    pub jwt_secret: String,
    /// Prometheus exporter address; metrics are not exported when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Ledger core settings
    pub ledger: LedgerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_addr("SERVER_BIND")?.unwrap_or(default_bind()),
        };

        let backend = match overrides.backend {
            Some(backend) => backend,
            None => match std::env::var("LEDGER_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => Backend::Postgres,
            },
        };

        let database = match backend {
            Backend::Memory => None,
            Backend::Postgres => Some(match overrides.database_url {
                Some(url) => DatabaseConfig::with_url(url)?,
                None => DatabaseConfig::from_env()?,
            }),
        };

        // Security configuration (REQUIRED)
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let config = ServerConfig {
            bind,
            backend,
            database,
            jwt_secret,
            metrics_bind: parse_addr("METRICS_BIND")?,
            ledger: LedgerConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!("Must be at least {MIN_JWT_SECRET_LEN} characters"),
            });
        }

        if let Some(database) = &self.database {
            database.validate()?;
        }

        self.ledger.validate()?;
        Ok(())
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6969))
}

fn parse_addr(key: &str) -> Result<Option<SocketAddr>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value.parse().map(Some).map_err(|_| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{value}' is not an IP:PORT address"),
        }),
        Err(_) => Ok(None),
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

impl From<neon_ledger::ConfigError> for ConfigError {
    fn from(err: neon_ledger::ConfigError) -> Self {
        match err {
            neon_ledger::ConfigError::MissingRequired { var, hint } => {
                ConfigError::MissingRequired { var, hint }
            }
            neon_ledger::ConfigError::Invalid { var, reason } => ConfigError::Invalid { var, reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> ServerConfig {
        ServerConfig {
            bind: DEFAULT_BIND.parse().unwrap(),
            backend: Backend::Memory,
            database: None,
            jwt_secret: secret.to_string(),
            metrics_bind: None,
            ledger: LedgerConfig::default(),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_short_jwt_secret_rejected() {
        let err = config("too-short").validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "JWT_SECRET"));
        assert!(config(&"a".repeat(32)).validate().is_ok());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("postgres".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!("Memory".parse::<Backend>().unwrap(), Backend::Memory);
        assert!("redis".parse::<Backend>().is_err());
    }

    #[test]
    fn test_default_bind_matches_constant() {
        assert_eq!(default_bind(), DEFAULT_BIND.parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_ledger_errors_convert() {
        let err: ConfigError = neon_ledger::ConfigError::Invalid {
            var: "LEDGER_CURRENCY".to_string(),
            reason: "bad".to_string(),
        }
        .into();
        assert!(err.to_string().contains("LEDGER_CURRENCY"));
    }
}
