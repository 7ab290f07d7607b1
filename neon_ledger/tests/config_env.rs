//! Environment-driven configuration tests.
//!
//! These mutate process environment variables, so they run serially.

use neon_ledger::db::DatabaseConfig;
use neon_ledger::store::UnitPolicy;
use neon_ledger::{ConfigError, LedgerConfig};
use serial_test::serial;
use std::time::Duration;

const LEDGER_VARS: [&str; 4] = [
    "LEDGER_CURRENCY",
    "LEDGER_MAX_ATTEMPTS",
    "LEDGER_UNIT_TIMEOUT_MS",
    "LEDGER_RETRY_BACKOFF_MS",
];

fn set(key: &str, value: &str) {
    // SAFETY: tests touching the environment are serialized with #[serial]
    unsafe { std::env::set_var(key, value) };
}

fn clear(keys: &[&str]) {
    for key in keys {
        // SAFETY: see `set`
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
#[serial]
fn test_defaults_when_unset() {
    clear(&LEDGER_VARS);
    let config = LedgerConfig::from_env().unwrap();
    assert_eq!(config, LedgerConfig::default());
}

#[test]
#[serial]
fn test_overrides_flow_into_unit_policy() {
    clear(&LEDGER_VARS);
    set("LEDGER_CURRENCY", "USD");
    set("LEDGER_MAX_ATTEMPTS", "3");
    set("LEDGER_UNIT_TIMEOUT_MS", "750");
    set("LEDGER_RETRY_BACKOFF_MS", "25");

    let config = LedgerConfig::from_env().unwrap();
    assert_eq!(config.currency, "USD");

    let policy = UnitPolicy::from(&config);
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.attempt_timeout, Duration::from_millis(750));
    assert_eq!(policy.backoff, Duration::from_millis(25));

    clear(&LEDGER_VARS);
}

#[test]
#[serial]
fn test_malformed_value_is_an_error() {
    clear(&LEDGER_VARS);
    set("LEDGER_MAX_ATTEMPTS", "lots");

    let err = LedgerConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "LEDGER_MAX_ATTEMPTS"));

    clear(&LEDGER_VARS);
}

#[test]
#[serial]
fn test_database_url_is_required() {
    clear(&["DATABASE_URL"]);
    let err = DatabaseConfig::from_env().unwrap_err();
    assert!(matches!(err, ConfigError::MissingRequired { .. }));

    set("DATABASE_URL", "postgres://neon@localhost/neon_ledger");
    set("DB_MAX_CONNECTIONS", "7");
    let config = DatabaseConfig::from_env().unwrap();
    assert_eq!(config.max_connections, 7);
    assert!(config.validate().is_ok());

    clear(&["DATABASE_URL", "DB_MAX_CONNECTIONS"]);
}
