//! Prometheus metrics for monitoring ledger health and throughput.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener
//! (`METRICS_BIND`). Without an installed exporter every recorder call is a
//! no-op, so handlers record unconditionally.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts by status, duration
//! - **Settlement Metrics**: Settled games by type and outcome, duration
//! - **Ledger Metrics**: Wallet mutations by direction and category
//! - **Payment Metrics**: Admin decisions on deposit requests
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use nl_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", 200);
//! metrics::games_settled_total("dice", true);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use neon_ledger::wallet::{EntryCategory, EntryDirection};
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request by method and status code.
pub fn http_requests_total(method: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string()
    )
    .record(duration_ms);
}

/// Count an error response by ledger error kind.
pub fn api_errors_total(kind: &'static str) {
    metrics::counter!("api_errors_total", "kind" => kind).increment(1);
}

// ============================================================================
// Settlement Metrics
// ============================================================================

/// Count a settled game.
pub fn games_settled_total(game_type: &str, won: bool) {
    metrics::counter!("games_settled_total",
        "game_type" => game_type.to_string(),
        "outcome" => if won { "win" } else { "loss" }
    )
    .increment(1);
}

/// Record settlement duration in milliseconds.
pub fn settlement_duration_ms(duration_ms: f64) {
    metrics::histogram!("settlement_duration_ms").record(duration_ms);
}

// ============================================================================
// Ledger Metrics
// ============================================================================

/// Count a committed wallet mutation.
pub fn ledger_mutations_total(direction: EntryDirection, category: EntryCategory) {
    metrics::counter!("ledger_mutations_total",
        "direction" => direction.to_string(),
        "category" => category.to_string()
    )
    .increment(1);
}

// ============================================================================
// Payment Metrics
// ============================================================================

/// Count an admin decision on a deposit request.
pub fn payment_decisions_total(status: &str) {
    metrics::counter!("payment_decisions_total",
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_exporter_is_noop() {
        http_requests_total("GET", 200);
        http_request_duration_ms("GET", 1.5);
        api_errors_total("not_found");
        games_settled_total("dice", true);
        settlement_duration_ms(3.0);
        ledger_mutations_total(EntryDirection::Debit, EntryCategory::GameLoss);
        payment_decisions_total("accepted");
    }
}
