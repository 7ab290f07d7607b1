//! HTTP API for the betting ledger.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework for HTTP
//! - **Tower**: Middleware for CORS, request ids, authentication
//! - **JWT**: Bearer tokens verified into a `Principal`
//!
//! Every handler is generic over the [`LedgerStore`] backing the ledger, so
//! the same router serves PostgreSQL in production and the in-memory store in
//! tests.
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                      - Health check (public)
//! GET  /api/v1/wallet/balance                       - Caller's wallet
//! GET  /api/v1/wallet/transactions?limit=           - Caller's ledger entries
//! POST /api/v1/wallet/payment-request               - Submit deposit request
//! GET  /api/v1/wallet/payment-requests?status=      - Caller's deposit requests
//! GET  /api/v1/wallet/payment-details               - Deposit account details
//! POST /api/v1/game/play                            - Settle a game outcome
//! GET  /api/v1/game/history?game_type=&limit=       - Caller's games
//! GET  /api/v1/game/stats?game_type=                - Caller's aggregates
//! GET  /api/v1/game/recent-bets?limit=              - Latest games (public)
//! GET  /api/v1/user/stats                           - Caller's counters
//! GET  /api/v1/game-settings                        - Settings catalog (public)
//! GET  /api/v1/game-settings/{game_type}            - One game's settings (public)
//! GET  /api/v1/admin/payment-requests?status=       - All deposit requests
//! POST /api/v1/admin/payment-request/{id}/{action}  - approve | decline
//! PUT  /api/v1/admin/payment-details                - Replace deposit details
//! PUT  /api/v1/admin/game-settings/{game_type}      - Replace game settings
//! GET  /api/v1/admin/reconcile/{user_id}            - Replay a user's ledger
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use nl_server::api::{AppState, create_router};
//! use neon_ledger::{Ledger, LedgerConfig, MemoryStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Ledger::new(MemoryStore::new(), LedgerConfig::default());
//! let state = AppState::new(ledger, "a-secret-of-at-least-32-characters!");
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod auth;
pub mod error;
pub mod game;
pub mod middleware;
pub mod request_id;
pub mod settings;
pub mod wallet;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use neon_ledger::{Ledger, LedgerStore};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use auth::TokenKeys;
pub use error::{ApiError, ApiResult};

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the ledger and keys are shared.
pub struct AppState<S: LedgerStore> {
    pub ledger: Ledger<S>,
    pub tokens: Arc<TokenKeys>,
}

impl<S: LedgerStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl<S: LedgerStore> AppState<S> {
    pub fn new(ledger: Ledger<S>, jwt_secret: &str) -> Self {
        Self {
            ledger,
            tokens: Arc::new(TokenKeys::new(jwt_secret)),
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router<S: LedgerStore>(state: AppState<S>) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check::<S>))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router<S: LedgerStore>(state: AppState<S>) -> Router<AppState<S>> {
    let public_routes = Router::new()
        .route("/game/recent-bets", get(game::recent_bets::<S>))
        .route("/game-settings", get(settings::list_settings::<S>))
        .route("/game-settings/{game_type}", get(settings::get_settings::<S>));

    let protected_routes = Router::new()
        .route("/wallet/balance", get(wallet::balance::<S>))
        .route("/wallet/transactions", get(wallet::transactions::<S>))
        .route(
            "/wallet/payment-request",
            post(wallet::submit_payment_request::<S>),
        )
        .route(
            "/wallet/payment-requests",
            get(wallet::payment_requests::<S>),
        )
        .route("/wallet/payment-details", get(wallet::payment_details::<S>))
        .route("/game/play", post(game::play::<S>))
        .route("/game/history", get(game::history::<S>))
        .route("/game/stats", get(game::stats::<S>))
        .route("/user/stats", get(game::user_stats::<S>))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware::<S>,
        ));

    // Guard runs after authentication has attached the principal
    let admin_routes = Router::new()
        .route(
            "/admin/payment-requests",
            get(admin::list_payment_requests::<S>),
        )
        .route(
            "/admin/payment-request/{id}/{action}",
            post(admin::process_payment_request::<S>),
        )
        .route(
            "/admin/payment-details",
            put(admin::update_payment_details::<S>),
        )
        .route(
            "/admin/game-settings/{game_type}",
            put(settings::update_settings::<S>),
        )
        .route("/admin/reconcile/{user_id}", get(admin::reconcile::<S>))
        .layer(axum::middleware::from_fn(middleware::require_admin))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware::<S>,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","store":true,"version":"1.0.0","timestamp":"..."}
/// ```
async fn health_check<S: LedgerStore>(State(state): State<AppState<S>>) -> impl IntoResponse {
    let store_healthy = match state.ledger.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "currency": state.ledger.config().currency,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
