//! Ledger store abstraction.
//!
//! Every balance-affecting operation runs inside a unit of work obtained from
//! [`LedgerStore::begin`]. Writes staged on a [`LedgerTx`] become visible all
//! at once on [`LedgerTx::commit`]; a unit that is dropped without committing
//! leaves no trace. Per-user serialization happens on the wallet record:
//! `lock_wallet` and `lock_or_create_wallet` mark it as read, and a competing
//! writer either blocks (PostgreSQL row lock) or makes the commit fail with
//! [`StoreError::Conflict`] (in-memory compare-and-swap).

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::game::{
    Game, GameFilter, GameSettings, GameType, GameTypeStats, StatsDelta, UserStats,
};
use crate::payments::{PaymentDetails, PaymentRequest, PaymentRequestFilter};
use crate::wallet::{Transaction, Wallet};

pub mod executor;
pub mod memory;
pub mod postgres;

pub use executor::{UnitPolicy, run_unit};
pub use memory::{MemoryStore, MemoryTx};
pub use postgres::{PgStore, PgTx};

/// Storage-level failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another unit committed a conflicting write first
    #[error("concurrent modification")]
    Conflict,

    /// A running total would leave the decimal range; nothing was applied
    #[error("aggregate overflow adding {0}")]
    Overflow(Decimal),

    /// Stored data could not be decoded into a model
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Backend failure (connection, pool, driver)
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            // serialization_failure, deadlock_detected, unique_violation
            if matches!(db.code().as_deref(), Some("40001" | "40P01" | "23505")) {
                return StoreError::Conflict;
            }
        }
        StoreError::Backend(err.to_string())
    }
}

/// `numeric_value_out_of_range`, raised when a NUMERIC column would overflow
pub(crate) fn is_numeric_overflow(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("22003"))
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One atomic unit of work.
#[async_trait]
pub trait LedgerTx: Send {
    /// Read a wallet and serialize against other writers of it
    async fn lock_wallet(&mut self, user_id: &str) -> StoreResult<Option<Wallet>>;

    /// Like `lock_wallet`, creating an empty wallet when none exists
    async fn lock_or_create_wallet(&mut self, user_id: &str, currency: &str)
    -> StoreResult<Wallet>;

    /// Write back a wallet previously obtained from this unit
    async fn put_wallet(&mut self, wallet: &Wallet) -> StoreResult<()>;

    /// Append a ledger entry
    async fn append_transaction(&mut self, transaction: &Transaction) -> StoreResult<()>;

    /// Persist a settled game
    async fn insert_game(&mut self, game: &Game) -> StoreResult<()>;

    /// Increment a user's aggregate counters, creating them if absent
    async fn bump_user_stats(&mut self, user_id: &str, delta: &StatsDelta) -> StoreResult<()>;

    /// Read a payment request and serialize against other writers of it
    async fn lock_payment_request(&mut self, id: &str) -> StoreResult<Option<PaymentRequest>>;

    /// Persist a new payment request
    async fn insert_payment_request(&mut self, request: &PaymentRequest) -> StoreResult<()>;

    /// Write back a payment request previously locked by this unit
    async fn update_payment_request(&mut self, request: &PaymentRequest) -> StoreResult<()>;

    /// Make every staged write visible atomically
    async fn commit(self) -> StoreResult<()>;
}

/// Transactional document store backing the ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync + 'static {
    type Tx: LedgerTx;

    /// Start a unit of work
    async fn begin(&self) -> StoreResult<Self::Tx>;

    /// Get a wallet by user id
    async fn wallet(&self, user_id: &str) -> StoreResult<Option<Wallet>>;

    /// Get a wallet, creating it when absent; losing a creation race is benign
    async fn ensure_wallet(&self, user_id: &str, currency: &str) -> StoreResult<Wallet>;

    /// Ledger entries for a user, newest first
    async fn transactions(&self, user_id: &str, limit: Option<i64>)
    -> StoreResult<Vec<Transaction>>;

    /// Games matching a filter, newest first
    async fn games(&self, filter: &GameFilter) -> StoreResult<Vec<Game>>;

    /// Per-game-type aggregates over games matching a filter (limit ignored)
    async fn game_stats(&self, filter: &GameFilter) -> StoreResult<Vec<GameTypeStats>>;

    /// Get a payment request by id
    async fn payment_request(&self, id: &str) -> StoreResult<Option<PaymentRequest>>;

    /// Payment requests matching a filter, newest first
    async fn payment_requests(
        &self,
        filter: &PaymentRequestFilter,
    ) -> StoreResult<Vec<PaymentRequest>>;

    /// Aggregate counters for a user, if any game was settled
    async fn user_stats(&self, user_id: &str) -> StoreResult<Option<UserStats>>;

    /// Settings for one game
    async fn game_settings(&self, game_type: GameType) -> StoreResult<Option<GameSettings>>;

    /// Settings for every configured game
    async fn all_game_settings(&self) -> StoreResult<Vec<GameSettings>>;

    /// Insert or replace settings for a game
    async fn put_game_settings(&self, settings: &GameSettings) -> StoreResult<()>;

    /// Insert settings only if the game has none yet; returns whether inserted
    async fn insert_game_settings_if_absent(&self, settings: &GameSettings)
    -> StoreResult<bool>;

    /// Stored deposit account details
    async fn payment_details(&self) -> StoreResult<Option<PaymentDetails>>;

    /// Insert or replace deposit account details
    async fn put_payment_details(&self, details: &PaymentDetails) -> StoreResult<()>;

    /// Check that the backend answers
    async fn health_check(&self) -> StoreResult<()>;
}
