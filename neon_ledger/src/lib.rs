//! # NeonPlay Ledger
//!
//! Transactional ledger core for a real-money betting platform.
//!
//! Every user has a wallet whose balance always equals the signed sum of its
//! append-only transaction log. Game outcomes and accepted deposit requests
//! are applied to that balance as atomic units: either every record the
//! operation touches is written, or none is.
//!
//! ## Core Modules
//!
//! - [`wallet`]: balances, the transaction log, debit/credit
//! - [`game`]: outcome validation, settlement, history, stats, settings catalog
//! - [`payments`]: deposit request workflow and deposit account details
//! - [`store`]: storage abstraction, in-memory and PostgreSQL backends, unit executor
//! - [`auth`]: the caller principal threaded through role-dependent operations
//!
//! ## Example
//!
//! ```
//! use neon_ledger::{Ledger, LedgerConfig, MemoryStore};
//! use neon_ledger::game::GameOutcome;
//! use neon_ledger::wallet::EntryCategory;
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = Ledger::new(MemoryStore::new(), LedgerConfig::default());
//!
//!     ledger
//!         .wallets
//!         .credit("alice", Decimal::from(100), "Deposit", EntryCategory::Deposit)
//!         .await?;
//!
//!     let outcome = GameOutcome {
//!         game_type: "dice".to_string(),
//!         bet_amount: Decimal::from(20),
//!         win_amount: Decimal::from(40),
//!         multiplier: Some(Decimal::from(2)),
//!         result_data: None,
//!     };
//!     ledger.games.settle("alice", outcome).await?;
//!
//!     let wallet = ledger.wallets.get_wallet("alice").await?;
//!     assert_eq!(wallet.balance, Decimal::from(120));
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod game;
pub mod ledger;
pub mod payments;
pub mod store;
pub mod wallet;

pub use auth::{Principal, Role};
pub use config::{ConfigError, LedgerConfig};
pub use errors::{LedgerError, LedgerResult};
pub use ledger::Ledger;
pub use store::{LedgerStore, LedgerTx, MemoryStore, PgStore, StoreError};
