//! Wallet module: balances and their append-only transaction log.
//!
//! Every balance change goes through [`WalletManager`] (or the composable
//! [`debit_in`]/[`credit_in`] inside a caller's unit) and is written together
//! with the transaction entry that explains it. For any user, replaying the
//! log from zero yields the current balance.
//!
//! ## Example
//!
//! ```
//! use neon_ledger::config::LedgerConfig;
//! use neon_ledger::store::MemoryStore;
//! use neon_ledger::wallet::{EntryCategory, WalletManager};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wallets = WalletManager::new(Arc::new(MemoryStore::new()), &LedgerConfig::default());
//!
//!     wallets
//!         .credit("alice", Decimal::from(100), "Welcome bonus", EntryCategory::AdminAdjustment)
//!         .await?;
//!     let entry = wallets
//!         .debit("alice", Decimal::from(40), "Withdrawal", EntryCategory::Withdrawal)
//!         .await?;
//!     assert_eq!(entry.balance_after, Decimal::from(60));
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;

pub use manager::{WalletManager, credit_in, debit_in};
pub use models::{
    AMOUNT_SCALE, Amount, DEFAULT_CURRENCY, EntryCategory, EntryDirection, MAX_AMOUNT,
    Reconciliation, Transaction, TransactionStatus, UserId, Wallet, in_amount_domain,
    new_transaction_id, positive_amount,
};
