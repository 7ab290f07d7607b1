//! Wallet data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::{LedgerError, LedgerResult};

/// User ID type
pub type UserId = String;

/// Monetary amount
pub type Amount = Decimal;

/// Currency assigned to freshly created wallets
pub const DEFAULT_CURRENCY: &str = "INR";

/// Decimal places kept for every amount and balance (`NUMERIC(20, 4)`)
pub const AMOUNT_SCALE: u32 = 4;

/// Largest amount or balance the ledger stores: `9999999999999999.9999`
pub const MAX_AMOUNT: Amount = Decimal::from_parts(0x630F_FFFF, 0x6BC7_5E2D, 0x5, false, AMOUNT_SCALE);

/// Whether a value is representable without rounding in every store
///
/// Values with more than [`AMOUNT_SCALE`] significant decimal places, or
/// beyond [`MAX_AMOUNT`] in magnitude, would be rounded or rejected by the
/// database, so the ledger refuses them up front.
pub fn in_amount_domain(amount: Amount) -> bool {
    amount.normalize().scale() <= AMOUNT_SCALE && amount.abs() <= MAX_AMOUNT
}

/// Check a caller-supplied amount that must be strictly positive
///
/// # Errors
///
/// * `LedgerError::InvalidAmount` - Not positive, too precise, or too large
pub fn positive_amount(amount: Amount) -> LedgerResult<Amount> {
    if amount <= Decimal::ZERO || !in_amount_domain(amount) {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(amount)
}

/// Wallet model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Amount,
    /// Reserved for hold/escrow semantics; always zero.
    pub locked_balance: Amount,
    pub currency: String,
    /// Optimistic concurrency counter, bumped on every committed write.
    pub version: i64,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Empty wallet for a user seen for the first time
    pub fn empty(user_id: &str, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            balance: Decimal::ZERO,
            locked_balance: Decimal::ZERO,
            currency: currency.to_string(),
            version: 0,
            last_updated: now,
            created_at: now,
        }
    }
}

/// Ledger entry model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub direction: EntryDirection,
    pub amount: Amount,
    pub description: String,
    pub category: EntryCategory,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Amount with the sign of its direction (credits positive)
    pub fn signed_amount(&self) -> Amount {
        match self.direction {
            EntryDirection::Credit => self.amount,
            EntryDirection::Debit => -self.amount,
        }
    }
}

/// Generate a unique, time-ordered ledger entry id
pub fn new_transaction_id() -> String {
    format!("txn_{}", Uuid::now_v7().simple())
}

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Debit,
    Credit,
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Debit => write!(f, "debit"),
            EntryDirection::Credit => write!(f, "credit"),
        }
    }
}

impl FromStr for EntryDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(EntryDirection::Debit),
            "credit" => Ok(EntryDirection::Credit),
            other => Err(format!("unknown entry direction '{other}'")),
        }
    }
}

/// Entry category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    Deposit,
    Withdrawal,
    GameWin,
    GameLoss,
    AdminAdjustment,
}

impl std::fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryCategory::Deposit => write!(f, "deposit"),
            EntryCategory::Withdrawal => write!(f, "withdrawal"),
            EntryCategory::GameWin => write!(f, "game_win"),
            EntryCategory::GameLoss => write!(f, "game_loss"),
            EntryCategory::AdminAdjustment => write!(f, "admin_adjustment"),
        }
    }
}

impl FromStr for EntryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(EntryCategory::Deposit),
            "withdrawal" => Ok(EntryCategory::Withdrawal),
            "game_win" => Ok(EntryCategory::GameWin),
            "game_loss" => Ok(EntryCategory::GameLoss),
            "admin_adjustment" => Ok(EntryCategory::AdminAdjustment),
            other => Err(format!("unknown entry category '{other}'")),
        }
    }
}

/// Persisted entries are always completed; no partial states are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "completed")
    }
}

/// Result of replaying a user's ledger against their wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    pub user_id: UserId,
    pub balance: Amount,
    pub ledger_sum: Amount,
    pub entries: usize,
    /// Index (oldest first) of the first entry whose snapshots break the chain
    pub first_broken_entry: Option<usize>,
    pub consistent: bool,
}
