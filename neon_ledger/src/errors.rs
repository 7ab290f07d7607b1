//! Ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by every ledger operation.
///
/// Business-rule variants are detected before anything is written, so the
/// caller never observes a partially applied unit. Storage variants are safe
/// to retry from the client for the same reason.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount is zero, negative, too precise, or out of range
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Game type is not part of the supported set
    #[error("Invalid game type: {0}")]
    InvalidGameType(String),

    /// Game outcome failed a sanity check
    #[error("Invalid game result: {0}")]
    InvalidGameResult(String),

    /// Payment method is not bank or upi
    #[error("Invalid payment method: {0}")]
    InvalidMethod(String),

    /// Decision is not accepted or declined
    #[error("Invalid decision: {0}")]
    InvalidDecision(String),

    /// Invalid game settings update
    #[error("Invalid game settings: {0}")]
    InvalidSettings(String),

    /// Insufficient balance
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Decimal, required: Decimal },

    /// Wallet not found
    #[error("Wallet not found for user {0}")]
    WalletNotFound(String),

    /// Payment request or other record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payment request already left the pending state
    #[error("Payment request {0} already processed")]
    AlreadyProcessed(String),

    /// Principal lacks the required role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Concurrent writer won the race; retried by the unit executor
    #[error("Storage conflict")]
    StorageConflict,

    /// Storage failed or the unit exceeded its deadline
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl LedgerError {
    /// Stable machine-readable identifier for this failure.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::InvalidGameType(_) => "invalid_game_type",
            LedgerError::InvalidGameResult(_) => "invalid_game_result",
            LedgerError::InvalidMethod(_) => "invalid_method",
            LedgerError::InvalidDecision(_) => "invalid_decision",
            LedgerError::InvalidSettings(_) => "invalid_settings",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::WalletNotFound(_) => "wallet_not_found",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::AlreadyProcessed(_) => "already_processed",
            LedgerError::Forbidden(_) => "forbidden",
            LedgerError::StorageConflict => "storage_conflict",
            LedgerError::StorageUnavailable(_) => "storage_unavailable",
        }
    }

    /// Whether the caller caused the failure (as opposed to the service).
    pub fn is_client_fault(&self) -> bool {
        !matches!(
            self,
            LedgerError::StorageConflict | LedgerError::StorageUnavailable(_)
        )
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage errors are sanitized so driver details never reach the client,
    /// and user ids are redacted from lookup failures.
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::StorageConflict | LedgerError::StorageUnavailable(_) => {
                "Service temporarily unavailable".to_string()
            }
            LedgerError::WalletNotFound(_) => "Wallet not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => LedgerError::StorageConflict,
            StoreError::Overflow(amount) => LedgerError::InvalidAmount(amount),
            other => LedgerError::StorageUnavailable(other.to_string()),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_storage_conflict() {
        let err: LedgerError = StoreError::Conflict.into();
        assert!(matches!(err, LedgerError::StorageConflict));
        assert!(!err.is_client_fault());
    }

    #[test]
    fn test_overflow_is_a_client_amount_error() {
        let err: LedgerError = StoreError::Overflow(Decimal::MAX).into();
        assert!(matches!(err, LedgerError::InvalidAmount(a) if a == Decimal::MAX));
        assert!(err.is_client_fault());
    }

    #[test]
    fn test_backend_failure_is_sanitized() {
        let err: LedgerError = StoreError::Backend("connection reset by peer".into()).into();
        assert_eq!(err.kind(), "storage_unavailable");
        assert!(!err.client_message().contains("peer"));
    }

    #[test]
    fn test_business_errors_are_client_faults() {
        let err = LedgerError::InsufficientBalance {
            available: Decimal::new(10, 0),
            required: Decimal::new(20, 0),
        };
        assert!(err.is_client_fault());
        assert_eq!(err.kind(), "insufficient_balance");
        assert!(err.client_message().contains("required 20"));
    }
}
