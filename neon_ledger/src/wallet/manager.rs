//! Balance ledger: the only writer of wallets and their transaction log.

use chrono::Utc;
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::models::{
    Amount, EntryCategory, EntryDirection, MAX_AMOUNT, Reconciliation, Transaction,
    TransactionStatus, Wallet, new_transaction_id, positive_amount,
};
use crate::config::LedgerConfig;
use crate::errors::{LedgerError, LedgerResult};
use crate::store::{LedgerStore, LedgerTx, UnitPolicy, run_unit};

/// Debit a wallet inside a caller's unit
///
/// Never creates a wallet. The balance snapshots on the returned entry are
/// taken from the locked wallet, so they agree with what the unit commits.
///
/// # Errors
///
/// * `LedgerError::InvalidAmount` - Amount not positive or outside the amount domain
/// * `LedgerError::WalletNotFound` - User has no wallet
/// * `LedgerError::InsufficientBalance` - Balance below amount
pub async fn debit_in<T: LedgerTx>(
    tx: &mut T,
    user_id: &str,
    amount: Amount,
    description: &str,
    category: EntryCategory,
) -> LedgerResult<Transaction> {
    let amount = positive_amount(amount)?;

    let wallet = tx
        .lock_wallet(user_id)
        .await?
        .ok_or_else(|| LedgerError::WalletNotFound(user_id.to_string()))?;

    if wallet.balance < amount {
        return Err(LedgerError::InsufficientBalance {
            available: wallet.balance,
            required: amount,
        });
    }

    apply_entry(tx, wallet, EntryDirection::Debit, amount, description, category).await
}

/// Credit a wallet inside a caller's unit, creating the wallet if needed
///
/// # Errors
///
/// * `LedgerError::InvalidAmount` - Amount not positive or outside the amount
///   domain, or the new balance would exceed `MAX_AMOUNT`
pub async fn credit_in<T: LedgerTx>(
    tx: &mut T,
    user_id: &str,
    currency: &str,
    amount: Amount,
    description: &str,
    category: EntryCategory,
) -> LedgerResult<Transaction> {
    let amount = positive_amount(amount)?;

    let wallet = tx.lock_or_create_wallet(user_id, currency).await?;
    apply_entry(tx, wallet, EntryDirection::Credit, amount, description, category).await
}

async fn apply_entry<T: LedgerTx>(
    tx: &mut T,
    mut wallet: Wallet,
    direction: EntryDirection,
    amount: Amount,
    description: &str,
    category: EntryCategory,
) -> LedgerResult<Transaction> {
    let balance_before = wallet.balance;
    let balance_after = match direction {
        EntryDirection::Credit => balance_before.checked_add(amount),
        EntryDirection::Debit => balance_before.checked_sub(amount),
    }
    .filter(|balance| *balance <= MAX_AMOUNT)
    .ok_or(LedgerError::InvalidAmount(amount))?;

    let now = Utc::now();
    wallet.balance = balance_after;
    wallet.last_updated = now;
    tx.put_wallet(&wallet).await?;

    let entry = Transaction {
        id: new_transaction_id(),
        user_id: wallet.user_id,
        direction,
        amount,
        description: description.to_string(),
        category,
        balance_before,
        balance_after,
        status: TransactionStatus::Completed,
        created_at: now,
    };
    tx.append_transaction(&entry).await?;
    Ok(entry)
}

/// Wallet manager
pub struct WalletManager<S: LedgerStore> {
    store: Arc<S>,
    policy: UnitPolicy,
    currency: String,
}

impl<S: LedgerStore> Clone for WalletManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
            currency: self.currency.clone(),
        }
    }
}

impl<S: LedgerStore> WalletManager<S> {
    /// Create a new wallet manager
    ///
    /// # Arguments
    ///
    /// * `store` - Ledger store
    /// * `config` - Currency and unit retry policy
    pub fn new(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            store,
            policy: UnitPolicy::from(config),
            currency: config.currency.clone(),
        }
    }

    /// Currency assigned to new wallets
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Get a user's wallet, creating an empty one if absent
    ///
    /// Safe to race: concurrent callers all observe the same wallet.
    pub async fn get_or_create_wallet(&self, user_id: &str) -> LedgerResult<Wallet> {
        Ok(self.store.ensure_wallet(user_id, &self.currency).await?)
    }

    /// Get a user's wallet without creating it
    ///
    /// # Errors
    ///
    /// * `LedgerError::WalletNotFound` - User has no wallet
    pub async fn get_wallet(&self, user_id: &str) -> LedgerResult<Wallet> {
        self.store
            .wallet(user_id)
            .await?
            .ok_or_else(|| LedgerError::WalletNotFound(user_id.to_string()))
    }

    /// Debit a user's wallet as its own atomic unit
    ///
    /// # Arguments
    ///
    /// * `user_id` - Wallet owner
    /// * `amount` - Positive amount to remove
    /// * `description` - Free text stored on the entry
    /// * `category` - Entry category
    ///
    /// # Returns
    ///
    /// * `LedgerResult<Transaction>` - The committed debit entry
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount not positive
    /// * `LedgerError::WalletNotFound` - User has no wallet
    /// * `LedgerError::InsufficientBalance` - Balance below amount
    /// * `LedgerError::StorageUnavailable` - Storage failed or timed out
    pub async fn debit(
        &self,
        user_id: &str,
        amount: Amount,
        description: &str,
        category: EntryCategory,
    ) -> LedgerResult<Transaction> {
        let store = &self.store;
        let entry = run_unit(&self.policy, "debit", move || async move {
            let mut tx = store.begin().await?;
            let entry = debit_in(&mut tx, user_id, amount, description, category).await?;
            tx.commit().await?;
            Ok(entry)
        })
        .await?;

        debug!(
            "Debited {} from {} ({}), balance {}",
            amount, user_id, category, entry.balance_after
        );
        Ok(entry)
    }

    /// Credit a user's wallet as its own atomic unit, creating it if needed
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Amount not positive or overflowing
    /// * `LedgerError::StorageUnavailable` - Storage failed or timed out
    pub async fn credit(
        &self,
        user_id: &str,
        amount: Amount,
        description: &str,
        category: EntryCategory,
    ) -> LedgerResult<Transaction> {
        let store = &self.store;
        let currency = self.currency.as_str();
        let entry = run_unit(&self.policy, "credit", move || async move {
            let mut tx = store.begin().await?;
            let entry =
                credit_in(&mut tx, user_id, currency, amount, description, category).await?;
            tx.commit().await?;
            Ok(entry)
        })
        .await?;

        debug!(
            "Credited {} to {} ({}), balance {}",
            amount, user_id, category, entry.balance_after
        );
        Ok(entry)
    }

    /// Transaction history for a user, newest first
    pub async fn transactions(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> LedgerResult<Vec<Transaction>> {
        Ok(self.store.transactions(user_id, limit).await?)
    }

    /// Replay a user's log and compare it against the wallet
    ///
    /// Checks that the signed entry amounts sum to the balance and that each
    /// entry's `balanceBefore` is the previous entry's `balanceAfter`.
    pub async fn reconcile(&self, user_id: &str) -> LedgerResult<Reconciliation> {
        let balance = self
            .store
            .wallet(user_id)
            .await?
            .map_or(Decimal::ZERO, |w| w.balance);

        let mut entries = self.store.transactions(user_id, None).await?;
        entries.reverse();

        let mut running = Decimal::ZERO;
        let mut first_broken_entry = None;
        for (index, entry) in entries.iter().enumerate() {
            let expected_after = running + entry.signed_amount();
            if first_broken_entry.is_none()
                && (entry.balance_before != running || entry.balance_after != expected_after)
            {
                first_broken_entry = Some(index);
            }
            running = expected_after;
        }

        Ok(Reconciliation {
            user_id: user_id.to_string(),
            balance,
            ledger_sum: running,
            entries: entries.len(),
            first_broken_entry,
            consistent: first_broken_entry.is_none() && running == balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn manager() -> WalletManager<MemoryStore> {
        WalletManager::new(Arc::new(MemoryStore::new()), &LedgerConfig::default())
    }

    #[tokio::test]
    async fn test_debit_never_creates_wallet() {
        let wallets = manager();
        let err = wallets
            .debit("ghost", Decimal::ONE, "bet", EntryCategory::GameLoss)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::WalletNotFound(_)));
        assert!(wallets.get_wallet("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_credit_then_debit_snapshots() {
        let wallets = manager();
        let credit = wallets
            .credit("u1", Decimal::from(100), "deposit", EntryCategory::Deposit)
            .await
            .unwrap();
        assert_eq!(credit.balance_before, Decimal::ZERO);
        assert_eq!(credit.balance_after, Decimal::from(100));

        let debit = wallets
            .debit("u1", Decimal::from(30), "bet", EntryCategory::GameLoss)
            .await
            .unwrap();
        assert_eq!(debit.balance_before, Decimal::from(100));
        assert_eq!(debit.balance_after, Decimal::from(70));

        let wallet = wallets.get_wallet("u1").await.unwrap();
        assert_eq!(wallet.balance, Decimal::from(70));
        assert_eq!(wallet.currency, "INR");
        assert!(wallets.reconcile("u1").await.unwrap().consistent);
    }

    #[tokio::test]
    async fn test_overdraft_rejected_without_writes() {
        let wallets = manager();
        wallets
            .credit("u1", Decimal::from(10), "deposit", EntryCategory::Deposit)
            .await
            .unwrap();

        let err = wallets
            .debit("u1", Decimal::from(11), "bet", EntryCategory::GameLoss)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance { available, required }
                if available == Decimal::from(10) && required == Decimal::from(11)
        ));
        assert_eq!(wallets.transactions("u1", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let wallets = manager();
        for amount in [Decimal::ZERO, Decimal::NEGATIVE_ONE] {
            assert!(matches!(
                wallets.credit("u1", amount, "x", EntryCategory::Deposit).await,
                Err(LedgerError::InvalidAmount(_))
            ));
        }
        assert!(wallets.get_wallet("u1").await.is_err());
    }

    #[tokio::test]
    async fn test_credit_past_max_balance_is_invalid_amount() {
        let wallets = manager();
        wallets
            .credit("u1", MAX_AMOUNT, "deposit", EntryCategory::Deposit)
            .await
            .unwrap();
        let err = wallets
            .credit("u1", Decimal::new(1, 4), "deposit", EntryCategory::Deposit)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
        assert_eq!(wallets.get_wallet("u1").await.unwrap().balance, MAX_AMOUNT);
        assert_eq!(wallets.transactions("u1", None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sub_unit_debit_rejected_before_any_write() {
        let wallets = manager();
        wallets
            .credit("u1", Decimal::from(10), "deposit", EntryCategory::Deposit)
            .await
            .unwrap();

        let err = wallets
            .debit("u1", Decimal::new(100_005, 5), "bet", EntryCategory::GameLoss)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(a) if a == Decimal::new(100_005, 5)));
        assert_eq!(wallets.get_wallet("u1").await.unwrap().balance, Decimal::from(10));
        assert!(wallets.reconcile("u1").await.unwrap().consistent);
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let wallets = manager();
        let first = wallets.get_or_create_wallet("u1").await.unwrap();
        let second = wallets.get_or_create_wallet("u1").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.balance, Decimal::ZERO);
    }
}
