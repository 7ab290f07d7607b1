//! In-memory ledger store for tests, local demos, and embedding.
//!
//! Units stage their writes locally and remember the version of every wallet
//! and the snapshot of every payment request they read. `commit` takes the
//! state lock, checks that nothing it read has changed since, and applies all
//! staged writes in one step; otherwise it fails with `StoreError::Conflict`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{LedgerStore, LedgerTx, StoreError, StoreResult};
use crate::game::{
    Game, GameFilter, GameSettings, GameType, GameTypeStats, StatsDelta, UserStats,
};
use crate::payments::{PaymentDetails, PaymentRequest, PaymentRequestFilter};
use crate::wallet::{Transaction, Wallet};

#[derive(Default)]
struct MemoryState {
    wallets: HashMap<String, Wallet>,
    /// Commit order; per-user order is the ledger order
    transactions: Vec<Transaction>,
    games: Vec<Game>,
    stats: HashMap<String, UserStats>,
    payment_requests: HashMap<String, PaymentRequest>,
    game_settings: BTreeMap<GameType, GameSettings>,
    payment_details: Option<PaymentDetails>,
}

/// Shared in-memory store; clones see the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".into()))
    }
}

/// Unit of work over a [`MemoryStore`]
pub struct MemoryTx {
    store: MemoryStore,
    /// Wallet version observed on first read (`None` when absent)
    wallet_reads: HashMap<String, Option<i64>>,
    wallets: HashMap<String, Wallet>,
    request_reads: HashMap<String, Option<PaymentRequest>>,
    requests: HashMap<String, PaymentRequest>,
    transactions: Vec<Transaction>,
    games: Vec<Game>,
    stats: HashMap<String, StatsDelta>,
}

impl MemoryTx {
    fn new(store: MemoryStore) -> Self {
        Self {
            store,
            wallet_reads: HashMap::new(),
            wallets: HashMap::new(),
            request_reads: HashMap::new(),
            requests: HashMap::new(),
            transactions: Vec::new(),
            games: Vec::new(),
            stats: HashMap::new(),
        }
    }

    fn observe_wallet(&mut self, user_id: &str) -> StoreResult<Option<Wallet>> {
        if let Some(staged) = self.wallets.get(user_id) {
            return Ok(Some(staged.clone()));
        }
        let current = self.store.read()?.wallets.get(user_id).cloned();
        self.wallet_reads
            .entry(user_id.to_string())
            .or_insert_with(|| current.as_ref().map(|w| w.version));
        Ok(current)
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn lock_wallet(&mut self, user_id: &str) -> StoreResult<Option<Wallet>> {
        self.observe_wallet(user_id)
    }

    async fn lock_or_create_wallet(&mut self, user_id: &str, currency: &str) -> StoreResult<Wallet> {
        match self.observe_wallet(user_id)? {
            Some(wallet) => Ok(wallet),
            None => {
                let wallet = Wallet::empty(user_id, currency);
                self.wallets.insert(user_id.to_string(), wallet.clone());
                Ok(wallet)
            }
        }
    }

    async fn put_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        if !self.wallet_reads.contains_key(&wallet.user_id) {
            return Err(StoreError::Backend(format!(
                "wallet {} written without being locked",
                wallet.user_id
            )));
        }
        self.wallets.insert(wallet.user_id.clone(), wallet.clone());
        Ok(())
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        self.transactions.push(transaction.clone());
        Ok(())
    }

    async fn insert_game(&mut self, game: &Game) -> StoreResult<()> {
        self.games.push(game.clone());
        Ok(())
    }

    async fn bump_user_stats(&mut self, user_id: &str, delta: &StatsDelta) -> StoreResult<()> {
        let staged = self.stats.entry(user_id.to_string()).or_default();
        *staged = staged
            .checked_merge(delta)
            .ok_or(StoreError::Overflow(delta.wagered))?;
        Ok(())
    }

    async fn lock_payment_request(&mut self, id: &str) -> StoreResult<Option<PaymentRequest>> {
        if let Some(staged) = self.requests.get(id) {
            return Ok(Some(staged.clone()));
        }
        let current = self.store.read()?.payment_requests.get(id).cloned();
        self.request_reads
            .entry(id.to_string())
            .or_insert_with(|| current.clone());
        Ok(current)
    }

    async fn insert_payment_request(&mut self, request: &PaymentRequest) -> StoreResult<()> {
        self.request_reads.entry(request.id.clone()).or_insert(None);
        self.requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn update_payment_request(&mut self, request: &PaymentRequest) -> StoreResult<()> {
        if !self.request_reads.contains_key(&request.id) {
            return Err(StoreError::Backend(format!(
                "payment request {} written without being locked",
                request.id
            )));
        }
        self.requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        let mut state = self.store.write()?;

        for (user_id, observed) in &self.wallet_reads {
            let current = state.wallets.get(user_id).map(|w| w.version);
            if current != *observed {
                return Err(StoreError::Conflict);
            }
        }
        for (id, observed) in &self.request_reads {
            if state.payment_requests.get(id) != observed.as_ref() {
                return Err(StoreError::Conflict);
            }
        }

        // Everything fallible happens before the first write to `state`
        let mut stats_rows = Vec::with_capacity(self.stats.len());
        for (user_id, delta) in &self.stats {
            let current = state
                .stats
                .get(user_id)
                .cloned()
                .unwrap_or_else(|| UserStats::empty(user_id));
            let next = current
                .checked_apply(delta)
                .ok_or(StoreError::Overflow(delta.wagered))?;
            stats_rows.push(next);
        }

        for (user_id, mut wallet) in self.wallets {
            let observed = self.wallet_reads.get(&user_id).copied().flatten();
            wallet.version = observed.map_or(1, |v| v + 1);
            state.wallets.insert(user_id, wallet);
        }
        state.transactions.extend(self.transactions);
        state.games.extend(self.games);
        for row in stats_rows {
            state.stats.insert(row.user_id.clone(), row);
        }
        state.payment_requests.extend(self.requests);

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        Ok(MemoryTx::new(self.clone()))
    }

    async fn wallet(&self, user_id: &str) -> StoreResult<Option<Wallet>> {
        Ok(self.read()?.wallets.get(user_id).cloned())
    }

    async fn ensure_wallet(&self, user_id: &str, currency: &str) -> StoreResult<Wallet> {
        let mut state = self.write()?;
        let wallet = state
            .wallets
            .entry(user_id.to_string())
            .or_insert_with(|| {
                let mut wallet = Wallet::empty(user_id, currency);
                wallet.version = 1;
                wallet
            });
        Ok(wallet.clone())
    }

    async fn transactions(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Transaction>> {
        let state = self.read()?;
        let limit = limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn games(&self, filter: &GameFilter) -> StoreResult<Vec<Game>> {
        let state = self.read()?;
        let limit = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(state
            .games
            .iter()
            .rev()
            .filter(|g| filter.matches(g))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn game_stats(&self, filter: &GameFilter) -> StoreResult<Vec<GameTypeStats>> {
        let state = self.read()?;
        let mut rows: BTreeMap<GameType, GameTypeStats> = BTreeMap::new();
        for game in state.games.iter().filter(|g| filter.matches(g)) {
            let row = rows.entry(game.game_type).or_insert_with(|| GameTypeStats {
                game_type: game.game_type,
                total_games: 0,
                total_wagered: Default::default(),
                total_won: Default::default(),
                biggest_win: Default::default(),
                last_played: game.created_at,
            });
            row.total_games += 1;
            row.total_wagered = row.total_wagered.saturating_add(game.bet_amount);
            row.total_won = row.total_won.saturating_add(game.win_amount);
            row.biggest_win = row.biggest_win.max(game.win_amount);
            row.last_played = row.last_played.max(game.created_at);
        }
        Ok(rows.into_values().collect())
    }

    async fn payment_request(&self, id: &str) -> StoreResult<Option<PaymentRequest>> {
        Ok(self.read()?.payment_requests.get(id).cloned())
    }

    async fn payment_requests(
        &self,
        filter: &PaymentRequestFilter,
    ) -> StoreResult<Vec<PaymentRequest>> {
        let state = self.read()?;
        let mut requests: Vec<PaymentRequest> = state
            .payment_requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn user_stats(&self, user_id: &str) -> StoreResult<Option<UserStats>> {
        Ok(self.read()?.stats.get(user_id).cloned())
    }

    async fn game_settings(&self, game_type: GameType) -> StoreResult<Option<GameSettings>> {
        Ok(self.read()?.game_settings.get(&game_type).cloned())
    }

    async fn all_game_settings(&self) -> StoreResult<Vec<GameSettings>> {
        Ok(self.read()?.game_settings.values().cloned().collect())
    }

    async fn put_game_settings(&self, settings: &GameSettings) -> StoreResult<()> {
        self.write()?
            .game_settings
            .insert(settings.game_type, settings.clone());
        Ok(())
    }

    async fn insert_game_settings_if_absent(&self, settings: &GameSettings) -> StoreResult<bool> {
        let mut state = self.write()?;
        if state.game_settings.contains_key(&settings.game_type) {
            return Ok(false);
        }
        state.game_settings.insert(settings.game_type, settings.clone());
        Ok(true)
    }

    async fn payment_details(&self) -> StoreResult<Option<PaymentDetails>> {
        Ok(self.read()?.payment_details.clone())
    }

    async fn put_payment_details(&self, details: &PaymentDetails) -> StoreResult<()> {
        let mut details = details.clone();
        details.updated_at = Utc::now();
        self.write()?.payment_details = Some(details);
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_uncommitted_unit_leaves_no_trace() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut wallet = tx.lock_or_create_wallet("u1", "INR").await.unwrap();
        wallet.balance = Decimal::new(50, 0);
        tx.put_wallet(&wallet).await.unwrap();
        drop(tx);

        assert!(store.wallet("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_bumps_version() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let wallet = tx.lock_or_create_wallet("u1", "INR").await.unwrap();
        tx.put_wallet(&wallet).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.wallet("u1").await.unwrap().unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_stale_read_conflicts() {
        let store = MemoryStore::new();
        store.ensure_wallet("u1", "INR").await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        let mut a = first.lock_wallet("u1").await.unwrap().unwrap();
        let mut b = second.lock_wallet("u1").await.unwrap().unwrap();
        a.balance = Decimal::new(10, 0);
        b.balance = Decimal::new(20, 0);
        first.put_wallet(&a).await.unwrap();
        second.put_wallet(&b).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::Conflict)));
        assert_eq!(
            store.wallet("u1").await.unwrap().unwrap().balance,
            Decimal::new(10, 0)
        );
    }

    #[tokio::test]
    async fn test_racing_wallet_creation_conflicts() {
        let store = MemoryStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        let a = first.lock_or_create_wallet("u1", "INR").await.unwrap();
        let b = second.lock_or_create_wallet("u1", "INR").await.unwrap();
        first.put_wallet(&a).await.unwrap();
        second.put_wallet(&b).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::Conflict)));
    }

    #[tokio::test]
    async fn test_ensure_wallet_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.ensure_wallet("u1", "INR").await.unwrap();
        let second = store.ensure_wallet("u1", "USD").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.currency, "INR");
    }

    #[tokio::test]
    async fn test_stats_overflow_rejects_whole_unit() {
        let store = MemoryStore::new();
        let huge = StatsDelta {
            games_played: 1,
            wagered: Decimal::MAX,
            won: Decimal::ZERO,
        };

        let mut tx = store.begin().await.unwrap();
        tx.bump_user_stats("u1", &huge).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut wallet = tx.lock_or_create_wallet("u1", "INR").await.unwrap();
        wallet.balance = Decimal::ONE;
        tx.put_wallet(&wallet).await.unwrap();
        tx.bump_user_stats("u1", &huge).await.unwrap();
        assert!(matches!(tx.commit().await, Err(StoreError::Overflow(_))));

        // Nothing from the failed unit landed and the store still answers
        assert!(store.wallet("u1").await.unwrap().is_none());
        let stats = store.user_stats("u1").await.unwrap().unwrap();
        assert_eq!(stats.total_games_played, 1);
        assert_eq!(stats.total_wagered, Decimal::MAX);
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_staged_stats_overflow_fails_early() {
        let store = MemoryStore::new();
        let huge = StatsDelta {
            games_played: 1,
            wagered: Decimal::MAX,
            won: Decimal::ZERO,
        };
        let mut tx = store.begin().await.unwrap();
        tx.bump_user_stats("u1", &huge).await.unwrap();
        assert!(matches!(
            tx.bump_user_stats("u1", &huge).await,
            Err(StoreError::Overflow(_))
        ));
    }

    #[tokio::test]
    async fn test_put_wallet_requires_lock() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let wallet = Wallet::empty("u1", "INR");
        assert!(tx.put_wallet(&wallet).await.is_err());
    }
}
