//! Shared helpers for ledger integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use neon_ledger::game::{
    Game, GameFilter, GameOutcome, GameSettings, GameType, GameTypeStats, StatsDelta, UserStats,
};
use neon_ledger::payments::{PaymentDetails, PaymentRequest, PaymentRequestFilter};
use neon_ledger::store::{MemoryTx, StoreResult};
use neon_ledger::wallet::{EntryCategory, Transaction, Wallet};
use neon_ledger::{Ledger, LedgerConfig, LedgerStore, LedgerTx, MemoryStore, StoreError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Ledger config with a tight retry budget so failing tests finish quickly
pub fn test_config() -> LedgerConfig {
    LedgerConfig {
        max_attempts: 8,
        unit_timeout_ms: 2_000,
        retry_backoff_ms: 1,
        ..LedgerConfig::default()
    }
}

pub fn memory_ledger() -> Ledger<MemoryStore> {
    Ledger::new(MemoryStore::new(), test_config())
}

/// Give a user a starting balance through a regular deposit credit
pub async fn fund<S: LedgerStore>(ledger: &Ledger<S>, user_id: &str, amount: i64) {
    ledger
        .wallets
        .credit(
            user_id,
            Decimal::from(amount),
            "Initial deposit",
            EntryCategory::Deposit,
        )
        .await
        .expect("funding credit failed");
}

pub fn outcome(game: &str, bet: Decimal, win: Decimal, multiplier: Option<Decimal>) -> GameOutcome {
    GameOutcome {
        game_type: game.to_string(),
        bet_amount: bet,
        win_amount: win,
        multiplier,
        result_data: None,
    }
}

/// Point inside a unit where a fault can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    InsertGame,
    BumpStats,
    UpdateRequest,
    Commit,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    conflict: bool,
    remaining: u32,
}

/// Memory store that fails chosen steps on demand
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    faults: Arc<Mutex<HashMap<FaultPoint, Fault>>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` hits of `point` with a backend error
    pub fn fail(&self, point: FaultPoint, times: u32) {
        self.set(point, false, times);
    }

    /// Fail the next `times` hits of `point` with a conflict
    pub fn conflict(&self, point: FaultPoint, times: u32) {
        self.set(point, true, times);
    }

    pub fn clear(&self) {
        self.faults.lock().unwrap().clear();
    }

    fn set(&self, point: FaultPoint, conflict: bool, remaining: u32) {
        self.faults
            .lock()
            .unwrap()
            .insert(point, Fault { conflict, remaining });
    }

    fn trip(&self, point: FaultPoint) -> StoreResult<()> {
        let mut faults = self.faults.lock().unwrap();
        match faults.get_mut(&point) {
            Some(fault) if fault.remaining > 0 => {
                fault.remaining -= 1;
                if fault.conflict {
                    Err(StoreError::Conflict)
                } else {
                    Err(StoreError::Backend(format!("injected failure at {point:?}")))
                }
            }
            _ => Ok(()),
        }
    }
}

pub struct FaultyTx {
    store: FaultyStore,
    inner: MemoryTx,
}

#[async_trait]
impl LedgerTx for FaultyTx {
    async fn lock_wallet(&mut self, user_id: &str) -> StoreResult<Option<Wallet>> {
        self.inner.lock_wallet(user_id).await
    }

    async fn lock_or_create_wallet(&mut self, user_id: &str, currency: &str) -> StoreResult<Wallet> {
        self.inner.lock_or_create_wallet(user_id, currency).await
    }

    async fn put_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        self.inner.put_wallet(wallet).await
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        self.inner.append_transaction(transaction).await
    }

    async fn insert_game(&mut self, game: &Game) -> StoreResult<()> {
        self.store.trip(FaultPoint::InsertGame)?;
        self.inner.insert_game(game).await
    }

    async fn bump_user_stats(&mut self, user_id: &str, delta: &StatsDelta) -> StoreResult<()> {
        self.store.trip(FaultPoint::BumpStats)?;
        self.inner.bump_user_stats(user_id, delta).await
    }

    async fn lock_payment_request(&mut self, id: &str) -> StoreResult<Option<PaymentRequest>> {
        self.inner.lock_payment_request(id).await
    }

    async fn insert_payment_request(&mut self, request: &PaymentRequest) -> StoreResult<()> {
        self.inner.insert_payment_request(request).await
    }

    async fn update_payment_request(&mut self, request: &PaymentRequest) -> StoreResult<()> {
        self.store.trip(FaultPoint::UpdateRequest)?;
        self.inner.update_payment_request(request).await
    }

    async fn commit(self) -> StoreResult<()> {
        self.store.trip(FaultPoint::Commit)?;
        self.inner.commit().await
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    type Tx = FaultyTx;

    async fn begin(&self) -> StoreResult<FaultyTx> {
        Ok(FaultyTx {
            store: self.clone(),
            inner: self.inner.begin().await?,
        })
    }

    async fn wallet(&self, user_id: &str) -> StoreResult<Option<Wallet>> {
        self.inner.wallet(user_id).await
    }

    async fn ensure_wallet(&self, user_id: &str, currency: &str) -> StoreResult<Wallet> {
        self.inner.ensure_wallet(user_id, currency).await
    }

    async fn transactions(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Transaction>> {
        self.inner.transactions(user_id, limit).await
    }

    async fn games(&self, filter: &GameFilter) -> StoreResult<Vec<Game>> {
        self.inner.games(filter).await
    }

    async fn game_stats(&self, filter: &GameFilter) -> StoreResult<Vec<GameTypeStats>> {
        self.inner.game_stats(filter).await
    }

    async fn payment_request(&self, id: &str) -> StoreResult<Option<PaymentRequest>> {
        self.inner.payment_request(id).await
    }

    async fn payment_requests(
        &self,
        filter: &PaymentRequestFilter,
    ) -> StoreResult<Vec<PaymentRequest>> {
        self.inner.payment_requests(filter).await
    }

    async fn user_stats(&self, user_id: &str) -> StoreResult<Option<UserStats>> {
        self.inner.user_stats(user_id).await
    }

    async fn game_settings(&self, game_type: GameType) -> StoreResult<Option<GameSettings>> {
        self.inner.game_settings(game_type).await
    }

    async fn all_game_settings(&self) -> StoreResult<Vec<GameSettings>> {
        self.inner.all_game_settings().await
    }

    async fn put_game_settings(&self, settings: &GameSettings) -> StoreResult<()> {
        self.inner.put_game_settings(settings).await
    }

    async fn insert_game_settings_if_absent(&self, settings: &GameSettings) -> StoreResult<bool> {
        self.inner.insert_game_settings_if_absent(settings).await
    }

    async fn payment_details(&self) -> StoreResult<Option<PaymentDetails>> {
        self.inner.payment_details().await
    }

    async fn put_payment_details(&self, details: &PaymentDetails) -> StoreResult<()> {
        self.inner.put_payment_details(details).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
}
