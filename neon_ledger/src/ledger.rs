//! Entry point bundling every manager over one store.

use std::sync::Arc;

use crate::config::LedgerConfig;
use crate::errors::LedgerResult;
use crate::game::{GameManager, SettingsManager};
use crate::payments::PaymentManager;
use crate::store::LedgerStore;
use crate::wallet::WalletManager;

/// The ledger core
///
/// Cheap to clone; every clone shares the same store.
pub struct Ledger<S: LedgerStore> {
    store: Arc<S>,
    config: LedgerConfig,
    pub wallets: WalletManager<S>,
    pub games: GameManager<S>,
    pub payments: PaymentManager<S>,
    pub settings: SettingsManager<S>,
}

impl<S: LedgerStore> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            wallets: self.wallets.clone(),
            games: self.games.clone(),
            payments: self.payments.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self::with_shared_store(Arc::new(store), config)
    }

    pub fn with_shared_store(store: Arc<S>, config: LedgerConfig) -> Self {
        Self {
            wallets: WalletManager::new(Arc::clone(&store), &config),
            games: GameManager::new(Arc::clone(&store), &config),
            payments: PaymentManager::new(Arc::clone(&store), &config),
            settings: SettingsManager::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Check that the backing store answers
    pub async fn health_check(&self) -> LedgerResult<()> {
        Ok(self.store.health_check().await?)
    }
}
