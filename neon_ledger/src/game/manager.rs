//! Game settlement and game queries.

use chrono::Utc;
use log::{info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::models::{
    Game, GameFilter, GameOutcome, GameStats, GameType, StatsDelta, UserStats, new_game_id,
};
use super::validation::{ValidatedOutcome, validate_outcome};
use crate::config::LedgerConfig;
use crate::errors::LedgerResult;
use crate::store::{LedgerStore, LedgerTx, UnitPolicy, run_unit};
use crate::wallet::{Amount, EntryCategory, credit_in, debit_in};

/// Default page size for game history
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Default page size for the recent bets feed
pub const DEFAULT_RECENT_BETS_LIMIT: i64 = 20;

/// A settled game with the balance its unit left behind
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub game: Game,
    /// `balanceAfter` of the last entry the settlement wrote
    pub balance: Amount,
}

/// Apply a validated outcome inside a caller's unit
///
/// Debits the bet, credits any win, records the game and bumps the user's
/// counters. Nothing is visible until the caller commits.
pub async fn settle_in<T: LedgerTx>(
    tx: &mut T,
    user_id: &str,
    currency: &str,
    outcome: &ValidatedOutcome,
) -> LedgerResult<Settlement> {
    let label = outcome.game_type.as_str();

    let mut last_entry = debit_in(
        tx,
        user_id,
        outcome.bet_amount,
        &format!("{label} game bet"),
        EntryCategory::GameLoss,
    )
    .await?;

    if outcome.win_amount > Decimal::ZERO {
        last_entry = credit_in(
            tx,
            user_id,
            currency,
            outcome.win_amount,
            &format!("{label} game win"),
            EntryCategory::GameWin,
        )
        .await?;
    }

    let game = Game {
        id: new_game_id(),
        user_id: user_id.to_string(),
        game_type: outcome.game_type,
        bet_amount: outcome.bet_amount,
        win_amount: outcome.win_amount,
        multiplier: outcome.multiplier,
        result_data: outcome.result_data.clone(),
        settled: true,
        created_at: Utc::now(),
    };
    tx.insert_game(&game).await?;

    tx.bump_user_stats(
        user_id,
        &StatsDelta::for_game(outcome.bet_amount, outcome.win_amount),
    )
    .await?;

    Ok(Settlement {
        game,
        balance: last_entry.balance_after,
    })
}

/// Game manager
pub struct GameManager<S: LedgerStore> {
    store: Arc<S>,
    policy: UnitPolicy,
    currency: String,
}

impl<S: LedgerStore> Clone for GameManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
            currency: self.currency.clone(),
        }
    }
}

impl<S: LedgerStore> GameManager<S> {
    pub fn new(store: Arc<S>, config: &LedgerConfig) -> Self {
        Self {
            store,
            policy: UnitPolicy::from(config),
            currency: config.currency.clone(),
        }
    }

    /// Settle a game outcome against the user's wallet
    ///
    /// The outcome is validated before anything is written; the bet debit,
    /// win credit, game record and stats update then commit as one unit.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Player
    /// * `outcome` - Result computed by the game logic
    ///
    /// # Returns
    ///
    /// * `LedgerResult<Game>` - The settled game
    ///
    /// # Errors
    ///
    /// * `LedgerError::InvalidAmount` - Bet not positive, win negative, or either
    ///   outside the amount domain
    /// * `LedgerError::InvalidGameType` - Unknown game
    /// * `LedgerError::InvalidGameResult` - Outcome breaks a game rule
    /// * `LedgerError::WalletNotFound` - Player has no wallet
    /// * `LedgerError::InsufficientBalance` - Balance below the bet
    /// * `LedgerError::StorageUnavailable` - Storage failed or timed out
    pub async fn settle(&self, user_id: &str, outcome: GameOutcome) -> LedgerResult<Game> {
        Ok(self.settle_with_balance(user_id, outcome).await?.game)
    }

    /// Like [`settle`](Self::settle), also returning the balance committed by
    /// the same unit
    pub async fn settle_with_balance(
        &self,
        user_id: &str,
        outcome: GameOutcome,
    ) -> LedgerResult<Settlement> {
        let outcome = validate_outcome(outcome).inspect_err(|e| {
            warn!("Rejected game outcome from {user_id}: {e}");
        })?;

        let store = &self.store;
        let currency = self.currency.as_str();
        let validated = &outcome;
        let settlement = run_unit(&self.policy, "settle", move || async move {
            let mut tx = store.begin().await?;
            let settlement = settle_in(&mut tx, user_id, currency, validated).await?;
            tx.commit().await?;
            Ok(settlement)
        })
        .await?;

        let game = &settlement.game;
        info!(
            "Settled {} game {} for {}: bet {} won {}, balance {}",
            game.game_type, game.id, user_id, game.bet_amount, game.win_amount, settlement.balance
        );
        Ok(settlement)
    }

    /// A user's games, newest first
    pub async fn history(
        &self,
        user_id: &str,
        game_type: Option<GameType>,
        limit: Option<i64>,
    ) -> LedgerResult<Vec<Game>> {
        let filter = GameFilter {
            user_id: Some(user_id.to_string()),
            game_type,
            limit: Some(limit.unwrap_or(DEFAULT_HISTORY_LIMIT)),
        };
        Ok(self.store.games(&filter).await?)
    }

    /// Latest games across all users, newest first
    pub async fn recent_bets(&self, limit: Option<i64>) -> LedgerResult<Vec<Game>> {
        let filter = GameFilter {
            limit: Some(limit.unwrap_or(DEFAULT_RECENT_BETS_LIMIT)),
            ..GameFilter::default()
        };
        Ok(self.store.games(&filter).await?)
    }

    /// Aggregates grouped by game type, for one user or globally
    pub async fn stats(
        &self,
        user_id: Option<&str>,
        game_type: Option<GameType>,
    ) -> LedgerResult<GameStats> {
        let filter = GameFilter {
            user_id: user_id.map(str::to_string),
            game_type,
            limit: None,
        };
        let rows = self.store.game_stats(&filter).await?;
        Ok(GameStats::from_breakdown(rows))
    }

    /// Running counters for a user; zeroes if they never played
    pub async fn user_stats(&self, user_id: &str) -> LedgerResult<UserStats> {
        Ok(self
            .store
            .user_stats(user_id)
            .await?
            .unwrap_or_else(|| UserStats::empty(user_id)))
    }
}
