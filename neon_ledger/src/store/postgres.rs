//! PostgreSQL ledger store.
//!
//! Units are database transactions. Wallet and payment request reads inside a
//! unit take row locks (`FOR UPDATE`), so concurrent units for the same user
//! queue behind each other; wallet writes are additionally guarded by the
//! version column and the `balance >= 0` check constraint.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Row};

use super::{LedgerStore, LedgerTx, StoreError, StoreResult, is_numeric_overflow};
use crate::game::{
    Game, GameFilter, GameSettings, GameType, GameTypeStats, ResultData, StatsDelta, UserStats,
};
use crate::payments::{PaymentDetails, PaymentRequest, PaymentRequestFilter};
use crate::wallet::{Transaction, TransactionStatus, Wallet};

/// Bundled schema, applied by [`PgStore::migrate`]
pub const SCHEMA: &str = include_str!("schema.sql");

const WALLET_COLUMNS: &str =
    "user_id, balance, locked_balance, currency, version, last_updated, created_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, direction, amount, description, category, \
     balance_before, balance_after, status, created_at";

const GAME_COLUMNS: &str =
    "id, user_id, game_type, bet_amount, win_amount, multiplier, result_data, settled, created_at";

const REQUEST_COLUMNS: &str = "id, user_id, amount, payment_method, transaction_ref, proof_url, \
     notes, status, admin_notes, created_at, updated_at";

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

/// Unit of work over a [`PgStore`]
pub struct PgTx {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn parse_column<T: std::str::FromStr>(row: &PgRow, column: &str) -> StoreResult<T>
where
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("{column}: {e}")))
}

fn wallet_from_row(row: &PgRow) -> StoreResult<Wallet> {
    Ok(Wallet {
        user_id: row.try_get("user_id")?,
        balance: row.try_get("balance")?,
        locked_balance: row.try_get("locked_balance")?,
        currency: row.try_get("currency")?,
        version: row.try_get("version")?,
        last_updated: row.try_get::<DateTime<Utc>, _>("last_updated")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> StoreResult<Transaction> {
    Ok(Transaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        direction: parse_column(row, "direction")?,
        amount: row.try_get("amount")?,
        description: row.try_get("description")?,
        category: parse_column(row, "category")?,
        balance_before: row.try_get("balance_before")?,
        balance_after: row.try_get("balance_after")?,
        status: TransactionStatus::Completed,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn game_from_row(row: &PgRow) -> StoreResult<Game> {
    Ok(Game {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        game_type: parse_column(row, "game_type")?,
        bet_amount: row.try_get("bet_amount")?,
        win_amount: row.try_get("win_amount")?,
        multiplier: row.try_get("multiplier")?,
        result_data: row
            .try_get::<Option<Json<ResultData>>, _>("result_data")?
            .map(|json| json.0),
        settled: row.try_get("settled")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn request_from_row(row: &PgRow) -> StoreResult<PaymentRequest> {
    Ok(PaymentRequest {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        amount: row.try_get("amount")?,
        payment_method: parse_column(row, "payment_method")?,
        transaction_ref: row.try_get("transaction_ref")?,
        proof_url: row.try_get("proof_url")?,
        notes: row.try_get("notes")?,
        status: parse_column(row, "status")?,
        admin_notes: row.try_get("admin_notes")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl LedgerTx for PgTx {
    async fn lock_wallet(&mut self, user_id: &str) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn lock_or_create_wallet(&mut self, user_id: &str, currency: &str) -> StoreResult<Wallet> {
        // A concurrent creator makes this a no-op; the lock below then waits for it
        sqlx::query(
            "INSERT INTO wallets (user_id, currency) VALUES ($1, $2)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(currency)
        .execute(&mut *self.tx)
        .await?;

        self.lock_wallet(user_id)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("wallet {user_id} vanished after insert")))
    }

    async fn put_wallet(&mut self, wallet: &Wallet) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE wallets
             SET balance = $2, locked_balance = $3, version = version + 1, last_updated = $4
             WHERE user_id = $1 AND version = $5",
        )
        .bind(&wallet.user_id)
        .bind(wallet.balance)
        .bind(wallet.locked_balance)
        .bind(wallet.last_updated)
        .bind(wallet.version)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(())
    }

    async fn append_transaction(&mut self, transaction: &Transaction) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, user_id, direction, amount, description, category,
                                      balance_before, balance_after, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.user_id)
        .bind(transaction.direction.to_string())
        .bind(transaction.amount)
        .bind(&transaction.description)
        .bind(transaction.category.to_string())
        .bind(transaction.balance_before)
        .bind(transaction.balance_after)
        .bind(transaction.status.to_string())
        .bind(transaction.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_game(&mut self, game: &Game) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO games (id, user_id, game_type, bet_amount, win_amount, multiplier,
                               result_data, settled, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&game.id)
        .bind(&game.user_id)
        .bind(game.game_type.as_str())
        .bind(game.bet_amount)
        .bind(game.win_amount)
        .bind(game.multiplier)
        .bind(game.result_data.as_ref().map(Json))
        .bind(game.settled)
        .bind(game.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn bump_user_stats(&mut self, user_id: &str, delta: &StatsDelta) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_stats (user_id, total_games_played, total_wagered, total_won)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                total_games_played = user_stats.total_games_played + EXCLUDED.total_games_played,
                total_wagered = user_stats.total_wagered + EXCLUDED.total_wagered,
                total_won = user_stats.total_won + EXCLUDED.total_won
            "#,
        )
        .bind(user_id)
        .bind(delta.games_played)
        .bind(delta.wagered)
        .bind(delta.won)
        .execute(&mut *self.tx)
        .await
        .map_err(|err| {
            if is_numeric_overflow(&err) {
                StoreError::Overflow(delta.wagered)
            } else {
                err.into()
            }
        })?;
        Ok(())
    }

    async fn lock_payment_request(&mut self, id: &str) -> StoreResult<Option<PaymentRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM payment_requests WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn insert_payment_request(&mut self, request: &PaymentRequest) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO payment_requests (id, user_id, amount, payment_method, transaction_ref,
                                          proof_url, notes, status, admin_notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&request.id)
        .bind(&request.user_id)
        .bind(request.amount)
        .bind(request.payment_method.to_string())
        .bind(&request.transaction_ref)
        .bind(&request.proof_url)
        .bind(&request.notes)
        .bind(request.status.to_string())
        .bind(&request.admin_notes)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_payment_request(&mut self, request: &PaymentRequest) -> StoreResult<()> {
        sqlx::query(
            "UPDATE payment_requests SET status = $2, admin_notes = $3, updated_at = $4
             WHERE id = $1",
        )
        .bind(&request.id)
        .bind(request.status.to_string())
        .bind(&request.admin_notes)
        .bind(request.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> StoreResult<PgTx> {
        Ok(PgTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn wallet(&self, user_id: &str) -> StoreResult<Option<Wallet>> {
        let row = sqlx::query(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(wallet_from_row).transpose()
    }

    async fn ensure_wallet(&self, user_id: &str, currency: &str) -> StoreResult<Wallet> {
        sqlx::query(
            "INSERT INTO wallets (user_id, currency) VALUES ($1, $2)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(currency)
        .execute(&self.pool)
        .await?;

        self.wallet(user_id)
            .await?
            .ok_or_else(|| StoreError::Backend(format!("wallet {user_id} vanished after insert")))
    }

    async fn transactions(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions
             WHERE user_id = $1
             ORDER BY seq DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(transaction_from_row).collect()
    }

    async fn games(&self, filter: &GameFilter) -> StoreResult<Vec<Game>> {
        let rows = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games
             WHERE ($1::TEXT IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR game_type = $2)
             ORDER BY seq DESC
             LIMIT $3"
        ))
        .bind(filter.user_id.as_deref())
        .bind(filter.game_type.map(|t| t.as_str()))
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(game_from_row).collect()
    }

    async fn game_stats(&self, filter: &GameFilter) -> StoreResult<Vec<GameTypeStats>> {
        let rows = sqlx::query(
            r#"
            SELECT game_type,
                   COUNT(*) AS total_games,
                   COALESCE(SUM(bet_amount), 0) AS total_wagered,
                   COALESCE(SUM(win_amount), 0) AS total_won,
                   COALESCE(MAX(win_amount), 0) AS biggest_win,
                   MAX(created_at) AS last_played
            FROM games
            WHERE ($1::TEXT IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR game_type = $2)
            GROUP BY game_type
            ORDER BY game_type
            "#,
        )
        .bind(filter.user_id.as_deref())
        .bind(filter.game_type.map(|t| t.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(GameTypeStats {
                    game_type: parse_column(row, "game_type")?,
                    total_games: row.try_get("total_games")?,
                    total_wagered: row.try_get::<Decimal, _>("total_wagered")?,
                    total_won: row.try_get::<Decimal, _>("total_won")?,
                    biggest_win: row.try_get::<Decimal, _>("biggest_win")?,
                    last_played: row.try_get::<DateTime<Utc>, _>("last_played")?,
                })
            })
            .collect()
    }

    async fn payment_request(&self, id: &str) -> StoreResult<Option<PaymentRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM payment_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn payment_requests(
        &self,
        filter: &PaymentRequestFilter,
    ) -> StoreResult<Vec<PaymentRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM payment_requests
             WHERE ($1::TEXT IS NULL OR user_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.user_id.as_deref())
        .bind(filter.status.map(|s| s.to_string()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(request_from_row).collect()
    }

    async fn user_stats(&self, user_id: &str) -> StoreResult<Option<UserStats>> {
        let row = sqlx::query(
            "SELECT user_id, total_games_played, total_wagered, total_won
             FROM user_stats WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(UserStats {
                user_id: row.try_get("user_id")?,
                total_games_played: row.try_get("total_games_played")?,
                total_wagered: row.try_get("total_wagered")?,
                total_won: row.try_get("total_won")?,
            })
        })
        .transpose()
    }

    async fn game_settings(&self, game_type: GameType) -> StoreResult<Option<GameSettings>> {
        let row = sqlx::query("SELECT settings FROM game_settings WHERE game_type = $1")
            .bind(game_type.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Ok(row.try_get::<Json<GameSettings>, _>("settings")?.0))
            .transpose()
    }

    async fn all_game_settings(&self) -> StoreResult<Vec<GameSettings>> {
        let rows = sqlx::query("SELECT settings FROM game_settings ORDER BY game_type")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Ok(row.try_get::<Json<GameSettings>, _>("settings")?.0))
            .collect()
    }

    async fn put_game_settings(&self, settings: &GameSettings) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO game_settings (game_type, settings) VALUES ($1, $2)
             ON CONFLICT (game_type) DO UPDATE SET settings = EXCLUDED.settings",
        )
        .bind(settings.game_type.as_str())
        .bind(Json(settings))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_game_settings_if_absent(&self, settings: &GameSettings) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO game_settings (game_type, settings) VALUES ($1, $2)
             ON CONFLICT (game_type) DO NOTHING",
        )
        .bind(settings.game_type.as_str())
        .bind(Json(settings))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn payment_details(&self) -> StoreResult<Option<PaymentDetails>> {
        let row = sqlx::query("SELECT details FROM payment_details WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Ok(row.try_get::<Json<PaymentDetails>, _>("details")?.0))
            .transpose()
    }

    async fn put_payment_details(&self, details: &PaymentDetails) -> StoreResult<()> {
        let mut details = details.clone();
        details.updated_at = Utc::now();
        sqlx::query(
            "INSERT INTO payment_details (id, details) VALUES (1, $1)
             ON CONFLICT (id) DO UPDATE SET details = EXCLUDED.details",
        )
        .bind(Json(&details))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
