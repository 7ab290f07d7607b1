//! Game API handlers.
//!
//! `POST /game/play` settles an outcome computed by the game logic; the
//! remaining endpoints are read-only views over settled games.
//!
//! # Examples
//!
//! Settle a dice round:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/game/play \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"gameType": "dice", "betAmount": "20", "winAmount": "40", "multiplier": "2"}'
//! ```

use axum::{
    Json,
    extract::{Extension, Query, State},
};
use neon_ledger::game::{Game, GameOutcome, GameStats, GameType, Settlement, UserStats};
use neon_ledger::wallet::{Amount, EntryCategory, EntryDirection};
use neon_ledger::{LedgerStore, Principal};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::AppState;
use super::error::ApiResult;
use super::request_id::RequestId;
use super::wallet::{LimitQuery, clamp_limit};
use crate::logging::log_performance;
use crate::metrics;

/// Settled game plus the balance committed with it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    pub game: Game,
    pub balance: Amount,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub game_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GameTypeQuery {
    pub game_type: Option<String>,
}

fn parse_game_type(game_type: Option<&str>) -> ApiResult<Option<GameType>> {
    Ok(game_type.map(str::parse::<GameType>).transpose()?)
}

/// Settle a game outcome against the caller's wallet
///
/// # Errors
///
/// - `400 Bad Request`: invalid amounts, unknown game type or implausible result
/// - `402 Payment Required`: balance below the bet
/// - `404 Not Found`: caller has no wallet yet
pub async fn play<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    request_id: RequestId,
    Json(outcome): Json<GameOutcome>,
) -> ApiResult<Json<PlayResponse>> {
    let started = Instant::now();
    let Settlement { game, balance } = state
        .ledger
        .games
        .settle_with_balance(&principal.user_id, outcome)
        .await?;
    let elapsed = started.elapsed();

    let won = game.win_amount > Decimal::ZERO;
    metrics::games_settled_total(game.game_type.as_str(), won);
    metrics::settlement_duration_ms(elapsed.as_secs_f64() * 1000.0);
    metrics::ledger_mutations_total(EntryDirection::Debit, EntryCategory::GameLoss);
    if won {
        metrics::ledger_mutations_total(EntryDirection::Credit, EntryCategory::GameWin);
    }
    log_performance("settle", elapsed.as_millis() as u64, request_id.as_str());

    tracing::info!(
        request_id = %request_id.as_str(),
        user_id = %principal.user_id,
        game_id = %game.id,
        "Game settled"
    );

    Ok(Json(PlayResponse { game, balance }))
}

/// Caller's games, newest first
pub async fn history<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<Game>>> {
    let game_type = parse_game_type(query.game_type.as_deref())?;
    let games = state
        .ledger
        .games
        .history(&principal.user_id, game_type, clamp_limit(query.limit))
        .await?;
    Ok(Json(games))
}

/// Caller's aggregates grouped by game type
pub async fn stats<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<GameTypeQuery>,
) -> ApiResult<Json<GameStats>> {
    let game_type = parse_game_type(query.game_type.as_deref())?;
    let stats = state
        .ledger
        .games
        .stats(Some(&principal.user_id), game_type)
        .await?;
    Ok(Json(stats))
}

/// Latest games across all players (public)
pub async fn recent_bets<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<Game>>> {
    let games = state
        .ledger
        .games
        .recent_bets(clamp_limit(query.limit))
        .await?;
    Ok(Json(games))
}

/// Caller's running counters
pub async fn user_stats<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<UserStats>> {
    Ok(Json(
        state.ledger.games.user_stats(&principal.user_id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;

    #[test]
    fn test_parse_game_type() {
        assert_eq!(parse_game_type(None).unwrap(), None);
        assert_eq!(parse_game_type(Some("hilo")).unwrap(), Some(GameType::Hilo));
        let err = parse_game_type(Some("poker")).unwrap_err();
        assert!(matches!(err, ApiError::Ledger(_)));
        assert_eq!(err.kind(), "invalid_game_type");
    }
}
