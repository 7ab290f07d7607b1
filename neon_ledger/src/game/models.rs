//! Game data models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LedgerError;
use crate::wallet::{Amount, UserId};

/// Supported game types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Aviation,
    Spinwheel,
    Slot,
    Mines,
    Plinko,
    Dice,
    Limbo,
    Hilo,
    Blackjack,
}

impl GameType {
    pub const ALL: [GameType; 9] = [
        GameType::Aviation,
        GameType::Spinwheel,
        GameType::Slot,
        GameType::Mines,
        GameType::Plinko,
        GameType::Dice,
        GameType::Limbo,
        GameType::Hilo,
        GameType::Blackjack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Aviation => "aviation",
            GameType::Spinwheel => "spinwheel",
            GameType::Slot => "slot",
            GameType::Mines => "mines",
            GameType::Plinko => "plinko",
            GameType::Dice => "dice",
            GameType::Limbo => "limbo",
            GameType::Hilo => "hilo",
            GameType::Blackjack => "blackjack",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameType::ALL
            .into_iter()
            .find(|game_type| game_type.as_str() == s)
            .ok_or_else(|| LedgerError::InvalidGameType(s.to_string()))
    }
}

/// Opaque game-specific result payload
pub type ResultData = serde_json::Map<String, serde_json::Value>;

/// Settled game model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub user_id: UserId,
    pub game_type: GameType,
    pub bet_amount: Amount,
    pub win_amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_data: Option<ResultData>,
    pub settled: bool,
    pub created_at: DateTime<Utc>,
}

/// Generate a unique, time-ordered game id
pub fn new_game_id() -> String {
    format!("game_{}", Uuid::now_v7().simple())
}

/// Game outcome computed by the game logic, as received from the caller.
///
/// The game type stays a raw string so an unknown type is reported as
/// `InvalidGameType` rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcome {
    pub game_type: String,
    pub bet_amount: Amount,
    #[serde(default)]
    pub win_amount: Amount,
    #[serde(default)]
    pub multiplier: Option<Decimal>,
    #[serde(default)]
    pub result_data: Option<serde_json::Value>,
}

/// Per-user running counters maintained by settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: UserId,
    pub total_games_played: i64,
    pub total_wagered: Amount,
    /// Net winnings (wins minus bets); negative when the user is down.
    pub total_won: Amount,
}

impl UserStats {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_games_played: 0,
            total_wagered: Decimal::ZERO,
            total_won: Decimal::ZERO,
        }
    }

    /// Counters after applying `delta`, or `None` if any of them overflows
    pub fn checked_apply(&self, delta: &StatsDelta) -> Option<UserStats> {
        Some(UserStats {
            user_id: self.user_id.clone(),
            total_games_played: self.total_games_played.checked_add(delta.games_played)?,
            total_wagered: self.total_wagered.checked_add(delta.wagered)?,
            total_won: self.total_won.checked_add(delta.won)?,
        })
    }
}

/// Increment applied to `UserStats` by one settlement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsDelta {
    pub games_played: i64,
    pub wagered: Amount,
    pub won: Amount,
}

impl StatsDelta {
    /// Delta for a single settled game
    pub fn for_game(bet_amount: Amount, win_amount: Amount) -> Self {
        Self {
            games_played: 1,
            wagered: bet_amount,
            won: win_amount - bet_amount,
        }
    }

    /// Sum of two deltas, or `None` on overflow
    pub fn checked_merge(&self, other: &StatsDelta) -> Option<StatsDelta> {
        Some(StatsDelta {
            games_played: self.games_played.checked_add(other.games_played)?,
            wagered: self.wagered.checked_add(other.wagered)?,
            won: self.won.checked_add(other.won)?,
        })
    }
}

/// Filter for game history queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameFilter {
    pub user_id: Option<UserId>,
    pub game_type: Option<GameType>,
    pub limit: Option<i64>,
}

impl GameFilter {
    pub fn matches(&self, game: &Game) -> bool {
        self.user_id.as_ref().is_none_or(|id| *id == game.user_id)
            && self.game_type.is_none_or(|t| t == game.game_type)
    }
}

/// Aggregate over games of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTypeStats {
    pub game_type: GameType,
    pub total_games: i64,
    pub total_wagered: Amount,
    /// Gross winnings paid out
    pub total_won: Amount,
    pub biggest_win: Amount,
    pub last_played: DateTime<Utc>,
}

/// Aggregate over all matched games, with the per-type breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub total_games: i64,
    pub total_wagered: Amount,
    pub total_won: Amount,
    pub biggest_win: Amount,
    pub by_game_type: Vec<GameTypeStats>,
}

impl GameStats {
    /// Fold per-type rows into overall totals
    pub fn from_breakdown(mut by_game_type: Vec<GameTypeStats>) -> Self {
        by_game_type.sort_by_key(|row| row.game_type);

        let mut stats = GameStats {
            total_games: 0,
            total_wagered: Decimal::ZERO,
            total_won: Decimal::ZERO,
            biggest_win: Decimal::ZERO,
            by_game_type: Vec::new(),
        };
        // Reporting only; saturate rather than fail the query
        for row in &by_game_type {
            stats.total_games = stats.total_games.saturating_add(row.total_games);
            stats.total_wagered = stats.total_wagered.saturating_add(row.total_wagered);
            stats.total_won = stats.total_won.saturating_add(row.total_won);
            stats.biggest_win = stats.biggest_win.max(row.biggest_win);
        }
        stats.by_game_type = by_game_type;
        stats
    }
}
