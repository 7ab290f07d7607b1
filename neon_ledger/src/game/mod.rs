//! Game settlement, history and the per-game settings catalog.
//!
//! Outcomes arrive already computed by the game logic. Settlement only checks
//! them against a few per-game bounds and applies them to the ledger in one
//! unit; fairness of the outcome itself is out of scope here.

pub mod manager;
pub mod models;
pub mod settings;
pub mod validation;

pub use manager::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_RECENT_BETS_LIMIT, GameManager, Settlement, settle_in,
};
pub use models::{
    Game, GameFilter, GameOutcome, GameStats, GameType, GameTypeStats, ResultData, StatsDelta,
    UserStats, new_game_id,
};
pub use settings::{CrashChances, GameConfig, GameSettings, GameSettingsUpdate, SettingsManager};
pub use validation::{ValidatedOutcome, validate_outcome};
