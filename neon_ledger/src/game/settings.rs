//! Per-game settings catalog.
//!
//! Settings describe the table limits and tuning the game clients use. They
//! are advisory: settlement validates outcomes on their own terms and never
//! consults this catalog.

use chrono::{DateTime, Utc};
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::models::GameType;
use crate::auth::Principal;
use crate::errors::{LedgerError, LedgerResult};
use crate::store::LedgerStore;
use crate::wallet::Amount;

/// Author recorded on built-in defaults
pub const SYSTEM_AUTHOR: &str = "system";

/// Crash probability buckets for aviation, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashChances {
    /// 1.01x to 3x
    pub low: f64,
    /// 3x to 5x
    pub medium: f64,
    /// 5x to 10x
    pub high: f64,
    /// 10x and above
    pub very_high: f64,
}

/// Game-specific tuning, one variant per game type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "game", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum GameConfig {
    Aviation {
        min_multiplier: f64,
        max_multiplier: f64,
        crash_chances: CrashChances,
    },
    SpinWheel {
        multipliers: Vec<f64>,
    },
    Slot {
        symbols: Vec<String>,
        multipliers: BTreeMap<String, f64>,
    },
    Mines {
        grid_size: u32,
        min_mines: u32,
        max_mines: u32,
        default_mines: u32,
        multiplier_base: f64,
    },
    Plinko {
        rows: u32,
        multipliers_low: Vec<f64>,
        multipliers_medium: Vec<f64>,
        multipliers_high: Vec<f64>,
    },
    Dice {
        min_target: f64,
        max_target: f64,
        house_edge: f64,
    },
    Limbo {
        min_multiplier: f64,
        max_multiplier: f64,
        house_edge: f64,
    },
    HiLo {
        multiplier_per_win: f64,
        max_streak: u32,
    },
    Blackjack {
        num_decks: u32,
        blackjack_payout: f64,
        win_payout: f64,
        dealer_hits_soft_17: bool,
        allow_double_down: bool,
        allow_split: bool,
    },
}

impl GameConfig {
    /// Game this configuration belongs to
    pub fn game_type(&self) -> GameType {
        match self {
            GameConfig::Aviation { .. } => GameType::Aviation,
            GameConfig::SpinWheel { .. } => GameType::Spinwheel,
            GameConfig::Slot { .. } => GameType::Slot,
            GameConfig::Mines { .. } => GameType::Mines,
            GameConfig::Plinko { .. } => GameType::Plinko,
            GameConfig::Dice { .. } => GameType::Dice,
            GameConfig::Limbo { .. } => GameType::Limbo,
            GameConfig::HiLo { .. } => GameType::Hilo,
            GameConfig::Blackjack { .. } => GameType::Blackjack,
        }
    }

    /// Built-in tuning for a game
    pub fn default_for(game_type: GameType) -> Self {
        match game_type {
            GameType::Aviation => GameConfig::Aviation {
                min_multiplier: 1.01,
                max_multiplier: 50.0,
                crash_chances: CrashChances {
                    low: 50.0,
                    medium: 30.0,
                    high: 15.0,
                    very_high: 5.0,
                },
            },
            GameType::Spinwheel => GameConfig::SpinWheel {
                multipliers: vec![1.2, 1.5, 2.0, 0.0, 1.8, 0.5, 3.0, 0.0],
            },
            GameType::Slot => {
                let paytable = [
                    ("7️⃣", 100.0),
                    ("💎", 50.0),
                    ("⭐", 20.0),
                    ("🍇", 10.0),
                    ("🍊", 5.0),
                    ("🍋", 3.0),
                    ("🍒", 2.0),
                ];
                GameConfig::Slot {
                    symbols: ["🍒", "🍋", "🍊", "🍇", "💎", "⭐", "7️⃣"]
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    multipliers: paytable
                        .into_iter()
                        .map(|(symbol, m)| (symbol.to_string(), m))
                        .collect(),
                }
            }
            GameType::Mines => GameConfig::Mines {
                grid_size: 5,
                min_mines: 3,
                max_mines: 10,
                default_mines: 5,
                multiplier_base: 0.5,
            },
            GameType::Plinko => GameConfig::Plinko {
                rows: 12,
                multipliers_low: vec![1.5, 1.3, 1.1, 1.0, 0.5, 1.0, 1.1, 1.3, 1.5],
                multipliers_medium: vec![3.0, 1.6, 1.4, 1.1, 1.0, 0.5, 1.0, 1.1, 1.4, 1.6, 3.0],
                multipliers_high: vec![
                    10.0, 3.0, 1.6, 1.4, 1.1, 1.0, 0.2, 1.0, 1.1, 1.4, 1.6, 3.0, 10.0,
                ],
            },
            GameType::Dice => GameConfig::Dice {
                min_target: 1.0,
                max_target: 99.99,
                house_edge: 1.0,
            },
            GameType::Limbo => GameConfig::Limbo {
                min_multiplier: 1.01,
                max_multiplier: 1000.0,
                house_edge: 1.0,
            },
            GameType::Hilo => GameConfig::HiLo {
                multiplier_per_win: 1.5,
                max_streak: 10,
            },
            GameType::Blackjack => GameConfig::Blackjack {
                num_decks: 6,
                blackjack_payout: 2.5,
                win_payout: 2.0,
                dealer_hits_soft_17: true,
                allow_double_down: true,
                allow_split: true,
            },
        }
    }
}

/// Stored settings for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub game_type: GameType,
    pub display_name: String,
    pub enabled: bool,
    pub min_bet: Amount,
    pub max_bet: Amount,
    /// Percentage, e.g. 2.5 means 2.5%
    pub house_edge: Decimal,
    pub config: GameConfig,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl GameSettings {
    /// Built-in defaults for a game
    pub fn default_for(game_type: GameType) -> Self {
        let (display_name, max_bet, house_edge) = match game_type {
            GameType::Spinwheel => ("Spin Wheel", 10_000, Decimal::new(25, 1)),
            GameType::Aviation => ("Aviation", 10_000, Decimal::new(20, 1)),
            GameType::Slot => ("Slot Machine", 5_000, Decimal::new(30, 1)),
            GameType::Mines => ("Mines", 10_000, Decimal::new(20, 1)),
            GameType::Plinko => ("Plinko", 10_000, Decimal::new(25, 1)),
            GameType::Dice => ("Dice", 10_000, Decimal::new(10, 1)),
            GameType::Limbo => ("Limbo", 10_000, Decimal::new(10, 1)),
            GameType::Hilo => ("Hi-Lo", 10_000, Decimal::new(20, 1)),
            GameType::Blackjack => ("Blackjack", 10_000, Decimal::new(5, 1)),
        };

        Self {
            game_type,
            display_name: display_name.to_string(),
            enabled: true,
            min_bet: Decimal::from(10),
            max_bet: Decimal::from(max_bet),
            house_edge,
            config: GameConfig::default_for(game_type),
            updated_at: Utc::now(),
            updated_by: SYSTEM_AUTHOR.to_string(),
        }
    }

    /// Check limits and that the config matches the game
    pub fn validate(&self) -> LedgerResult<()> {
        if self.config.game_type() != self.game_type {
            return Err(LedgerError::InvalidSettings(format!(
                "config is for {}, not {}",
                self.config.game_type(),
                self.game_type
            )));
        }
        if self.min_bet <= Decimal::ZERO {
            return Err(LedgerError::InvalidSettings(
                "minBet must be positive".to_string(),
            ));
        }
        if self.min_bet > self.max_bet {
            return Err(LedgerError::InvalidSettings(format!(
                "minBet {} exceeds maxBet {}",
                self.min_bet, self.max_bet
            )));
        }
        if self.house_edge < Decimal::ZERO || self.house_edge >= Decimal::ONE_HUNDRED {
            return Err(LedgerError::InvalidSettings(format!(
                "houseEdge {} outside [0, 100)",
                self.house_edge
            )));
        }
        Ok(())
    }
}

/// Admin-supplied replacement for a game's settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettingsUpdate {
    pub display_name: String,
    pub enabled: bool,
    pub min_bet: Amount,
    pub max_bet: Amount,
    pub house_edge: Decimal,
    pub config: GameConfig,
}

/// Reads and administers the settings catalog
pub struct SettingsManager<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> Clone for SettingsManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LedgerStore> SettingsManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Settings for one game
    ///
    /// # Errors
    ///
    /// * `LedgerError::NotFound` - No settings stored for the game
    pub async fn get(&self, game_type: GameType) -> LedgerResult<GameSettings> {
        self.store
            .game_settings(game_type)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("game settings for {game_type}")))
    }

    /// Settings for every configured game, ordered by game type
    pub async fn list(&self) -> LedgerResult<Vec<GameSettings>> {
        let mut all = self.store.all_game_settings().await?;
        all.sort_by_key(|s| s.game_type);
        Ok(all)
    }

    /// Replace a game's settings
    ///
    /// # Errors
    ///
    /// * `LedgerError::Forbidden` - Caller is not an admin
    /// * `LedgerError::InvalidSettings` - Limits or config variant are wrong
    pub async fn update(
        &self,
        game_type: GameType,
        update: GameSettingsUpdate,
        admin: &Principal,
    ) -> LedgerResult<GameSettings> {
        admin.require_admin("updating game settings")?;

        let settings = GameSettings {
            game_type,
            display_name: update.display_name,
            enabled: update.enabled,
            min_bet: update.min_bet,
            max_bet: update.max_bet,
            house_edge: update.house_edge,
            config: update.config,
            updated_at: Utc::now(),
            updated_by: admin.user_id.clone(),
        };
        settings.validate()?;

        self.store.put_game_settings(&settings).await?;
        info!("Game settings for {} updated by {}", game_type, admin.user_id);
        Ok(settings)
    }

    /// Insert built-in defaults for every game that has no settings yet
    ///
    /// Returns the number of games that were initialised.
    pub async fn initialize_defaults(&self) -> LedgerResult<usize> {
        let mut inserted = 0;
        for game_type in GameType::ALL {
            let defaults = GameSettings::default_for(game_type);
            if self.store.insert_game_settings_if_absent(&defaults).await? {
                inserted += 1;
            }
        }
        if inserted > 0 {
            info!("Initialised default settings for {inserted} games");
        }
        Ok(inserted)
    }
}
