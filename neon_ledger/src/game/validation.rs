//! Sanity checks applied to a game outcome before it touches the ledger.

use rust_decimal::Decimal;

use super::models::{GameOutcome, GameType, ResultData};
use crate::errors::{LedgerError, LedgerResult};
use crate::wallet::{Amount, in_amount_domain, positive_amount};

/// Highest multiplier a spin wheel segment can carry
pub const MAX_SPINWHEEL_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Slot payouts are capped at this many times the bet
pub const MAX_SLOT_PAYOUT_FACTOR: Decimal = Decimal::ONE_THOUSAND;

/// Decimal places kept for a multiplier (`NUMERIC(20, 8)`)
pub const MULTIPLIER_SCALE: u32 = 8;

/// Multipliers must stay below this magnitude to be stored exactly
pub const MULTIPLIER_LIMIT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Outcome that passed every check, with the game type resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOutcome {
    pub game_type: GameType,
    pub bet_amount: Amount,
    pub win_amount: Amount,
    pub multiplier: Option<Decimal>,
    pub result_data: Option<ResultData>,
}

/// Validate a caller-supplied outcome
///
/// # Errors
///
/// * `LedgerError::InvalidAmount` - Bet not positive, win negative, or either
///   outside the amount domain
/// * `LedgerError::InvalidGameType` - Unknown game
/// * `LedgerError::InvalidGameResult` - Outcome breaks a game rule, the
///   multiplier cannot be stored exactly, or `resultData` is not a JSON object
pub fn validate_outcome(outcome: GameOutcome) -> LedgerResult<ValidatedOutcome> {
    positive_amount(outcome.bet_amount)?;
    if outcome.win_amount < Decimal::ZERO || !in_amount_domain(outcome.win_amount) {
        return Err(LedgerError::InvalidAmount(outcome.win_amount));
    }

    let game_type: GameType = outcome.game_type.parse()?;
    if let Some(multiplier) = outcome.multiplier {
        if multiplier.normalize().scale() > MULTIPLIER_SCALE || multiplier.abs() >= MULTIPLIER_LIMIT
        {
            return Err(LedgerError::InvalidGameResult(format!(
                "multiplier {multiplier} cannot be stored exactly"
            )));
        }
    }
    check_game_rules(
        game_type,
        outcome.bet_amount,
        outcome.win_amount,
        outcome.multiplier,
    )?;

    let result_data = match outcome.result_data {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Object(map)) => Some(map),
        Some(_) => {
            return Err(LedgerError::InvalidGameResult(
                "resultData must be a JSON object".to_string(),
            ));
        }
    };

    Ok(ValidatedOutcome {
        game_type,
        bet_amount: outcome.bet_amount,
        win_amount: outcome.win_amount,
        multiplier: outcome.multiplier,
        result_data,
    })
}

/// Per-game rules; an absent multiplier counts as zero
fn check_game_rules(
    game_type: GameType,
    bet: Amount,
    win: Amount,
    multiplier: Option<Decimal>,
) -> LedgerResult<()> {
    let multiplier = multiplier.unwrap_or(Decimal::ZERO);

    match game_type {
        GameType::Spinwheel if multiplier > MAX_SPINWHEEL_MULTIPLIER => Err(
            LedgerError::InvalidGameResult(format!("spinwheel multiplier {multiplier} above 100")),
        ),
        GameType::Slot => {
            let cap = bet
                .checked_mul(MAX_SLOT_PAYOUT_FACTOR)
                .ok_or(LedgerError::InvalidAmount(bet))?;
            if win > cap {
                return Err(LedgerError::InvalidGameResult(format!(
                    "slot win {win} exceeds maximum payout {cap}"
                )));
            }
            Ok(())
        }
        GameType::Dice if win > Decimal::ZERO && multiplier > Decimal::ZERO => {
            let expected = bet
                .checked_mul(multiplier)
                .ok_or(LedgerError::InvalidAmount(bet))?;
            if win != expected {
                return Err(LedgerError::InvalidGameResult(format!(
                    "dice win {win} does not match bet x multiplier ({expected})"
                )));
            }
            Ok(())
        }
        GameType::Aviation if win > Decimal::ZERO && multiplier < Decimal::ONE => Err(
            LedgerError::InvalidGameResult(format!("aviation multiplier {multiplier} below 1.0")),
        ),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(game: &str, bet: i64, win: i64, multiplier: Option<Decimal>) -> GameOutcome {
        GameOutcome {
            game_type: game.to_string(),
            bet_amount: Decimal::from(bet),
            win_amount: Decimal::from(win),
            multiplier,
            result_data: None,
        }
    }

    #[test]
    fn test_amount_checks_come_first() {
        let err = validate_outcome(outcome("roulette", 0, 0, None)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let err = validate_outcome(outcome("dice", 10, -1, None)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }

    #[test]
    fn test_amounts_outside_storage_domain() {
        let mut o = outcome("mines", 10, 0, None);
        o.bet_amount = Decimal::new(100_005, 5);
        assert!(matches!(
            validate_outcome(o),
            Err(LedgerError::InvalidAmount(a)) if a == Decimal::new(100_005, 5)
        ));

        let mut o = outcome("mines", 10, 0, None);
        o.win_amount = Decimal::from(10_000_000_000_000_000i64);
        assert!(matches!(validate_outcome(o), Err(LedgerError::InvalidAmount(_))));

        // Trailing zeros are fine
        let mut o = outcome("mines", 10, 0, None);
        o.bet_amount = Decimal::new(1_000_000, 5);
        assert!(validate_outcome(o).is_ok());
    }

    #[test]
    fn test_multiplier_precision_limits() {
        assert_eq!(MULTIPLIER_LIMIT, Decimal::from(1_000_000_000_000i64));
        assert!(validate_outcome(outcome("limbo", 10, 0, Some(Decimal::new(123_456_789, 8)))).is_ok());
        assert!(matches!(
            validate_outcome(outcome("limbo", 10, 0, Some(Decimal::new(1, 9)))),
            Err(LedgerError::InvalidGameResult(_))
        ));
        assert!(matches!(
            validate_outcome(outcome("limbo", 10, 0, Some(MULTIPLIER_LIMIT))),
            Err(LedgerError::InvalidGameResult(_))
        ));
    }

    #[test]
    fn test_unknown_game_type() {
        let err = validate_outcome(outcome("roulette", 10, 0, None)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidGameType(t) if t == "roulette"));
    }

    #[test]
    fn test_spinwheel_multiplier_cap() {
        assert!(validate_outcome(outcome("spinwheel", 10, 1000, Some(Decimal::from(100)))).is_ok());
        let err =
            validate_outcome(outcome("spinwheel", 10, 0, Some(Decimal::new(1001, 1)))).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidGameResult(_)));
    }

    #[test]
    fn test_slot_payout_cap() {
        assert!(validate_outcome(outcome("slot", 2, 2000, None)).is_ok());
        assert!(validate_outcome(outcome("slot", 2, 2001, None)).is_err());
    }

    #[test]
    fn test_dice_exact_multiplier() {
        // 10 x 1.98 == 19.80 exactly in decimal arithmetic
        let mut ok = outcome("dice", 10, 0, Some(Decimal::new(198, 2)));
        ok.win_amount = Decimal::new(1980, 2);
        assert!(validate_outcome(ok).is_ok());

        let err = validate_outcome(outcome("dice", 10, 20, Some(Decimal::new(198, 2)))).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidGameResult(_)));

        // No multiplier: nothing to compare against
        assert!(validate_outcome(outcome("dice", 10, 20, None)).is_ok());
    }

    #[test]
    fn test_aviation_requires_multiplier_for_wins() {
        assert!(validate_outcome(outcome("aviation", 10, 0, None)).is_ok());
        assert!(validate_outcome(outcome("aviation", 10, 15, Some(Decimal::new(15, 1)))).is_ok());
        assert!(validate_outcome(outcome("aviation", 10, 15, None)).is_err());
        assert!(validate_outcome(outcome("aviation", 10, 5, Some(Decimal::new(5, 1)))).is_err());
    }

    #[test]
    fn test_unchecked_games_pass() {
        assert!(validate_outcome(outcome("mines", 10, 100_000, Some(Decimal::from(10_000)))).is_ok());
        assert!(validate_outcome(outcome("blackjack", 10, 25, None)).is_ok());
    }

    #[test]
    fn test_result_data_must_be_object() {
        let mut o = outcome("plinko", 10, 0, None);
        o.result_data = Some(json!({"path": [0, 1, 1, 0]}));
        let validated = validate_outcome(o).unwrap();
        assert!(validated.result_data.unwrap().contains_key("path"));

        let mut o = outcome("plinko", 10, 0, None);
        o.result_data = Some(json!([1, 2, 3]));
        assert!(matches!(
            validate_outcome(o),
            Err(LedgerError::InvalidGameResult(_))
        ));
    }
}
