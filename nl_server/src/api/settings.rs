//! Game settings catalog handlers.

use axum::{
    Json,
    extract::{Extension, Path, State},
};
use neon_ledger::game::{GameSettings, GameSettingsUpdate, GameType};
use neon_ledger::{LedgerStore, Principal};

use super::AppState;
use super::error::ApiResult;

/// Every game's settings (public)
pub async fn list_settings<S: LedgerStore>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<Vec<GameSettings>>> {
    Ok(Json(state.ledger.settings.list().await?))
}

/// One game's settings (public)
pub async fn get_settings<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Path(game_type): Path<String>,
) -> ApiResult<Json<GameSettings>> {
    let game_type: GameType = game_type.parse()?;
    Ok(Json(state.ledger.settings.get(game_type).await?))
}

/// Replace one game's settings (admin)
pub async fn update_settings<S: LedgerStore>(
    State(state): State<AppState<S>>,
    Extension(admin): Extension<Principal>,
    Path(game_type): Path<String>,
    Json(update): Json<GameSettingsUpdate>,
) -> ApiResult<Json<GameSettings>> {
    let game_type: GameType = game_type.parse()?;
    let settings = state
        .ledger
        .settings
        .update(game_type, update, &admin)
        .await?;
    Ok(Json(settings))
}
