//! Catalog routes
//!
//! Game spaces and games are reference data the session and pricing
//! services read. Creation is an upsert keyed by the generated id.
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/spaces | POST | Register a game space |
//! | /api/spaces/{id} | GET | Fetch one game space |
//! | /api/games | POST | Register a game with its pricing policy |
//! | /api/games/{id} | GET | Fetch one game |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use shared::models::{Game, GameCreate, GameSpace};
use shared::util::snowflake_id;
use shared::{ApiError, ApiResponse, ApiResult};

use crate::core::ServerState;
use crate::store::SessionStore;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/spaces", post(create_space))
        .route("/api/spaces/{id}", get(get_space))
        .route("/api/games", post(create_game))
        .route("/api/games/{id}", get(get_game))
}

#[derive(Debug, Deserialize)]
pub struct SpaceCreate {
    pub label: String,
}

pub async fn create_space(
    State(state): State<ServerState>,
    Json(payload): Json<SpaceCreate>,
) -> ApiResult<Json<ApiResponse<GameSpace>>> {
    if payload.label.trim().is_empty() {
        return Err(ApiError::validation("Space label must not be empty"));
    }
    let space = GameSpace {
        id: format!("SP-{}", snowflake_id()),
        label: payload.label,
        occupied: false,
    };
    state.store.upsert_space(space.clone()).await?;
    Ok(Json(ApiResponse::ok(space)))
}

pub async fn get_space(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<GameSpace>>> {
    let space = state
        .store
        .get_space(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("game space {}", id)))?;
    Ok(Json(ApiResponse::ok(space)))
}

pub async fn create_game(
    State(state): State<ServerState>,
    Json(payload): Json<GameCreate>,
) -> ApiResult<Json<ApiResponse<Game>>> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::validation("Game name must not be empty"));
    }
    let game = Game {
        id: format!("G-{}", snowflake_id()),
        name: payload.name,
        policy: payload.policy,
    };
    state.store.upsert_game(game.clone()).await?;
    Ok(Json(ApiResponse::ok(game)))
}

pub async fn get_game(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Game>>> {
    let game = state
        .store
        .get_game(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("game {}", id)))?;
    Ok(Json(ApiResponse::ok(game)))
}
