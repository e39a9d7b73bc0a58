//! Session routes
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /api/sessions | POST | Open a session on a free space |
//! | /api/sessions/{space_id}/close | POST | Close the open session and bill it |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::Deserialize;
use shared::models::{Invoice, SessionOpen, SessionOpened};
use shared::{ApiResponse, ApiResult, ExecutionContext};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/{space_id}/close", post(close_session))
}

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub space_id: String,
    pub game_id: String,
    /// Attendant opening the session, defaults to the system actor
    #[serde(default)]
    pub operator: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CloseSessionRequest {
    #[serde(default)]
    pub operator: Option<String>,
}

fn context_for(operator: Option<String>) -> ExecutionContext {
    match operator {
        Some(actor) => ExecutionContext::operator(actor),
        None => ExecutionContext::system(),
    }
}

pub async fn open_session(
    State(state): State<ServerState>,
    Json(payload): Json<OpenSessionRequest>,
) -> ApiResult<Json<ApiResponse<SessionOpened>>> {
    let ctx = context_for(payload.operator);
    let opened = state
        .sessions
        .open_session(
            &ctx,
            SessionOpen {
                space_id: payload.space_id,
                game_id: payload.game_id,
            },
        )
        .await?;
    Ok(Json(ApiResponse::ok(opened)))
}

pub async fn close_session(
    State(state): State<ServerState>,
    Path(space_id): Path<String>,
    payload: Option<Json<CloseSessionRequest>>,
) -> ApiResult<Json<ApiResponse<Invoice>>> {
    let ctx = context_for(payload.and_then(|Json(p)| p.operator));
    let invoice = state.sessions.close_session(&ctx, &space_id).await?;
    Ok(Json(ApiResponse::ok(invoice)))
}
