//! Engine configuration endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use stockfish_server_core::NumericParam;

use super::{ensure_engine, run_blocking};
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SkillRequest {
    /// Skill level, 0-20
    pub level: Option<NumericParam>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /set_skill
///
/// Out-of-range or non-numeric levels are rejected with 400; nothing is
/// changed on the engine in that case.
pub async fn set_skill(
    State(state): State<Arc<AppState>>,
    payload: Result<JsonBody<SkillRequest>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    ensure_engine(&state)?;
    let JsonBody(req) = payload?;
    let level = req
        .level
        .ok_or_else(|| ApiError::bad_request("Skill level not provided"))?;

    let level = run_blocking(&state, move |session| session.set_skill_level(&level)).await?;
    Ok(Json(MessageResponse {
        message: format!("Skill level set to {}", level),
    }))
}
