//! Position analysis endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use stockfish_server_core::{score, AnalysisResult, EngineScore, NumericParam, TopMove};

use super::{ensure_engine, run_blocking};
use crate::error::ApiError;
use crate::extract::{non_empty_str, JsonBody};
use crate::AppState;

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub fen: Option<Value>,
    /// Optional depth override, 1-15
    pub depth: Option<NumericParam>,
}

#[derive(Debug, Deserialize)]
pub struct FenRequest {
    pub fen: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct MoveLegalRequest {
    pub fen: Option<Value>,
    #[serde(rename = "move")]
    pub mv: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TopMovesRequest {
    pub fen: Option<Value>,
    /// Number of candidates (default 3)
    pub n: Option<NumericParam>,
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Serialize)]
pub struct BestMoveResponse {
    pub best_move: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WinChanceResponse {
    pub white_win_chance: f64,
}

#[derive(Debug, Serialize)]
pub struct MoveLegalResponse {
    pub is_legal: bool,
}

#[derive(Debug, Serialize)]
pub struct TopMovesResponse {
    pub top_moves: Vec<TopMove>,
}

fn required_fen(fen: &Option<Value>) -> Result<String, ApiError> {
    non_empty_str(fen)
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("FEN not provided"))
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /analyze
///
/// Evaluation, mate distance and best move for `fen`, optionally at a
/// requested `depth`. Failures keep the `{fen, success, error}` shape.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<JsonBody<AnalyzeRequest>, ApiError>,
) -> Result<Json<AnalysisResult>, ApiError> {
    ensure_engine(&state).map_err(ApiError::in_analysis)?;
    let JsonBody(req) = payload.map_err(ApiError::in_analysis)?;

    let fen = non_empty_str(&req.fen)
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::bad_request("FEN string ('fen') not provided or not a string").in_analysis()
        })?;

    let depth = req.depth;
    let task_fen = fen.clone();
    let result = run_blocking(&state, move |session| session.analyze(&task_fen, depth.as_ref()))
        .await
        .map_err(|e| e.in_analysis().with_fen(fen))?;

    Ok(Json(result))
}

/// POST /move
pub async fn best_move(
    State(state): State<Arc<AppState>>,
    payload: Result<JsonBody<FenRequest>, ApiError>,
) -> Result<Json<BestMoveResponse>, ApiError> {
    ensure_engine(&state)?;
    let JsonBody(req) = payload?;
    let fen = required_fen(&req.fen)?;

    let best_move = run_blocking(&state, move |session| session.best_move(&fen)).await?;
    Ok(Json(BestMoveResponse { best_move }))
}

/// POST /evaluation
///
/// The engine's score as-is: `{"type": "cp" | "mate", "value": n}`.
pub async fn evaluation(
    State(state): State<Arc<AppState>>,
    payload: Result<JsonBody<FenRequest>, ApiError>,
) -> Result<Json<EngineScore>, ApiError> {
    ensure_engine(&state)?;
    let JsonBody(req) = payload?;
    let fen = required_fen(&req.fen)?;

    let score = run_blocking(&state, move |session| session.evaluation(&fen)).await?;
    Ok(Json(score))
}

/// POST /win_chance
pub async fn win_chance(
    State(state): State<Arc<AppState>>,
    payload: Result<JsonBody<FenRequest>, ApiError>,
) -> Result<Json<WinChanceResponse>, ApiError> {
    ensure_engine(&state)?;
    let JsonBody(req) = payload?;
    let fen = required_fen(&req.fen)?;

    let probability = run_blocking(&state, move |session| session.win_chance(&fen)).await?;
    Ok(Json(WinChanceResponse {
        white_win_chance: score::round_to(probability, 4),
    }))
}

/// POST /is_move_legal
pub async fn is_move_legal(
    State(state): State<Arc<AppState>>,
    payload: Result<JsonBody<MoveLegalRequest>, ApiError>,
) -> Result<Json<MoveLegalResponse>, ApiError> {
    ensure_engine(&state)?;
    let JsonBody(req) = payload?;

    let (Some(fen), Some(mv)) = (non_empty_str(&req.fen), non_empty_str(&req.mv)) else {
        return Err(ApiError::bad_request("FEN or move not provided"));
    };
    let (fen, mv) = (fen.to_string(), mv.to_string());

    let is_legal = run_blocking(&state, move |session| session.is_move_legal(&fen, &mv)).await?;
    Ok(Json(MoveLegalResponse { is_legal }))
}

/// POST /top_moves
pub async fn top_moves(
    State(state): State<Arc<AppState>>,
    payload: Result<JsonBody<TopMovesRequest>, ApiError>,
) -> Result<Json<TopMovesResponse>, ApiError> {
    ensure_engine(&state)?;
    let JsonBody(req) = payload?;
    let fen = required_fen(&req.fen)?;
    let n = req.n;

    let top_moves = run_blocking(&state, move |session| session.top_moves(&fen, n.as_ref())).await?;
    Ok(Json(TopMovesResponse { top_moves }))
}
