use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use stockfish_server_core::AnalysisError;

use crate::error::ApiError;
use crate::{AppState, SharedSession};

pub mod analysis;
pub mod engine;

pub async fn index(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    if state.session.is_available() {
        (
            StatusCode::OK,
            format!("Stockfish UCI server running. Engine: {}", state.engine_path),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Stockfish UCI server failed to initialize engine.".to_string(),
        )
    }
}

/// Fails fast when the engine never started, before the body is looked at
fn ensure_engine(state: &AppState) -> Result<(), ApiError> {
    if state.session.is_available() {
        Ok(())
    } else {
        Err(AnalysisError::EngineUnavailable.into())
    }
}

/// Runs a session operation on the blocking pool
///
/// Engine queries block on the engine's stdout and may queue behind other
/// requests on the session lock.
async fn run_blocking<T, F>(state: &Arc<AppState>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SharedSession) -> stockfish_server_core::Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || op(&state.session)).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!("Engine task failed: {}", e);
            Err(ApiError::internal(format!("Engine task failed: {}", e)))
        }
    }
}
