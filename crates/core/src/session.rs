//! Analysis session controller
//!
//! Owns the single engine the service talks to. The engine is stateful
//! (loaded position, search depth) and cannot run two queries at once, so
//! every operation holds the session lock for its whole duration.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, TryLockError};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::engine::{Engine, EngineScore, TopMove};
use crate::error::{AnalysisError, EngineError, Result};
use crate::params::{self, NumericParam};
use crate::score;

/// What to do with a request that arrives while the engine is busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Wait for the engine, requests are served one at a time
    #[default]
    Queue,
    /// Fail fast with [`AnalysisError::Busy`]
    Reject,
}

impl FromStr for QueuePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "queue" => Ok(QueuePolicy::Queue),
            "reject" => Ok(QueuePolicy::Reject),
            other => Err(format!("unknown queue policy '{}'", other)),
        }
    }
}

impl fmt::Display for QueuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueuePolicy::Queue => write!(f, "queue"),
            QueuePolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Result of a full position analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub fen: String,
    pub success: bool,
    /// Pawns from White's view; +-999 when `mate_in` is set
    #[serde(rename = "evaluation")]
    pub evaluation_pawns: Option<f64>,
    #[serde(rename = "mate")]
    pub mate_in: Option<i32>,
    #[serde(rename = "bestmove")]
    pub best_move: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn failure(fen: impl Into<String>, error: &AnalysisError) -> Self {
        Self {
            fen: fen.into(),
            success: false,
            evaluation_pawns: None,
            mate_in: None,
            best_move: None,
            continuation: None,
            error: Some(error.to_string()),
        }
    }
}

/// Search depth override that is undone when dropped
///
/// Restoring in `Drop` covers every exit path of an analysis, including
/// early returns through `?`.
struct DepthOverride<'a, E: Engine + ?Sized> {
    engine: &'a mut E,
    original: u32,
}

impl<'a, E: Engine + ?Sized> DepthOverride<'a, E> {
    fn apply(engine: &'a mut E, depth: u32) -> Self {
        let original = engine.depth();
        engine.set_depth(depth);
        Self { engine, original }
    }
}

impl<E: Engine + ?Sized> Deref for DepthOverride<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine
    }
}

impl<E: Engine + ?Sized> DerefMut for DepthOverride<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine
    }
}

impl<E: Engine + ?Sized> Drop for DepthOverride<'_, E> {
    fn drop(&mut self) {
        self.engine.set_depth(self.original);
    }
}

/// The process-wide engine session
pub struct AnalysisSession<E> {
    /// `None` when the engine failed to start
    engine: Option<Mutex<E>>,
    policy: QueuePolicy,
}

impl<E: Engine> AnalysisSession<E> {
    pub fn new(engine: E, policy: QueuePolicy) -> Self {
        Self {
            engine: Some(Mutex::new(engine)),
            policy,
        }
    }

    /// A session whose engine never came up; every operation fails with
    /// [`AnalysisError::EngineUnavailable`]
    pub fn unavailable(policy: QueuePolicy) -> Self {
        Self {
            engine: None,
            policy,
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some()
    }

    fn lock(&self) -> Result<MutexGuard<'_, E>> {
        let engine = self
            .engine
            .as_ref()
            .ok_or(AnalysisError::EngineUnavailable)?;

        match self.policy {
            QueuePolicy::Queue => engine
                .lock()
                .map_err(|_| AnalysisError::from(EngineError::Poisoned)),
            QueuePolicy::Reject => engine.try_lock().map_err(|e| match e {
                TryLockError::WouldBlock => AnalysisError::Busy,
                TryLockError::Poisoned(_) => AnalysisError::from(EngineError::Poisoned),
            }),
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(AnalysisError::EngineUnavailable)
        }
    }

    /// Depth the engine is currently configured with
    pub fn current_depth(&self) -> Result<u32> {
        Ok(self.lock()?.depth())
    }

    /// Evaluates `fen` and finds the best move, optionally at a
    /// caller-chosen depth. The session's depth is the same before and
    /// after the call, whatever the outcome.
    pub fn analyze(&self, fen: &str, depth: Option<&NumericParam>) -> Result<AnalysisResult> {
        let mut engine = self.lock()?;
        let original_depth = engine.depth();
        let effective_depth = params::resolve_depth(depth, original_depth);
        let mut engine = DepthOverride::apply(&mut *engine, effective_depth);

        let result = analyze_position(&mut *engine, fen, effective_depth);
        if let Err(AnalysisError::EngineFailure(ref e)) = result {
            error!("Error during analysis for FEN {}: {}", fen, e);
        }
        result
    }

    pub fn best_move(&self, fen: &str) -> Result<Option<String>> {
        let mut engine = self.lock()?;
        load_position(&mut *engine, fen)?;
        Ok(engine.best_move()?.map(|best| best.uci))
    }

    /// Raw engine evaluation, White-relative
    pub fn evaluation(&self, fen: &str) -> Result<EngineScore> {
        let mut engine = self.lock()?;
        load_position(&mut *engine, fen)?;
        Ok(engine.evaluation()?)
    }

    /// Probability that White wins, at full precision
    pub fn win_chance(&self, fen: &str) -> Result<f64> {
        let score = self.evaluation(fen)?;
        score::win_probability(&score)
    }

    pub fn is_move_legal(&self, fen: &str, mv: &str) -> Result<bool> {
        let mut engine = self.lock()?;
        load_position(&mut *engine, fen)?;
        Ok(engine.is_move_correct(mv)?)
    }

    pub fn top_moves(&self, fen: &str, n: Option<&NumericParam>) -> Result<Vec<TopMove>> {
        self.ensure_available()?;
        let count = params::resolve_top_move_count(n)?;

        let mut engine = self.lock()?;
        load_position(&mut *engine, fen)?;
        Ok(engine.top_moves(count)?)
    }

    /// Validates and applies a skill level. Unlike depth, an invalid level
    /// is rejected rather than ignored.
    pub fn set_skill_level(&self, level: &NumericParam) -> Result<u8> {
        self.ensure_available()?;
        let level = params::validate_skill_level(level)?;

        let mut engine = self.lock()?;
        engine.set_skill_level(level)?;
        info!("Skill level set to {}", level);
        Ok(level)
    }
}

/// Validates `fen` and loads it into the engine
fn load_position<E: Engine + ?Sized>(engine: &mut E, fen: &str) -> Result<()> {
    if fen.trim().is_empty() || !engine.is_fen_valid(fen)? {
        warn!("Invalid FEN string provided: {}", fen);
        return Err(AnalysisError::InvalidFen);
    }
    engine.set_fen_position(fen)?;
    Ok(())
}

fn analyze_position<E: Engine + ?Sized>(engine: &mut E, fen: &str, depth: u32) -> Result<AnalysisResult> {
    load_position(engine, fen)?;

    let evaluation = engine.evaluation()?;
    let best = engine.best_move()?.ok_or_else(|| {
        warn!("Engine returned no best move for FEN: {}", fen);
        AnalysisError::NoMoveFound
    })?;
    let normalized = score::normalize(&evaluation)?;

    info!(
        "Analyzed FEN: {}, Depth: {}, Eval: {}, Best Move: {}",
        fen, depth, evaluation, best.uci
    );

    Ok(AnalysisResult {
        fen: fen.to_string(),
        success: true,
        evaluation_pawns: Some(normalized.evaluation),
        mate_in: normalized.mate_in,
        continuation: Some(best.continuation()),
        best_move: Some(best.uci),
        error: None,
    })
}
