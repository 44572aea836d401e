//! Score normalization
//!
//! Turns an [`EngineScore`] into the pawn-unit evaluation reported to callers
//! and into a White win probability.

use tracing::error;

use crate::engine::{EngineScore, ScoreKind};
use crate::error::{AnalysisError, Result};

/// Pawn-unit evaluation reported for a forced mate
pub const MATE_EVALUATION: f64 = 999.0;

/// Centipawn scores are clamped to +-20 pawns before the logistic transform
pub const WIN_PROBABILITY_CLAMP_CP: i32 = 2000;

const WIN_PROBABILITY_SCALE: f64 = 0.004;

/// A score in the shape callers consume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    /// Pawns, or +-999 when a mate was found
    pub evaluation: f64,
    pub mate_in: Option<i32>,
}

pub fn normalize(score: &EngineScore) -> Result<Normalized> {
    match score.kind {
        ScoreKind::Centipawns => Ok(Normalized {
            evaluation: round_to(score.value as f64 / 100.0, 2),
            mate_in: None,
        }),
        ScoreKind::Mate => Ok(Normalized {
            evaluation: if score.value > 0 {
                MATE_EVALUATION
            } else {
                -MATE_EVALUATION
            },
            mate_in: Some(score.value),
        }),
        ScoreKind::Unrecognized(ref tag) => {
            error!("Unknown evaluation type '{}' from engine", tag);
            Err(AnalysisError::UnknownEvaluationKind(tag.clone()))
        }
    }
}

/// Probability in `[0, 1]` that White wins, at full precision
///
/// Mate scores are treated as certain regardless of distance.
pub fn win_probability(score: &EngineScore) -> Result<f64> {
    match score.kind {
        ScoreKind::Centipawns => Ok(cp_to_win_probability(score.value)),
        ScoreKind::Mate => Ok(if score.value > 0 { 1.0 } else { 0.0 }),
        ScoreKind::Unrecognized(ref tag) => {
            error!("Unknown evaluation type '{}' from engine", tag);
            Err(AnalysisError::UnknownEvaluationKind(tag.clone()))
        }
    }
}

/// Logistic curve over the clamped centipawn score
pub fn cp_to_win_probability(cp: i32) -> f64 {
    let clamped = cp.clamp(-WIN_PROBABILITY_CLAMP_CP, WIN_PROBABILITY_CLAMP_CP);
    let exp = (-WIN_PROBABILITY_SCALE * clamped as f64).exp();

    // Unreachable once clamped; kept so the transform never yields NaN
    if !exp.is_finite() {
        return if cp > 0 { 1.0 } else { 0.0 };
    }

    1.0 / (1.0 + exp)
}

/// Rounds half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
