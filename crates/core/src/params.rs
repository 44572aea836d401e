//! Validation of caller-supplied numeric parameters
//!
//! Depth and skill level are deliberately validated differently: a bad
//! `depth` never fails a request, it silently falls back to the session's
//! current depth (with a warning in the log), while a bad skill level is a
//! hard client error. Callers rely on both behaviors, so they are kept
//! asymmetric.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{AnalysisError, Result};

pub const MIN_DEPTH: i64 = 1;
pub const MAX_DEPTH: i64 = 15;

pub const MIN_SKILL_LEVEL: i64 = 0;
pub const MAX_SKILL_LEVEL: i64 = 20;

pub const DEFAULT_TOP_MOVES: usize = 3;
/// Stockfish's MultiPV upper limit
pub const MAX_TOP_MOVES: i64 = 500;

/// A numeric field as it arrived in a JSON body
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericParam {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl NumericParam {
    /// Integer value, if the field holds one
    ///
    /// Floats are truncated toward zero; strings must contain an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            NumericParam::Int(n) => Some(*n),
            NumericParam::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            NumericParam::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl From<i64> for NumericParam {
    fn from(n: i64) -> Self {
        NumericParam::Int(n)
    }
}

impl From<&str> for NumericParam {
    fn from(s: &str) -> Self {
        NumericParam::Text(s.to_string())
    }
}

/// Search depth to use for one request
pub fn resolve_depth(requested: Option<&NumericParam>, current: u32) -> u32 {
    let Some(requested) = requested else {
        return current;
    };

    match requested.as_int() {
        Some(depth) if (MIN_DEPTH..=MAX_DEPTH).contains(&depth) => {
            info!("Using requested depth: {}", depth);
            depth as u32
        }
        Some(depth) => {
            warn!(
                "Invalid depth requested ({}), must be between {} and {}. Using default: {}",
                depth, MIN_DEPTH, MAX_DEPTH, current
            );
            current
        }
        None => {
            warn!("Invalid depth format ({:?}), using default: {}", requested, current);
            current
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkillLevelError {
    #[error("Invalid skill level format")]
    InvalidFormat,

    #[error("Skill level must be between 0 and 20")]
    OutOfRange(i64),
}

pub fn validate_skill_level(requested: &NumericParam) -> std::result::Result<u8, SkillLevelError> {
    let level = requested.as_int().ok_or(SkillLevelError::InvalidFormat)?;
    if !(MIN_SKILL_LEVEL..=MAX_SKILL_LEVEL).contains(&level) {
        return Err(SkillLevelError::OutOfRange(level));
    }
    Ok(level as u8)
}

/// Number of candidates for a top-moves query (default 3)
pub fn resolve_top_move_count(requested: Option<&NumericParam>) -> Result<usize> {
    let Some(requested) = requested else {
        return Ok(DEFAULT_TOP_MOVES);
    };

    match requested.as_int() {
        Some(n) if (1..=MAX_TOP_MOVES).contains(&n) => Ok(n as usize),
        Some(_) => Err(AnalysisError::InvalidInput(format!(
            "Number of top moves ('n') must be between 1 and {}",
            MAX_TOP_MOVES
        ))),
        None => Err(AnalysisError::InvalidInput(
            "Invalid number of top moves ('n') format".to_string(),
        )),
    }
}
