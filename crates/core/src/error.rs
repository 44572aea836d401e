//! Error types for stockfish-server-core

use thiserror::Error;

use crate::params::SkillLevelError;

/// Failures talking to the engine process
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to start engine: {0}")]
    Spawn(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Engine session lock poisoned")]
    Poisoned,
}

/// How a failed request should be reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input; nothing was mutated
    Client,
    /// Engine or protocol fault
    Server,
    /// Session is busy and the queue policy rejects waiting
    Busy,
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid FEN string provided")]
    InvalidFen,

    #[error("Stockfish engine not initialized")]
    EngineUnavailable,

    #[error("Stockfish could not determine a best move")]
    NoMoveFound,

    #[error("Unknown evaluation type: {0}")]
    UnknownEvaluationKind(String),

    #[error(transparent)]
    InvalidSkillLevel(#[from] SkillLevelError),

    #[error("Engine is busy with another request")]
    Busy,

    #[error("Internal server error during analysis: {0}")]
    EngineFailure(#[from] EngineError),
}

impl AnalysisError {
    pub fn status_class(&self) -> ErrorClass {
        match self {
            AnalysisError::InvalidInput(_)
            | AnalysisError::InvalidFen
            | AnalysisError::InvalidSkillLevel(_) => ErrorClass::Client,
            AnalysisError::Busy => ErrorClass::Busy,
            AnalysisError::EngineUnavailable
            | AnalysisError::NoMoveFound
            | AnalysisError::UnknownEvaluationKind(_)
            | AnalysisError::EngineFailure(_) => ErrorClass::Server,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
