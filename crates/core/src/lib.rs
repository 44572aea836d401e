//! Stockfish Server Core Library
//!
//! Drives a single UCI engine on behalf of an HTTP front end: validates
//! request parameters, runs each query against the shared engine session
//! and shapes engine scores into caller-facing evaluations.

pub mod engine;
pub mod error;
pub mod params;
pub mod score;
pub mod session;

pub use engine::{Engine, EngineOptions, EngineScore, ScoreKind, StockfishEngine, TopMove};
pub use error::{AnalysisError, EngineError, ErrorClass, Result};
pub use params::NumericParam;
pub use session::{AnalysisResult, AnalysisSession, QueuePolicy};
