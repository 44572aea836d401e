//! Chess engine integration
//!
//! The analysis service only ever talks to an engine through the [`Engine`]
//! trait. [`StockfishEngine`] is the UCI subprocess implementation.

pub mod analysis;
pub mod stockfish;
pub mod uci;

use crate::error::EngineError;

// Re-export main types for convenience
pub use analysis::{BestMove, EngineScore, ScoreKind, TopMove};
pub use stockfish::{EngineOptions, StockfishEngine};

/// Capabilities the service needs from a chess engine.
///
/// Implementations are stateful: a position is loaded with
/// [`set_fen_position`](Engine::set_fen_position) and every query runs
/// against it at the currently configured [`depth`](Engine::depth).
pub trait Engine {
    /// Search depth used by queries
    fn depth(&self) -> u32;

    fn set_depth(&mut self, depth: u32);

    /// Whether `fen` describes a valid position
    fn is_fen_valid(&mut self, fen: &str) -> Result<bool, EngineError>;

    fn set_fen_position(&mut self, fen: &str) -> Result<(), EngineError>;

    /// Best move for the loaded position, `None` if there is no legal move
    fn best_move(&mut self) -> Result<Option<BestMove>, EngineError>;

    /// Evaluation of the loaded position, from White's point of view
    fn evaluation(&mut self) -> Result<EngineScore, EngineError>;

    /// Up to `n` best candidates for the loaded position
    fn top_moves(&mut self, n: usize) -> Result<Vec<TopMove>, EngineError>;

    /// Whether `mv` (UCI notation) is legal in the loaded position
    fn is_move_correct(&mut self, mv: &str) -> Result<bool, EngineError>;

    fn set_skill_level(&mut self, level: u8) -> Result<(), EngineError>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn depth(&self) -> u32 {
        (**self).depth()
    }

    fn set_depth(&mut self, depth: u32) {
        (**self).set_depth(depth)
    }

    fn is_fen_valid(&mut self, fen: &str) -> Result<bool, EngineError> {
        (**self).is_fen_valid(fen)
    }

    fn set_fen_position(&mut self, fen: &str) -> Result<(), EngineError> {
        (**self).set_fen_position(fen)
    }

    fn best_move(&mut self) -> Result<Option<BestMove>, EngineError> {
        (**self).best_move()
    }

    fn evaluation(&mut self) -> Result<EngineScore, EngineError> {
        (**self).evaluation()
    }

    fn top_moves(&mut self, n: usize) -> Result<Vec<TopMove>, EngineError> {
        (**self).top_moves(n)
    }

    fn is_move_correct(&mut self, mv: &str) -> Result<bool, EngineError> {
        (**self).is_move_correct(mv)
    }

    fn set_skill_level(&mut self, level: u8) -> Result<(), EngineError> {
        (**self).set_skill_level(level)
    }
}
