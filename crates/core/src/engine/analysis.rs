//! Types for representing engine search results

use std::fmt;

use serde::{Serialize, Serializer};

/// Unit of an engine score, as tagged on the `score` token of a UCI info line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreKind {
    /// `cp`: hundredths of a pawn
    Centipawns,
    /// `mate`: moves until forced mate
    Mate,
    /// Any tag the protocol layer did not recognize
    Unrecognized(String),
}

impl ScoreKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "cp" => ScoreKind::Centipawns,
            "mate" => ScoreKind::Mate,
            other => ScoreKind::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ScoreKind::Centipawns => "cp",
            ScoreKind::Mate => "mate",
            ScoreKind::Unrecognized(tag) => tag,
        }
    }
}

impl Serialize for ScoreKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A score as reported by the engine, always from White's point of view
/// (positive = White is better / White mates).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineScore {
    #[serde(rename = "type")]
    pub kind: ScoreKind,
    pub value: i32,
}

impl EngineScore {
    pub fn centipawns(value: i32) -> Self {
        Self { kind: ScoreKind::Centipawns, value }
    }

    pub fn mate(value: i32) -> Self {
        Self { kind: ScoreKind::Mate, value }
    }

    /// Same score seen from the other side of the board
    pub fn flipped(self) -> Self {
        Self {
            kind: self.kind,
            value: -self.value,
        }
    }
}

impl fmt::Display for EngineScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ScoreKind::Centipawns => {
                let score = self.value as f32 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            ScoreKind::Mate => write!(f, "M{}", self.value),
            ScoreKind::Unrecognized(ref tag) => write!(f, "{} {}", tag, self.value),
        }
    }
}

/// Outcome of a `go` search that produced a move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMove {
    /// The move in UCI notation (e.g., "e2e4")
    pub uci: String,
    /// Expected reply, if the engine suggested one
    pub ponder: Option<String>,
    /// Principal variation of the final search, starting with `uci`
    pub pv: Vec<String>,
}

impl BestMove {
    /// The line expected after the best move, space separated
    pub fn continuation(&self) -> String {
        match self.pv.split_first() {
            Some((first, rest)) if *first == self.uci => rest.join(" "),
            _ => self.ponder.clone().unwrap_or_default(),
        }
    }
}

/// One candidate from a MultiPV search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopMove {
    #[serde(rename = "Move")]
    pub mv: String,
    #[serde(rename = "Centipawn")]
    pub centipawn: Option<i32>,
    #[serde(rename = "Mate")]
    pub mate: Option<i32>,
}
