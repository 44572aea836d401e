//! Parsing of engine output lines (UCI protocol)

use super::analysis::{EngineScore, ScoreKind};

/// The fields of an `info` line we care about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub multipv: u32,
    /// Score relative to the side to move
    pub score: Option<EngineScore>,
    /// True for `lowerbound`/`upperbound` scores, which are not final
    pub bound: bool,
    pub pv: Vec<String>,
}

/// Parses an info line from the engine
///
/// Returns `None` for anything that is not an `info` line.
pub fn parse_info(line: &str) -> Option<InfoLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"info") {
        return None;
    }

    let mut info = InfoLine {
        multipv: 1,
        ..InfoLine::default()
    };
    let mut i = 1;

    while i < parts.len() {
        match parts[i] {
            "depth" => {
                info.depth = parts.get(i + 1).and_then(|s| s.parse().ok());
                i += 2;
            }
            "multipv" => {
                if let Some(n) = parts.get(i + 1).and_then(|s| s.parse().ok()) {
                    info.multipv = n;
                }
                i += 2;
            }
            "score" => {
                if let (Some(tag), Some(value)) = (parts.get(i + 1), parts.get(i + 2)) {
                    if let Ok(value) = value.parse::<i32>() {
                        info.score = Some(EngineScore {
                            kind: ScoreKind::from_tag(tag),
                            value,
                        });
                    }
                }
                i += 3;
            }
            "lowerbound" | "upperbound" => {
                info.bound = true;
                i += 1;
            }
            "pv" => {
                // Everything after "pv" is the principal variation
                info.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            // Free text until end of line
            "string" => break,
            _ => {
                i += 1;
            }
        }
    }

    Some(info)
}

/// Parses `bestmove <move> [ponder <move>]`
///
/// Outer `None`: not a bestmove line. Inner `None`: the engine has no move
/// (`bestmove (none)`, e.g. checkmate or stalemate).
pub fn parse_bestmove(line: &str) -> Option<Option<(String, Option<String>)>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"bestmove") {
        return None;
    }

    let mv = match parts.get(1) {
        Some(&"(none)") | None => return Some(None),
        Some(mv) => mv.to_string(),
    };

    let ponder = match parts.get(2) {
        Some(&"ponder") => parts.get(3).map(|s| s.to_string()),
        _ => None,
    };

    Some(Some((mv, ponder)))
}
