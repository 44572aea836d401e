//! Stockfish chess engine interface
//!
//! Spawns Stockfish as a subprocess and communicates via UCI protocol.
//!
//! Engine output is read on a dedicated thread and handed over line by line
//! through a channel, so reads can be bounded in time and a misbehaving
//! binary cannot leave half a line in our buffer.

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use shakmaty::{fen::Fen, uci::UciMove, CastlingMode, Chess, Color, Position};
use tracing::debug;

use super::analysis::{BestMove, EngineScore, ScoreKind, TopMove};
use super::uci::{parse_bestmove, parse_info, InfoLine};
use super::Engine;
use crate::error::EngineError;

pub const DEFAULT_STOCKFISH_PATH: &str = "/usr/local/bin/stockfish";
pub const DEFAULT_DEPTH: u32 = 15;
pub const DEFAULT_THREADS: u32 = 2;
pub const DEFAULT_HASH_MB: u32 = 128;
/// How long startup may wait for `uciok` and the first `readyok`
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Startup configuration of the engine process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Path to stockfish binary (or "stockfish" if in PATH)
    pub path: String,
    /// Default search depth
    pub depth: u32,
    pub threads: u32,
    /// Transposition table size in MB
    pub hash_mb: u32,
    pub handshake_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            path: DEFAULT_STOCKFISH_PATH.to_string(),
            depth: DEFAULT_DEPTH,
            threads: DEFAULT_THREADS,
            hash_mb: DEFAULT_HASH_MB,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

/// What a single `go` produced
struct SearchOutcome {
    /// Last reported line per MultiPV index
    lines: BTreeMap<u32, InfoLine>,
    best: Option<(String, Option<String>)>,
}

/// Wrapper around Stockfish chess engine
pub struct StockfishEngine {
    /// The child process
    process: Child,
    /// Stdin for sending commands
    stdin: ChildStdin,
    /// Lines read from stdout; disconnected once the engine's output ends
    lines: Receiver<String>,
    /// Depth used for every `go`
    depth: u32,
    /// Position last sent to the engine
    position: Chess,
}

impl StockfishEngine {
    /// Creates a new Stockfish engine instance
    ///
    /// # Example
    /// ```ignore
    /// let mut engine = StockfishEngine::new(&EngineOptions::default())?;
    /// ```
    pub fn new(options: &EngineOptions) -> Result<Self, EngineError> {
        let mut process = Command::new(&options.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {}", options.path, e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("Failed to open stdin".into()))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("Failed to open stdout".into()))?;

        let mut engine = StockfishEngine {
            process,
            stdin,
            lines: spawn_reader(stdout),
            depth: options.depth,
            position: Chess::default(),
        };

        engine.init_uci(options)?;

        Ok(engine)
    }

    /// Sends a command to the engine
    fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(target: "uci", "> {}", cmd);
        writeln!(self.stdin, "{}", cmd)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Reads a line from the engine, waiting at most `limit` if one is given
    fn read_line(&mut self, limit: Option<Duration>) -> Result<String, EngineError> {
        let received = match limit {
            Some(limit) => self.lines.recv_timeout(limit),
            None => self.lines.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        received.map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                EngineError::Protocol(format!("no response from engine within {:?}", limit.unwrap_or_default()))
            }
            RecvTimeoutError::Disconnected => {
                EngineError::Protocol("engine closed its output".into())
            }
        })
    }

    /// Reads lines until we get the expected response
    fn read_until(&mut self, expected: &str, limit: Option<Duration>) -> Result<(), EngineError> {
        let deadline = limit.map(|limit| Instant::now() + limit);
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let line = self.read_line(remaining)?;
            if line.starts_with(expected) {
                return Ok(());
            }
        }
    }

    fn set_option(&mut self, name: &str, value: impl std::fmt::Display) -> Result<(), EngineError> {
        self.send(&format!("setoption name {} value {}", name, value))
    }

    fn wait_ready(&mut self, limit: Option<Duration>) -> Result<(), EngineError> {
        self.send("isready")?;
        self.read_until("readyok", limit)
    }

    fn init_uci(&mut self, options: &EngineOptions) -> Result<(), EngineError> {
        let limit = Some(options.handshake_timeout);
        self.send("uci")?;
        self.read_until("uciok", limit)?;

        self.set_option("Threads", options.threads)?;
        self.set_option("Hash", options.hash_mb)?;
        self.set_option("MultiPV", 1)?;
        self.set_option("UCI_LimitStrength", "false")?;
        self.set_option("Skill Level", 20)?;

        self.wait_ready(limit)
    }

    /// Runs `go depth <depth>` and collects output until `bestmove`
    fn search(&mut self) -> Result<SearchOutcome, EngineError> {
        self.send(&format!("go depth {}", self.depth))?;

        let mut lines: BTreeMap<u32, InfoLine> = BTreeMap::new();

        loop {
            let line = self.read_line(None)?;

            if let Some(best) = parse_bestmove(&line) {
                if let Some(reached) = lines.values().filter_map(|info| info.depth).max() {
                    debug!(target: "uci", "search finished at depth {}", reached);
                }
                return Ok(SearchOutcome { lines, best });
            }

            if let Some(info) = parse_info(&line) {
                if info.score.is_none() {
                    continue;
                }
                // Bound scores only stand in until an exact one arrives
                if !info.bound || !lines.contains_key(&info.multipv) {
                    lines.insert(info.multipv, info);
                }
            }
        }
    }

    /// Engine scores are side-to-move relative; ours are White-relative
    fn white_relative(&self, score: EngineScore) -> EngineScore {
        match self.position.turn() {
            Color::White => score,
            Color::Black => score.flipped(),
        }
    }

    /// Quit the engine cleanly
    pub fn quit(&mut self) -> Result<(), EngineError> {
        self.send("quit")?;
        // Give it a moment to exit
        std::thread::sleep(Duration::from_millis(100));
        let _ = self.process.kill(); // Kill if still running
        Ok(())
    }
}

/// Forwards engine output to a channel until the pipe closes
///
/// Lines are decoded lossily; a stray non-UTF-8 byte never costs us the
/// rest of a search.
fn spawn_reader(stdout: ChildStdout) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break, // EOF
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim().to_string();
                    debug!(target: "uci", "< {}", line);
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Parses a FEN into a legal standard chess position
pub fn parse_position(fen: &str) -> Option<Chess> {
    let parsed: Fen = fen.trim().parse().ok()?;
    parsed.into_position(CastlingMode::Standard).ok()
}

impl Engine for StockfishEngine {
    fn depth(&self) -> u32 {
        self.depth
    }

    fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    fn is_fen_valid(&mut self, fen: &str) -> Result<bool, EngineError> {
        Ok(parse_position(fen).is_some())
    }

    fn set_fen_position(&mut self, fen: &str) -> Result<(), EngineError> {
        let position = parse_position(fen)
            .ok_or_else(|| EngineError::Protocol(format!("refusing to load invalid FEN: {}", fen)))?;

        self.send("ucinewgame")?;
        self.wait_ready(None)?;
        self.send(&format!("position fen {}", fen.trim()))?;
        self.position = position;
        Ok(())
    }

    fn best_move(&mut self) -> Result<Option<BestMove>, EngineError> {
        let outcome = self.search()?;
        let pv = outcome
            .lines
            .get(&1)
            .map(|info| info.pv.clone())
            .unwrap_or_default();

        Ok(outcome.best.map(|(uci, ponder)| BestMove { uci, ponder, pv }))
    }

    fn evaluation(&mut self) -> Result<EngineScore, EngineError> {
        let outcome = self.search()?;
        let score = outcome
            .lines
            .get(&1)
            .and_then(|info| info.score.clone())
            .ok_or_else(|| EngineError::Protocol("engine reported no score".into()))?;

        Ok(self.white_relative(score))
    }

    fn top_moves(&mut self, n: usize) -> Result<Vec<TopMove>, EngineError> {
        self.set_option("MultiPV", n)?;
        let outcome = self.search();
        let restored = self.set_option("MultiPV", 1);
        let outcome = outcome?;
        restored?;

        if outcome.best.is_none() {
            return Ok(Vec::new());
        }

        let moves = outcome
            .lines
            .values()
            .take(n)
            .filter_map(|info| {
                let mv = info.pv.first()?.clone();
                let score = self.white_relative(info.score.clone()?);
                let (centipawn, mate) = match score.kind {
                    ScoreKind::Centipawns => (Some(score.value), None),
                    ScoreKind::Mate => (None, Some(score.value)),
                    ScoreKind::Unrecognized(_) => (None, None),
                };
                Some(TopMove { mv, centipawn, mate })
            })
            .collect();

        Ok(moves)
    }

    fn is_move_correct(&mut self, mv: &str) -> Result<bool, EngineError> {
        let Ok(uci) = mv.trim().parse::<UciMove>() else {
            return Ok(false);
        };
        Ok(uci.to_move(&self.position).is_ok())
    }

    fn set_skill_level(&mut self, level: u8) -> Result<(), EngineError> {
        self.set_option("UCI_LimitStrength", "false")?;
        self.set_option("Skill Level", level)?;
        self.wait_ready(None)
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
