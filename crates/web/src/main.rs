use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use stockfish_server_core::{AnalysisSession, Engine, StockfishEngine};

mod config;
mod error;
mod extract;
mod routes;

use config::ServerConfig;

/// The engine behind the session, boxed so tests can swap in a double
pub type SharedEngine = Box<dyn Engine + Send>;
pub type SharedSession = AnalysisSession<SharedEngine>;

pub struct AppState {
    pub session: SharedSession,
    pub engine_path: String,
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/analyze", post(routes::analysis::analyze))
        .route("/move", post(routes::analysis::best_move))
        .route("/evaluation", post(routes::analysis::evaluation))
        .route("/win_chance", post(routes::analysis::win_chance))
        .route("/is_move_legal", post(routes::analysis::is_move_legal))
        .route("/top_moves", post(routes::analysis::top_moves))
        .route("/set_skill", post(routes::engine::set_skill))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the engine; a failure leaves the service running in a degraded
/// state where every request reports the engine as unavailable.
fn start_session(config: &ServerConfig) -> SharedSession {
    match StockfishEngine::new(&config.engine) {
        Ok(engine) => {
            tracing::info!("Stockfish initialized successfully from: {}", config.engine.path);
            tracing::info!(
                "Stockfish parameters: depth={} threads={} hash={}MB queue_policy={}",
                config.engine.depth,
                config.engine.threads,
                config.engine.hash_mb,
                config.queue_policy
            );
            AnalysisSession::new(Box::new(engine) as SharedEngine, config.queue_policy)
        }
        Err(e) => {
            tracing::error!("Failed to initialize Stockfish: {}", e);
            AnalysisSession::unavailable(config.queue_policy)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let engine_path = config.engine.path.clone();
    let session = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || start_session(&config))
            .await
            .expect("Engine startup task panicked")
    };

    let state = Arc::new(AppState {
        session,
        engine_path,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use stockfish_server_core::engine::stockfish::parse_position;
    use stockfish_server_core::engine::BestMove;
    use stockfish_server_core::{EngineError, EngineScore, QueuePolicy, ScoreKind, TopMove};
    use tower::ServiceExt;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Engine double; the score is the current depth unless one is scripted
    struct FakeEngine {
        depth: u32,
        score: Option<EngineScore>,
        has_move: bool,
        skill: Arc<Mutex<Option<u8>>>,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                depth: 15,
                score: None,
                has_move: true,
                skill: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl Engine for FakeEngine {
        fn depth(&self) -> u32 {
            self.depth
        }

        fn set_depth(&mut self, depth: u32) {
            self.depth = depth;
        }

        fn is_fen_valid(&mut self, fen: &str) -> Result<bool, EngineError> {
            Ok(parse_position(fen).is_some())
        }

        fn set_fen_position(&mut self, _fen: &str) -> Result<(), EngineError> {
            Ok(())
        }

        fn best_move(&mut self) -> Result<Option<BestMove>, EngineError> {
            Ok(self.has_move.then(|| BestMove {
                uci: "e2e4".into(),
                ponder: Some("e7e5".into()),
                pv: vec!["e2e4".into(), "e7e5".into()],
            }))
        }

        fn evaluation(&mut self) -> Result<EngineScore, EngineError> {
            Ok(self
                .score
                .clone()
                .unwrap_or_else(|| EngineScore::centipawns(self.depth as i32)))
        }

        fn top_moves(&mut self, n: usize) -> Result<Vec<TopMove>, EngineError> {
            Ok(["e2e4", "d2d4", "c2c4", "g1f3"]
                .iter()
                .take(n)
                .map(|mv| TopMove {
                    mv: mv.to_string(),
                    centipawn: Some(30),
                    mate: None,
                })
                .collect())
        }

        fn is_move_correct(&mut self, mv: &str) -> Result<bool, EngineError> {
            Ok(mv == "e2e4" || mv == "g1f3")
        }

        fn set_skill_level(&mut self, level: u8) -> Result<(), EngineError> {
            *self.skill.lock().unwrap() = Some(level);
            Ok(())
        }
    }

    fn test_app(engine: FakeEngine) -> Router {
        app(Arc::new(AppState {
            session: AnalysisSession::new(Box::new(engine) as SharedEngine, QueuePolicy::Queue),
            engine_path: "/usr/local/bin/stockfish".into(),
        }))
    }

    fn unavailable_app() -> Router {
        app(Arc::new(AppState {
            session: AnalysisSession::unavailable(QueuePolicy::Queue),
            engine_path: "/missing/stockfish".into(),
        }))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_text(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index() {
        let (status, body) = get_text(test_app(FakeEngine::new()), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Stockfish UCI server running. Engine: /usr/local/bin/stockfish");

        let (status, body) = get_text(unavailable_app(), "/").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("failed to initialize"));
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let (status, body) = post_json(test_app(FakeEngine::new()), "/analyze", json!({"fen": START})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "fen": START,
                "success": true,
                "evaluation": 0.15,
                "mate": null,
                "bestmove": "e2e4",
                "continuation": "e7e5",
            })
        );
    }

    #[tokio::test]
    async fn test_analyze_with_depth() {
        let (_, body) = post_json(
            test_app(FakeEngine::new()),
            "/analyze",
            json!({"fen": START, "depth": "8"}),
        )
        .await;
        assert_eq!(body["evaluation"], 0.08);

        let (status, body) = post_json(
            test_app(FakeEngine::new()),
            "/analyze",
            json!({"fen": START, "depth": 40}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["evaluation"], 0.15);
    }

    #[tokio::test]
    async fn test_analyze_mate() {
        let mut engine = FakeEngine::new();
        engine.score = Some(EngineScore::mate(2));

        let (status, body) = post_json(test_app(engine), "/analyze", json!({"fen": START, "depth": 10})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mate"], 2);
        assert_eq!(body["evaluation"], 999.0);
    }

    #[tokio::test]
    async fn test_analyze_invalid_fen() {
        let (status, body) = post_json(
            test_app(FakeEngine::new()),
            "/analyze",
            json!({"fen": "<invalid string>"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["fen"], "<invalid string>");
        assert!(body["error"].as_str().unwrap().contains("Invalid FEN"));
    }

    #[tokio::test]
    async fn test_analyze_missing_fen() {
        let (status, body) = post_json(test_app(FakeEngine::new()), "/analyze", json!({"fen": 42})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("not provided"));
    }

    #[tokio::test]
    async fn test_analyze_no_move_is_server_error() {
        let mut engine = FakeEngine::new();
        engine.has_move = false;

        let (status, body) = post_json(test_app(engine), "/analyze", json!({"fen": START})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Stockfish could not determine a best move");
    }

    #[tokio::test]
    async fn test_analyze_unknown_evaluation_kind() {
        let mut engine = FakeEngine::new();
        engine.score = Some(EngineScore {
            kind: ScoreKind::Unrecognized("wdl".into()),
            value: 1,
        });

        let (status, body) = post_json(test_app(engine), "/analyze", json!({"fen": START})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Unknown evaluation type: wdl");
    }

    #[tokio::test]
    async fn test_engine_unavailable() {
        let (status, body) = post_json(unavailable_app(), "/analyze", json!({"fen": START})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"success": false, "error": "Stockfish engine not initialized"}));

        for uri in ["/move", "/evaluation", "/win_chance", "/top_moves"] {
            let (status, body) = post_json(unavailable_app(), uri, json!({"fen": START})).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["error"], "Stockfish engine not initialized");
        }

        let (status, _) = post_json(unavailable_app(), "/set_skill", json!({"level": 5})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let response = test_app(FakeEngine::new())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/move")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_best_move() {
        let (status, body) = post_json(test_app(FakeEngine::new()), "/move", json!({"fen": START})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"best_move": "e2e4"}));

        let (status, body) = post_json(test_app(FakeEngine::new()), "/move", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "FEN not provided"}));

        let (status, body) = post_json(test_app(FakeEngine::new()), "/move", json!({"fen": "8/8"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid FEN string provided"}));
    }

    #[tokio::test]
    async fn test_evaluation_payload() {
        let mut engine = FakeEngine::new();
        engine.score = Some(EngineScore::centipawns(-42));

        let (status, body) = post_json(test_app(engine), "/evaluation", json!({"fen": START})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"type": "cp", "value": -42}));
    }

    #[tokio::test]
    async fn test_win_chance() {
        let mut engine = FakeEngine::new();
        engine.score = Some(EngineScore::centipawns(100));
        let (status, body) = post_json(test_app(engine), "/win_chance", json!({"fen": START})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"white_win_chance": 0.5987}));

        let mut engine = FakeEngine::new();
        engine.score = Some(EngineScore::mate(-1));
        let (_, body) = post_json(test_app(engine), "/win_chance", json!({"fen": START})).await;
        assert_eq!(body, json!({"white_win_chance": 0.0}));
    }

    #[tokio::test]
    async fn test_is_move_legal() {
        let (status, body) = post_json(
            test_app(FakeEngine::new()),
            "/is_move_legal",
            json!({"fen": START, "move": "e2e4"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"is_legal": true}));

        let (_, body) = post_json(
            test_app(FakeEngine::new()),
            "/is_move_legal",
            json!({"fen": START, "move": "e2e5"}),
        )
        .await;
        assert_eq!(body, json!({"is_legal": false}));

        let (status, body) = post_json(test_app(FakeEngine::new()), "/is_move_legal", json!({"fen": START})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "FEN or move not provided"}));
    }

    #[tokio::test]
    async fn test_top_moves() {
        let (status, body) = post_json(test_app(FakeEngine::new()), "/top_moves", json!({"fen": START})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["top_moves"].as_array().unwrap().len(), 3);
        assert_eq!(body["top_moves"][0], json!({"Move": "e2e4", "Centipawn": 30, "Mate": null}));

        let (_, body) = post_json(
            test_app(FakeEngine::new()),
            "/top_moves",
            json!({"fen": START, "n": 2}),
        )
        .await;
        assert_eq!(body["top_moves"].as_array().unwrap().len(), 2);

        let (status, _) = post_json(
            test_app(FakeEngine::new()),
            "/top_moves",
            json!({"fen": START, "n": "many"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_set_skill() {
        let engine = FakeEngine::new();
        let skill = Arc::clone(&engine.skill);
        let app = test_app(engine);

        let (status, body) = post_json(app.clone(), "/set_skill", json!({"level": 5})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Skill level set to 5"}));
        assert_eq!(*skill.lock().unwrap(), Some(5));

        let (status, body) = post_json(app.clone(), "/set_skill", json!({"level": 25})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Skill level must be between 0 and 20"}));
        assert_eq!(*skill.lock().unwrap(), Some(5));

        let (status, body) = post_json(app.clone(), "/set_skill", json!({"level": "hard"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid skill level format"}));

        let (status, body) = post_json(app, "/set_skill", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Skill level not provided"}));
    }

    #[tokio::test]
    async fn test_concurrent_analyses_keep_their_depth() {
        let app = test_app(FakeEngine::new());

        let requests = (1..=10).map(|depth| {
            let app = app.clone();
            async move {
                let (status, body) = post_json(app, "/analyze", json!({"fen": START, "depth": depth})).await;
                assert_eq!(status, StatusCode::OK);
                (depth, body["evaluation"].as_f64().unwrap())
            }
        });

        let handles: Vec<_> = requests.map(tokio::spawn).collect();
        for handle in handles {
            let (depth, evaluation) = handle.await.unwrap();
            assert_eq!(evaluation, depth as f64 / 100.0);
        }

        let (_, body) = post_json(app, "/analyze", json!({"fen": START})).await;
        assert_eq!(body["evaluation"], 0.15);
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_binary_starts_degraded() {
        // cat never answers uciok
        let mut config = ServerConfig::from_lookup(|_| None);
        config.engine.path = "/bin/cat".into();
        config.engine.handshake_timeout = std::time::Duration::from_millis(200);

        let session = start_session(&config);
        assert!(!session.is_available());
    }
}
