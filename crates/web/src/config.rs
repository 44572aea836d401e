//! Server configuration
//!
//! Read once at startup from the environment:
//! - `STOCKFISH_PATH`: engine binary (default `/usr/local/bin/stockfish`)
//! - `BIND_ADDR`: listen address (default `0.0.0.0:5000`)
//! - `ANALYSIS_QUEUE_POLICY`: `queue` (default) or `reject`

use std::net::SocketAddr;

use stockfish_server_core::{EngineOptions, QueuePolicy};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub engine: EngineOptions,
    pub bind_addr: SocketAddr,
    pub queue_policy: QueuePolicy,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut engine = EngineOptions::default();
        if let Some(path) = lookup("STOCKFISH_PATH").filter(|p| !p.trim().is_empty()) {
            engine.path = path;
        }

        let default_addr: SocketAddr = DEFAULT_BIND_ADDR
            .parse()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 5000)));
        let bind_addr = match lookup("BIND_ADDR") {
            Some(addr) => addr.parse().unwrap_or_else(|e| {
                tracing::warn!("Invalid BIND_ADDR '{}' ({}), using {}", addr, e, default_addr);
                default_addr
            }),
            None => default_addr,
        };

        let queue_policy = match lookup("ANALYSIS_QUEUE_POLICY") {
            Some(policy) => policy.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, using {}", e, QueuePolicy::default());
                QueuePolicy::default()
            }),
            None => QueuePolicy::default(),
        };

        Self {
            engine,
            bind_addr,
            queue_policy,
        }
    }
}
