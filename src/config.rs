use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, read from the environment with fixed defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Directory holding the users and game-summary stores.
    pub data_dir: PathBuf,
    /// Move-suggestion service endpoint.
    pub suggest_url: String,
    /// Upper bound on a single suggestion query.
    pub suggest_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            bind_addr: env::var("ARENA_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            data_dir: env::var("ARENA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("chess_data")),
            suggest_url: env::var("ARENA_SUGGEST_URL")
                .unwrap_or_else(|_| "https://lichess.org/api/cloud-eval".to_string()),
            suggest_timeout: env::var("ARENA_SUGGEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(5)),
        }
    }
}
