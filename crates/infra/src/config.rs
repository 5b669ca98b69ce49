use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Upper bound on the number of pooled Postgres connections
    pub max_connections: u32,
    /// Deadline given to every `RequestScope` created by the `StoreContext`.
    /// A statement that runs longer is aborted and reported as cancelled.
    pub query_timeout: Duration,
}

fn env_or_default<T: std::str::FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => match value.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    key, value, default
                );
                default
            }
        },
        Err(_) => {
            info!("Did not find {} environment variable. Using default: {}", key, default);
            default
        }
    }
}

impl Config {
    pub fn new() -> Self {
        let max_connections = env_or_default("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let query_timeout_ms = env_or_default("QUERY_TIMEOUT_MS", DEFAULT_QUERY_TIMEOUT_MS);
        Self {
            max_connections,
            query_timeout: Duration::from_millis(query_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
