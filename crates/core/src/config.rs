use std::env;
use std::time::Duration;

/// Lower bound for the delay between a preview request and its generation.
pub const MIN_PREVIEW_DEBOUNCE_MS: u64 = 300;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub preview_debounce_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./data/sitebench.db?mode=rwc".to_string()),
            max_connections: env::var("MAX_CONNECTIONS")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(5),
            preview_debounce_ms: env::var("PREVIEW_DEBOUNCE_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .unwrap_or(MIN_PREVIEW_DEBOUNCE_MS),
        }
    }

    /// Config for a throwaway in-memory store.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            preview_debounce_ms: MIN_PREVIEW_DEBOUNCE_MS,
        }
    }

    pub fn preview_debounce(&self) -> Duration {
        Duration::from_millis(self.preview_debounce_ms.max(MIN_PREVIEW_DEBOUNCE_MS))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
