use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Application settings read from the same Figment as Rocket's own
/// configuration (`Rocket.toml`, then `ROCKET_*` environment variables).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file path, or `:memory:`.
    pub database: String,
    /// Include the underlying error text in 5xx envelopes.
    pub expose_errors: bool,
    /// Longest a request waits on the database before answering 408.
    pub request_timeout_secs: u64,
    pub pagination: PaginationConfig,
    pub rate_limit: RateLimitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database: String::from("lifeplanner.db"),
            expose_errors: false,
            request_timeout_secs: 30,
            pagination: PaginationConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Shared counter store. Counters stay in-process when unset or unreachable.
    pub redis_url: Option<String>,
    pub general: WindowConfig,
    pub search: WindowConfig,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            enabled: true,
            redis_url: None,
            general: WindowConfig {
                window_secs: 15 * 60,
                max: 100,
            },
            search: WindowConfig {
                window_secs: 60,
                max: 30,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub window_secs: u64,
    pub max: u64,
}

impl WindowConfig {
    pub fn length(&self) -> Duration {
        Duration::from_secs(self.window_secs.max(1))
    }
}
