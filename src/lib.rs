//! PARS — Patient Acuity & Risk System.
//!
//! Core engine for a hospital triage dashboard: risk assessment against a
//! remote scoring service with a deterministic offline fallback, a live
//! patient queue with optimistic writes against the patient store, a
//! sliding-window projection of the currently active queue, and the
//! aggregation behind the analytics view.

pub mod core;
pub mod db;
pub mod models;

/// Application configuration
pub mod config {
    use std::env;
    use std::time::Duration;

    /// Runtime configuration, read from `PARS_*` environment variables
    /// with workable defaults for local development. The binary loads
    /// `.env` before calling [`Config::from_env`].
    #[derive(Debug, Clone)]
    pub struct Config {
        /// Base URL of the remote scoring service.
        pub scoring_url: String,
        /// SQLite URL of the patient store.
        pub database_url: String,
        /// How long a patient stays in the active queue display.
        pub active_window: Duration,
        /// Per-request timeout on the scoring call; on expiry the local
        /// ruleset answers instead.
        pub scoring_timeout: Duration,
    }

    impl Config {
        pub fn from_env() -> Self {
            Self {
                scoring_url: env::var("PARS_SCORING_URL")
                    .unwrap_or_else(|_| "http://localhost:8000".to_string()),
                database_url: env::var("PARS_DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite::memory:".to_string()),
                active_window: secs_var("PARS_ACTIVE_WINDOW_SECS", 30),
                scoring_timeout: secs_var("PARS_SCORING_TIMEOUT_SECS", 10),
            }
        }
    }

    fn secs_var(name: &str, default: u64) -> Duration {
        let secs = env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default);
        Duration::from_secs(secs)
    }
}
