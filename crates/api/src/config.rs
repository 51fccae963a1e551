use std::time::Duration;

use eduboard_db::repositories::SequenceStrategy;
use eduboard_events::DispatchConfig;

use crate::auth::jwt::JwtConfig;

/// Which [`DocumentStore`](eduboard_db::DocumentStore) implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Some(StoreBackend::Postgres),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

/// Outbox dispatcher settings.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Recipients per email batch (default: `100`).
    pub batch_size: usize,
    /// Dispatcher poll interval in seconds (default: `15`).
    pub poll_secs: u64,
    /// Delivery attempts before a message is marked dead (default: `5`).
    pub max_attempts: i32,
}

impl NotifyConfig {
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            poll_interval: Duration::from_secs(self.poll_secs.max(1)),
            batch_size: self.batch_size.max(1),
            max_attempts: self.max_attempts.max(1),
            ..DispatchConfig::default()
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret (and the database URL for the Postgres
/// backend) have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub store_backend: StoreBackend,
    /// Required for [`StoreBackend::Postgres`].
    pub database_url: Option<String>,
    pub sequence_strategy: SequenceStrategy,
    /// Return underlying messages of 500 responses instead of a generic one.
    pub expose_internal_errors: bool,
    /// Days a home-tuition request stays listed (default: `30`).
    pub home_tuition_retention_days: i64,
    pub notify: NotifyConfig,
    /// JWT verification settings.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                    |
    /// | `STORE_BACKEND`               | `postgres`              |
    /// | `DATABASE_URL`                | required for postgres   |
    /// | `SEQUENCE_STRATEGY`           | `counter`               |
    /// | `EXPOSE_INTERNAL_ERRORS`      | `false`                 |
    /// | `HOME_TUITION_RETENTION_DAYS` | `30`                    |
    /// | `NOTIFY_BATCH_SIZE`           | `100`                   |
    /// | `OUTBOX_POLL_SECS`            | `15`                    |
    /// | `OUTBOX_MAX_ATTEMPTS`         | `5`                     |
    ///
    /// # Panics
    ///
    /// Panics on unparsable values, an unknown store backend or sequence
    /// strategy, or a missing `DATABASE_URL` for the Postgres backend.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let store_backend = StoreBackend::parse(
            &std::env::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".into()),
        )
        .expect("STORE_BACKEND must be 'postgres' or 'memory'");

        let database_url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty());
        if store_backend == StoreBackend::Postgres {
            assert!(
                database_url.is_some(),
                "DATABASE_URL must be set when STORE_BACKEND=postgres"
            );
        }

        let sequence_strategy = SequenceStrategy::parse(
            &std::env::var("SEQUENCE_STRATEGY").unwrap_or_else(|_| "counter".into()),
        )
        .expect("SEQUENCE_STRATEGY must be 'counter' or 'max'");

        let expose_internal_errors = std::env::var("EXPOSE_INTERNAL_ERRORS")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let home_tuition_retention_days: i64 = std::env::var("HOME_TUITION_RETENTION_DAYS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("HOME_TUITION_RETENTION_DAYS must be a valid i64");

        let notify = NotifyConfig {
            batch_size: std::env::var("NOTIFY_BATCH_SIZE")
                .unwrap_or_else(|_| "100".into())
                .parse()
                .expect("NOTIFY_BATCH_SIZE must be a valid usize"),
            poll_secs: std::env::var("OUTBOX_POLL_SECS")
                .unwrap_or_else(|_| "15".into())
                .parse()
                .expect("OUTBOX_POLL_SECS must be a valid u64"),
            max_attempts: std::env::var("OUTBOX_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "5".into())
                .parse()
                .expect("OUTBOX_MAX_ATTEMPTS must be a valid i32"),
        };

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            store_backend,
            database_url,
            sequence_strategy,
            expose_internal_errors,
            home_tuition_retention_days,
            notify,
            jwt,
        }
    }
}
