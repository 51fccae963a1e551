use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eduboard_api::background::tuition_retention;
use eduboard_api::config::{ServerConfig, StoreBackend};
use eduboard_api::router::build_app_router;
use eduboard_api::state::AppState;
use eduboard_db::{DocumentStore, MemoryStore, OutboxStore, PgStore};
use eduboard_events::{EmailConfig, LogMailer, Mailer, OutboxDispatcher, SmtpMailer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let (plain_layer, json_layer) = if json_logs {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eduboard_api=debug,tower_http=debug".into()),
        )
        .with(plain_layer)
        .with(json_layer)
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store_backend,
        sequence_strategy = ?config.sequence_strategy,
        "Loaded server configuration"
    );
    eduboard_api::error::set_expose_internal_errors(config.expose_internal_errors);

    // --- Storage ---
    let (documents, outbox): (Arc<dyn DocumentStore>, Arc<dyn OutboxStore>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .expect("DATABASE_URL must be set");

                let pool = eduboard_db::create_pool(database_url)
                    .await
                    .expect("Failed to connect to database");
                tracing::info!("Database connection pool created");

                eduboard_db::health_check(&pool)
                    .await
                    .expect("Database health check failed");
                tracing::info!("Database health check passed");

                eduboard_db::run_migrations(&pool)
                    .await
                    .expect("Failed to run database migrations");
                tracing::info!("Database migrations applied");

                let store = Arc::new(PgStore::new(pool));
                let documents: Arc<dyn DocumentStore> = store.clone();
                let outbox: Arc<dyn OutboxStore> = store;
                (documents, outbox)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                let store = Arc::new(MemoryStore::new());
                let documents: Arc<dyn DocumentStore> = store.clone();
                let outbox: Arc<dyn OutboxStore> = store;
                (documents, outbox)
            }
        };

    // --- Mailer ---
    let mailer: Arc<dyn Mailer> = match EmailConfig::from_env() {
        Some(email_config) => {
            tracing::info!(host = %email_config.smtp_host, "SMTP delivery enabled");
            Arc::new(SmtpMailer::new(&email_config).expect("Invalid SMTP configuration"))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, notification emails are logged only");
            Arc::new(LogMailer)
        }
    };

    // --- Background services ---
    let cancel = CancellationToken::new();
    let outbox_signal = Arc::new(Notify::new());

    let dispatcher = OutboxDispatcher::new(
        Arc::clone(&documents),
        Arc::clone(&outbox),
        mailer,
        Arc::clone(&outbox_signal),
        config.notify.dispatch_config(),
    );
    let dispatcher_cancel = cancel.clone();
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(dispatcher_cancel).await;
    });

    let retention_handle = tokio::spawn(tuition_retention::run(
        Arc::clone(&documents),
        config.home_tuition_retention_days,
        cancel.clone(),
    ));

    tracing::info!("Background services started (outbox dispatcher, tuition retention)");

    // --- App state ---
    let state = AppState {
        documents,
        outbox,
        config: Arc::new(config.clone()),
        outbox_signal,
    };

    let app = build_app_router(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping background services");

    cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(grace, dispatcher_handle).await.is_err() {
        tracing::warn!("Outbox dispatcher did not stop in time");
    }
    if tokio::time::timeout(grace, retention_handle).await.is_err() {
        tracing::warn!("Tuition retention job did not stop in time");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
