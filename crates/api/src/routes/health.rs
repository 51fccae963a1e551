use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use eduboard_db::models::outbox::OutboxStatus;

use crate::config::StoreBackend;
use crate::state::AppState;

/// `GET /health` payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub store_healthy: bool,
    /// Outbox backlog; absent when the store is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbox: Option<OutboxBacklog>,
}

#[derive(Serialize)]
pub struct OutboxBacklog {
    pub pending: i64,
    pub dead: i64,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_healthy = state.documents.ping().await.is_ok();

    let outbox = if store_healthy {
        let backlog = tokio::try_join!(
            state.outbox.count_messages(Some(OutboxStatus::Pending)),
            state.outbox.count_messages(Some(OutboxStatus::Dead)),
        );
        match backlog {
            Ok((pending, dead)) => Some(OutboxBacklog { pending, dead }),
            Err(e) => {
                tracing::warn!(error = %e, "Outbox backlog unavailable");
                None
            }
        }
    } else {
        None
    };

    Json(HealthResponse {
        status: if store_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        store: match state.config.store_backend {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        },
        store_healthy,
        outbox,
    })
}

/// `/health`, mounted at the root rather than under `/api`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
