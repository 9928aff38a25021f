use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthState,
    pub timestamp: String,
    pub version: String,
    pub dependencies: DependencyStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub card_store: ServiceHealth,
    pub bank_registry: ServiceHealth,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: HealthState,
    pub response_time_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Times a single dependency check
async fn probe<F, E>(check: F) -> ServiceHealth
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    let start = Instant::now();
    let outcome = check.await;
    let response_time_ms = start.elapsed().as_millis();

    match outcome {
        Ok(()) => ServiceHealth {
            status: HealthState::Healthy,
            response_time_ms,
            error: None,
        },
        Err(e) => ServiceHealth {
            status: HealthState::Unhealthy,
            response_time_ms,
            error: Some(e.to_string()),
        },
    }
}

/// `GET /health`: 200 when the card store and the bank registry both
/// answer, 503 otherwise
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let start = Instant::now();

    let (card_store, bank_registry) = tokio::join!(
        probe(state.cards.store().ping()),
        probe(state.cards.bank_validator().check_health()),
    );

    let status = if card_store.status == HealthState::Healthy
        && bank_registry.status == HealthState::Healthy
    {
        HealthState::Healthy
    } else {
        HealthState::Unhealthy
    };

    let code = match status {
        HealthState::Healthy => StatusCode::OK,
        HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    tracing::info!(
        status = ?status,
        duration_ms = start.elapsed().as_millis(),
        "Health check completed"
    );

    let response = HealthResponse {
        status,
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        dependencies: DependencyStatus {
            card_store,
            bank_registry,
        },
    };

    (code, Json(response))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
