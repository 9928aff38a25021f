// API module - HTTP endpoints

pub mod cards;
pub mod health;
pub mod state;
pub mod validation;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Full application router with tracing
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(cards::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
