//! API routes.

mod agents;
mod guardrails;
mod messages;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::routing::get;

use crate::health::{self, HealthResponse};
use crate::state::AppState;

/// Assemble every `/api` route.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(agents::router())
        .merge(messages::router())
        .merge(guardrails::router())
        .route("/api/health", get(health_handler))
}

/// GET /api/health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.manager.live_count(),
        state.memory.status(),
        state.depcache.status(),
    ))
}
