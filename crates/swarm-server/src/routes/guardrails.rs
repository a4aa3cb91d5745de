//! Guardrail limits administration.

use axum::Json;
use axum::extract::State;
use axum::routing::get;
use serde_json::{Value, json};

use swarm_guardrails::LimitsUpdate;

use crate::auth::Actor;
use crate::errors::ApiResult;
use crate::state::AppState;

/// Guardrail routes.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new().route("/api/guardrails", get(get_limits).patch(update_limits))
}

/// GET /api/guardrails — current limits snapshot.
async fn get_limits(State(state): State<AppState>) -> Json<Value> {
    let limits = state.guardrails.snapshot();
    Json(json!(&*limits))
}

/// PATCH /api/guardrails — admin-only partial update.
async fn update_limits(
    State(state): State<AppState>,
    actor: Actor,
    Json(update): Json<LimitsUpdate>,
) -> ApiResult<Json<Value>> {
    actor.require_operator("change guardrails")?;
    let limits = state.guardrails.update(&update)?;
    Ok(Json(json!(&*limits)))
}
