//! Message bus endpoints. Agents and the UI both use these.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use serde::Deserialize;
use serde_json::{Value, json};

use swarm_bus::{MessageQuery, PostMessage};
use swarm_core::errors::ApiError;

use crate::errors::{ApiResult, ServerError};
use crate::state::AppState;

/// Message bus routes.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/api/messages", get(query_messages).post(post_message))
        .route("/api/messages/read-all", post(mark_all_read))
        .route("/api/messages/{id}/read", post(mark_read))
        .route("/api/messages/{id}", delete(delete_message))
}

/// POST /api/messages — post a direct or broadcast message.
async fn post_message(
    State(state): State<AppState>,
    Json(post): Json<PostMessage>,
) -> ApiResult<Json<Value>> {
    if post.content.is_empty() {
        return Err(ServerError(ApiError::invalid_params(
            "content must not be empty",
        )));
    }
    let message = state.bus.post(post);
    Ok(Json(json!(message)))
}

/// GET /api/messages — filtered query.
async fn query_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Json<Value> {
    Json(json!(state.bus.query(&query)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadBody {
    agent_id: String,
    #[serde(default)]
    agent_role: Option<String>,
}

/// POST /api/messages/{id}/read — idempotent read marking.
async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ReadBody>,
) -> Json<Value> {
    let changed = state.bus.mark_read(&id, &body.agent_id);
    Json(json!({"changed": changed}))
}

/// POST /api/messages/read-all — mark everything visible to the caller.
async fn mark_all_read(State(state): State<AppState>, Json(body): Json<ReadBody>) -> Json<Value> {
    let marked = state
        .bus
        .mark_all_read(&body.agent_id, body.agent_role.as_deref());
    Json(json!({"marked": marked}))
}

/// DELETE /api/messages/{id}
async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if state.bus.delete_message(&id) {
        Ok(Json(json!({"ok": true})))
    } else {
        Err(ServerError(ApiError::new(
            swarm_core::errors::ApiErrorCode::NotFound,
            format!("message not found: {id}"),
        )))
    }
}
