//! Agent lifecycle and introspection endpoints.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::{Value, json};

use swarm_core::errors::ApiError;
use swarm_runtime::manager::Attachment;
use swarm_runtime::types::CreateAgent;

use crate::auth::Actor;
use crate::errors::{ApiResult, ServerError};
use crate::sse::event_stream;
use crate::state::AppState;

/// Agent routes.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/api/agents", get(list_agents).post(create_agent))
        .route("/api/agents/batch", post(create_batch))
        .route("/api/agents/registry", get(registry_view))
        .route("/api/agents/topology", get(topology))
        .route(
            "/api/agents/{id}",
            get(get_agent).patch(update_agent).delete(delete_agent),
        )
        .route("/api/agents/{id}/message", post(message_agent))
        .route("/api/agents/{id}/events", get(agent_events))
        .route("/api/agents/{id}/raw-events", get(raw_events))
        .route("/api/agents/{id}/logs", get(agent_logs))
        .route("/api/agents/{id}/files", get(agent_files))
        .route("/api/agents/{id}/metadata", get(agent_metadata))
        .route("/api/agents/{id}/usage", get(agent_usage))
        .route("/api/agents/{id}/pause", post(pause_agent))
        .route("/api/agents/{id}/resume", post(resume_agent))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamQuery {
    /// Close the stream at the first live `done` event.
    #[serde(default = "default_true")]
    close_on_done: bool,
}

/// GET /api/agents — every record. Does not touch.
async fn list_agents(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.manager.list()))
}

/// GET /api/agents/registry — compact records with unread counts.
async fn registry_view(State(state): State<AppState>) -> Json<Value> {
    let compact: Vec<Value> = state
        .manager
        .list()
        .into_iter()
        .map(|record| {
            json!({
                "id": record.id,
                "name": record.name,
                "role": record.role,
                "status": record.status,
                "currentTask": record.current_task,
                "unreadMessages": state.manager.unread_messages(&record.id),
            })
        })
        .collect();
    Json(json!(compact))
}

/// GET /api/agents/topology — spawn tree from parent links.
async fn topology(State(state): State<AppState>) -> Json<Value> {
    let (nodes, edges) = state.manager.topology();
    Json(json!({"nodes": nodes, "edges": edges}))
}

/// POST /api/agents — create and stream the new agent's events.
async fn create_agent(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
    Json(spec): Json<CreateAgent>,
) -> ApiResult<Response> {
    let handle = state.manager.create(spec).await?;
    let agent_id = handle.snapshot().id;
    let subscription = state
        .manager
        .subscribe(&agent_id, Some(0))
        .ok_or_else(|| ServerError(ApiError::internal("subscription lost at create")))?;
    Ok(event_stream(subscription, query.close_on_done).into_response())
}

/// POST /api/agents/batch — per-item results, never a partial failure.
async fn create_batch(
    State(state): State<AppState>,
    Json(specs): Json<Vec<CreateAgent>>,
) -> Json<Value> {
    let results = state.manager.create_batch(specs).await;
    Json(json!({"results": results}))
}

/// GET /api/agents/{id} — the record. Touches.
async fn get_agent(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let handle = state
        .manager
        .get(&id)
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))?;
    let _ = state.manager.touch(&id);
    Ok(Json(json!(handle.snapshot())))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct UpdateAgent {
    role: Option<String>,
    current_task: Option<String>,
    name: Option<String>,
    dangerously_skip_permissions: Option<bool>,
}

/// PATCH /api/agents/{id} — mutable record fields.
async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<UpdateAgent>,
) -> ApiResult<Json<Value>> {
    let handle = state
        .manager
        .get(&id)
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))?;

    if let Some(name) = &update.name {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(ServerError(ApiError::invalid_params(
                "name must be non-empty [a-z0-9-]",
            )));
        }
    }

    {
        let mut record = handle.record.lock();
        if let Some(role) = update.role {
            record.role = Some(role);
        }
        if let Some(task) = update.current_task {
            record.current_task = Some(task);
        }
        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(skip) = update.dangerously_skip_permissions {
            record.dangerously_skip_permissions = skip;
        }
    }
    Ok(Json(json!(handle.snapshot())))
}

/// DELETE /api/agents/{id} — destroy, cascading to children.
async fn delete_agent(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    actor.require_operator("destroy agents")?;
    if state.manager.destroy(&id).await {
        Ok(Json(json!({"ok": true})))
    } else {
        Err(ServerError(ApiError::agent_not_found(&id)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageBody {
    prompt: String,
    max_turns: Option<u32>,
    session_id: Option<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

/// POST /api/agents/{id}/message — prompt the agent, stream the turn.
async fn message_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StreamQuery>,
    Json(body): Json<MessageBody>,
) -> ApiResult<Response> {
    let suffix = if body.attachments.is_empty() {
        String::new()
    } else {
        state.manager.save_attachments(&id, &body.attachments)?
    };

    let after = state
        .manager
        .hub()
        .next_index(&id)
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))?;
    let subscription = state
        .manager
        .subscribe(&id, Some(after))
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))?;

    let prompt = format!("{}{suffix}", body.prompt);
    let _ = state
        .manager
        .message(&id, &prompt, body.max_turns, body.session_id)
        .await?;
    Ok(event_stream(subscription, query.close_on_done).into_response())
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    after: Option<u64>,
}

/// GET /api/agents/{id}/events — replay plus live tail. Never closed by
/// `done` events: reconnecting clients must be able to replay past
/// historical turn boundaries.
async fn agent_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Response> {
    let subscription = state
        .manager
        .subscribe(&id, query.after)
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))?;
    let _ = state.manager.touch(&id);
    Ok(event_stream(subscription, false).into_response())
}

/// GET /api/agents/{id}/raw-events — debug summary of the retained tail.
async fn raw_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let events = state
        .manager
        .get_events(&id)
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))?;

    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for record in &events {
        *counts.entry(record.event.kind.as_str()).or_insert(0) += 1;
    }
    Ok(Json(json!({
        "total": events.len(),
        "firstIndex": events.first().map(|r| r.index),
        "lastIndex": events.last().map(|r| r.index),
        "countsByType": counts,
    })))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    /// Comma-separated event types.
    types: Option<String>,
    tail: Option<usize>,
    format: Option<String>,
}

/// GET /api/agents/{id}/logs — filtered events as JSON or plain text.
async fn agent_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Response> {
    let kinds: Option<Vec<String>> = query.types.as_deref().map(|types| {
        types
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect()
    });
    let records = state
        .manager
        .get_logs(&id, kinds.as_deref(), query.tail)
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))?;

    if query.format.as_deref() == Some("text") {
        let lines: Vec<String> = records
            .iter()
            .map(|record| {
                let body = record
                    .event
                    .str_field("text")
                    .map_or_else(
                        || serde_json::to_string(&record.event.fields).unwrap_or_default(),
                        str::to_owned,
                    );
                format!("[{}] {}: {}", record.index, record.event.kind.as_str(), body)
            })
            .collect();
        return Ok(lines.join("\n").into_response());
    }

    let events: Vec<Value> = records
        .iter()
        .map(|record| json!({"index": record.index, "event": record.event}))
        .collect();
    Ok(Json(json!(events)).into_response())
}

#[derive(Debug, Deserialize)]
struct FilesQuery {
    q: Option<String>,
    limit: Option<usize>,
}

/// GET /api/agents/{id}/files — workspace paths matching a substring.
async fn agent_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<FilesQuery>,
) -> ApiResult<Json<Value>> {
    let files = state
        .manager
        .list_files(&id, query.q.as_deref(), query.limit.unwrap_or(100))
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))?;
    Ok(Json(json!(files)))
}

/// GET /api/agents/{id}/metadata — runtime metadata.
async fn agent_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .manager
        .get_metadata(&id)
        .map(Json)
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))
}

/// GET /api/agents/{id}/usage — token totals.
async fn agent_usage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .manager
        .get_usage(&id)
        .map(|usage| Json(json!(usage)))
        .ok_or_else(|| ServerError(ApiError::agent_not_found(&id)))
}

/// POST /api/agents/{id}/pause
async fn pause_agent(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    actor.require_operator("pause agents")?;
    if state.manager.pause(&id)? {
        Ok(Json(json!({"ok": true})))
    } else {
        Err(ServerError(ApiError::invalid_params(
            "agent cannot be paused in its current status",
        )))
    }
}

/// POST /api/agents/{id}/resume
async fn resume_agent(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    actor.require_operator("resume agents")?;
    if state.manager.resume(&id)? {
        Ok(Json(json!({"ok": true})))
    } else {
        Err(ServerError(ApiError::invalid_params(
            "agent is not paused",
        )))
    }
}
