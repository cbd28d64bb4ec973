//! Read-only REST handlers.
//!
//! Every handler reads from the [`EngineSnapshot`](crate::state::EngineSnapshot)
//! and never blocks the tick loop.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse};
use fallow_types::WorldId;

use crate::error::OperatorApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

/// Minimal HTML page with the current tick and links to the API.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let snapshot = state.snapshot.read().await;
    let mut rows = String::new();
    for world in &snapshot.worlds {
        let _ = write!(
            rows,
            "<tr><td><a href=\"/api/worlds/{id}\">{id}</a></td><td>{phase:?}</td><td>{pending}</td><td>{queued}</td></tr>",
            id = world.world,
            phase = world.phase,
            pending = world.pending,
            queued = world.queued,
        );
    }

    Html(format!(
        "<!DOCTYPE html>\
         <html><head><title>Fallow</title></head><body>\
         <h1>Fallow</h1>\
         <p>Tick: {tick}</p>\
         <table><tr><th>World</th><th>Phase</th><th>Pending</th><th>Queued</th></tr>{rows}</table>\
         <ul>\
         <li><a href=\"/api/status\">/api/status</a></li>\
         <li><a href=\"/api/worlds\">/api/worlds</a></li>\
         <li><a href=\"/api/operator/status\">/api/operator/status</a></li>\
         </ul>\
         </body></html>",
        tick = snapshot.tick,
    ))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// The full engine snapshot.
pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(snapshot.clone())
}

// ---------------------------------------------------------------------------
// GET /api/worlds
// ---------------------------------------------------------------------------

/// Every running world's session status.
pub async fn list_worlds(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    Json(serde_json::json!({
        "count": snapshot.worlds.len(),
        "worlds": snapshot.worlds,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/worlds/{id}
// ---------------------------------------------------------------------------

/// One running world's session status.
pub async fn get_world(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, OperatorApiError> {
    let world = parse_world_id(&id)?;
    let snapshot = state.snapshot.read().await;
    snapshot
        .worlds
        .iter()
        .find(|w| w.world == world)
        .cloned()
        .map(Json)
        .ok_or_else(|| OperatorApiError::NotFound(format!("world {world} is not running")))
}

/// Parse a world id from a path segment.
pub fn parse_world_id(raw: &str) -> Result<WorldId, OperatorApiError> {
    raw.parse::<uuid::Uuid>()
        .map(WorldId::from)
        .map_err(|e| OperatorApiError::InvalidUuid(format!("{raw}: {e}")))
}
