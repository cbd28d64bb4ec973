//! Operator REST API handlers for runtime control.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause the tick loop |
//! | `POST` | `/api/operator/resume` | Resume the tick loop |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `GET` | `/api/operator/status` | Current run status |
//! | `POST` | `/api/operator/simulate` | Treat minutes as offline time |
//! | `POST` | `/api/operator/stop` | Trigger clean shutdown |

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use fallow_core::operator::{MIN_TICK_INTERVAL_MS, OperatorState, SimulateRequest};
use fallow_types::{TilePos, WorldId};
use tokio::sync::oneshot;
use tracing::info;

use crate::error::OperatorApiError;
use crate::state::AppState;

/// How long the simulate endpoint waits for the tick loop to answer.
const SIMULATE_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds.
    pub tick_interval_ms: u64,
}

/// Request body for `POST /api/operator/simulate`.
#[derive(Debug, serde::Deserialize)]
pub struct SimulateBody {
    /// Minutes of offline time to simulate (at least 1).
    pub minutes: u32,
    /// Target world; the first running world when omitted.
    pub world: Option<WorldId>,
    /// Tile X to seed around. Must be given together with `tile_z`.
    pub tile_x: Option<i32>,
    /// Tile Z to seed around. Must be given together with `tile_x`.
    pub tile_z: Option<i32>,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

fn operator(state: &AppState) -> Result<&Arc<OperatorState>, OperatorApiError> {
    state
        .operator_state
        .as_ref()
        .ok_or_else(|| OperatorApiError::Internal("operator state not available".to_owned()))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause
// ---------------------------------------------------------------------------

/// Pause the tick loop. Queued work stays queued until resumed.
pub async fn pause(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, OperatorApiError> {
    operator(&state)?.pause();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Tick loop paused".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/resume
// ---------------------------------------------------------------------------

/// Resume the tick loop after a pause.
pub async fn resume(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, OperatorApiError> {
    operator(&state)?.resume();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Tick loop resumed".to_owned(),
    }))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the tick interval at runtime. Takes effect at the next sleep.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, OperatorApiError> {
    operator(&state)?
        .set_tick_interval_ms(body.tick_interval_ms)
        .map_or_else(
            || {
                Err(OperatorApiError::InvalidRequest(format!(
                    "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
                )))
            },
            |prev| {
                Ok(Json(serde_json::json!({
                    "ok": true,
                    "message": format!("Tick interval changed from {prev}ms to {}ms", body.tick_interval_ms),
                    "previous_interval_ms": prev,
                    "new_interval_ms": body.tick_interval_ms,
                })))
            },
        )
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Current run status: tick, pause and stop flags, speed, end reason.
pub async fn status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, OperatorApiError> {
    let status = operator(&state)?.status().await;
    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// POST /api/operator/simulate
// ---------------------------------------------------------------------------

/// Treat `minutes` as time spent offline and apply the resulting stages
/// around the given tile, or around every actor when no tile is given.
///
/// The request is queued for the tick loop; the response carries the
/// stages armed and tiles seeded. A request the loop has not picked up
/// within the reply timeout is withdrawn and never applied.
pub async fn simulate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SimulateBody>,
) -> Result<impl IntoResponse, OperatorApiError> {
    let operator = operator(&state)?;
    if body.minutes == 0 {
        return Err(OperatorApiError::InvalidRequest(
            "minutes must be at least 1".to_owned(),
        ));
    }
    let center = match (body.tile_x, body.tile_z) {
        (Some(x), Some(z)) => Some(TilePos::new(x, z)),
        (None, None) => None,
        _ => {
            return Err(OperatorApiError::InvalidRequest(
                "tile_x and tile_z must be given together".to_owned(),
            ));
        }
    };
    if operator.end_reason().await.is_some() {
        return Err(OperatorApiError::Conflict("the tick loop has ended".to_owned()));
    }

    let (tx, rx) = oneshot::channel();
    operator
        .request_simulate(SimulateRequest {
            world: body.world,
            minutes: body.minutes,
            center,
            reply: Some(tx),
        })
        .await;
    info!(minutes = body.minutes, world = ?body.world, center = ?center, "Simulate request queued");

    let outcome = tokio::time::timeout(SIMULATE_REPLY_TIMEOUT, rx)
        .await
        .map_err(|_err| {
            OperatorApiError::Unavailable(
                "tick loop did not answer in time; the request was withdrawn".to_owned(),
            )
        })?
        .map_err(|_err| OperatorApiError::Unavailable("tick loop dropped the request".to_owned()))??;

    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Trigger a clean shutdown of the tick loop.
///
/// The loop finishes its current tick, stops every world (recording the
/// last-seen time), and exits. The HTTP server keeps serving the last
/// snapshot.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, OperatorApiError> {
    operator(&state)?.request_stop();
    Ok(Json(OperatorResponse {
        ok: true,
        message: "Stop requested".to_owned(),
    }))
}
