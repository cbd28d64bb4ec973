//! Axum router construction.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /api/status` -- engine snapshot
/// - `GET /api/worlds` -- running worlds
/// - `GET /api/worlds/{id}` -- one running world
/// - `GET /api/operator/status` -- run status
/// - `POST /api/operator/{pause,resume,speed,simulate,stop}` -- controls
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // Read API
        .route("/api/status", get(handlers::get_status))
        .route("/api/worlds", get(handlers::list_worlds))
        .route("/api/worlds/{id}", get(handlers::get_world))
        // Operator API
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/simulate", post(operator::simulate))
        .route("/api/operator/stop", post(operator::stop))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
