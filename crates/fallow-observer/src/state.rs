//! Shared application state for the API server.
//!
//! [`AppState`] holds the in-memory [`EngineSnapshot`] the read endpoints
//! serve and, when a run is attached, the shared operator control state.

use std::sync::Arc;

use fallow_core::engine::{TickSummary, WorldStatus};
use fallow_core::operator::OperatorState;
use tokio::sync::RwLock;

/// In-memory copy of the engine state served by the read endpoints.
///
/// Refreshed after each tick so requests never wait on the tick loop.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct EngineSnapshot {
    /// Last completed tick.
    pub tick: u64,
    /// Every running world's session status.
    pub worlds: Vec<WorldStatus>,
    /// Summary of the last completed tick.
    pub last_summary: Option<TickSummary>,
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The current engine snapshot (updated each tick).
    pub snapshot: Arc<RwLock<EngineSnapshot>>,
    /// Shared operator control state (present when a run is attached).
    pub operator_state: Option<Arc<OperatorState>>,
}

impl AppState {
    /// Create application state with an empty snapshot and no run.
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(EngineSnapshot::default())),
            operator_state: None,
        }
    }

    /// Create application state with operator control state attached.
    pub fn with_operator(operator: Arc<OperatorState>) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(EngineSnapshot::default())),
            operator_state: Some(operator),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
